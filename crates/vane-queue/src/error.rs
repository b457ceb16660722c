//! Queue error taxonomy.

use thiserror::Error;

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors raised by the job queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The backing Redis store could not be reached or rejected a command.
    /// Callers in long-running loops treat this as transient.
    #[error("queue unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    /// A job failed to encode. For bulk pushes, `enqueued` reports how many
    /// jobs made it onto the queue before the failure.
    #[error("job serialization failed after enqueueing {enqueued} jobs: {source}")]
    Serialization {
        enqueued: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The governing cancellation token fired during a blocking operation.
    #[error("queue operation cancelled")]
    Cancelled,
}
