//! Redis-backed FIFO queue: LPUSH producer, BRPOP consumer.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, Result};
use crate::job::Job;

pub const DEFAULT_QUEUE_NAME: &str = "weather:jobs";

/// Server-side BRPOP timeout. Bounds how long a cancelled worker waits
/// before it notices the token.
const POP_WAIT_SECS: f64 = 1.0;

/// Client for the weather job queue.
///
/// Cheap to share behind an `Arc`; the backing store serializes operations,
/// so no process-local locking is layered on top.
pub struct JobQueue {
    conn: ConnectionManager,
    /// Dedicated connection for blocking pops. BRPOP parks the whole
    /// multiplexed pipeline, so it must not share one with push/len.
    pop_conn: Mutex<ConnectionManager>,
    queue: String,
}

impl JobQueue {
    /// Connects to Redis and prepares both connections up front, so a bad
    /// address fails at startup rather than on the first request.
    pub async fn connect(url: &str, queue: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        let pop_conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            pop_conn: Mutex::new(pop_conn),
            queue: queue.into(),
        })
    }

    /// Name of the backing Redis list.
    pub fn name(&self) -> &str {
        &self.queue
    }

    /// Enqueues a single job.
    pub async fn push(&self, job: &Job) -> Result<()> {
        let payload = serde_json::to_string(job).map_err(|source| QueueError::Serialization {
            enqueued: 0,
            source,
        })?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.queue, payload).await?;
        Ok(())
    }

    /// Best-effort bulk enqueue.
    ///
    /// Jobs are serialized in order; on a serialization failure the jobs
    /// already encoded are still pushed and the error reports how many made
    /// it. Not a transaction.
    pub async fn push_many(&self, jobs: &[Job]) -> Result<usize> {
        if jobs.is_empty() {
            return Ok(0);
        }

        let mut payloads = Vec::with_capacity(jobs.len());
        let mut failure = None;
        for job in jobs {
            match serde_json::to_string(job) {
                Ok(payload) => payloads.push(payload),
                Err(source) => {
                    failure = Some(source);
                    break;
                }
            }
        }

        let enqueued = payloads.len();
        if enqueued > 0 {
            let mut conn = self.conn.clone();
            conn.lpush::<_, _, ()>(&self.queue, payloads).await?;
        }

        match failure {
            Some(source) => Err(QueueError::Serialization { enqueued, source }),
            None => Ok(enqueued),
        }
    }

    /// Blocks until a job is available or `cancel` fires.
    ///
    /// Cancellation surfaces as `QueueError::Cancelled` within one pop-wait
    /// interval. A payload that fails to decode is dropped with a warning
    /// and returned as `Ok(None)` — it was already consumed and cannot be
    /// recovered.
    pub async fn pop(&self, cancel: &CancellationToken) -> Result<Option<Job>> {
        let mut conn = self.pop_conn.lock().await;
        loop {
            if cancel.is_cancelled() {
                return Err(QueueError::Cancelled);
            }

            let popped: Option<(String, String)> = tokio::select! {
                result = conn.brpop(&self.queue, POP_WAIT_SECS) => result?,
                () = cancel.cancelled() => return Err(QueueError::Cancelled),
            };

            match popped {
                // Server-side timeout; loop around and re-check the token.
                None => continue,
                Some((_, raw)) => match serde_json::from_str(&raw) {
                    Ok(job) => return Ok(Some(job)),
                    Err(err) => {
                        tracing::warn!("dropping malformed job {:?}: {}", raw, err);
                        return Ok(None);
                    }
                },
            }
        }
    }

    /// Point-in-time queue length.
    ///
    /// Inherently racy with concurrent pushes and pops — a monitoring and
    /// scaling signal, never an input to correctness decisions.
    pub async fn len(&self) -> Result<i64> {
        let mut conn = self.conn.clone();
        let length: i64 = conn.llen(&self.queue).await?;
        Ok(length)
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
