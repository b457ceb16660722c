//! Durable FIFO job queue for weather lookups, backed by Redis.
//!
//! Producers LPUSH serialized jobs onto a list; the worker BRPOPs them off
//! the other end. The list lives outside the process, so pending jobs and
//! the backlog length survive restarts — the length is what autoscaling
//! watches.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, Result};
pub use job::Job;
pub use queue::{JobQueue, DEFAULT_QUEUE_NAME};
