//! `forensics-queue` — durable, priority-ordered analysis job queue.
//!
//! Jobs are persisted to a SQLite `jobs` table. [`engine::JobQueue`] exposes
//! enqueue/dequeue/complete/fail operations; the worker pool (one task per
//! dequeued job) drives the retry/backoff/dead-letter lifecycle described in
//! spec §4.3.

pub mod db;
pub mod engine;
pub mod error;
pub mod types;

pub use engine::{JobQueue, NewJob};
pub use error::{QueueError, Result};
pub use types::{Job, JobStatus};
