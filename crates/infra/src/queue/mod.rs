//! Job queue boundary.
//!
//! The pipeline assumes a visibility-timeout queue with at-least-once
//! delivery: a received job stays invisible to other consumers for a lease
//! window, reappears with a bumped delivery count if the lease lapses, and
//! disappears permanently only on an explicit delete. Jobs the pipeline
//! gives up on move into an attached dead-letter store instead of being
//! dropped.
//!
//! ## Components
//!
//! - [`JobQueue`]: the port every backend implements
//! - [`Delivery`]: one leased delivery of a job
//! - [`DeadLetterEntry`]: a job the pipeline gave up on, with the reason
//! - [`InMemoryQueue`]: process-local adapter for dev and tests

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fetchvault_core::{FetchJob, JobId, ReceiptHandle};

pub mod memory;

pub use memory::InMemoryQueue;

/// One leased delivery of a job.
///
/// `delivery_count` includes this delivery, so the first receive of a job
/// reports 1.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub receipt: ReceiptHandle,
    pub job: FetchJob,
    pub delivery_count: u32,
}

/// A job removed from the main queue after the pipeline gave up on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub job: FetchJob,
    pub delivery_count: u32,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Queue-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Backend refused or failed the operation.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The receipt does not name a live lease (already settled, or the
    /// visibility timeout lapsed and the job was redelivered).
    #[error("unknown or expired receipt {0}")]
    UnknownReceipt(ReceiptHandle),
}

/// Port for the job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job. Returns its id once the queue has accepted it.
    async fn enqueue(&self, job: FetchJob) -> Result<JobId, QueueError>;

    /// Lease up to `max_batch` jobs, hiding them from other consumers for
    /// `visibility_timeout`. A lease that is neither deleted nor
    /// dead-lettered becomes deliverable again after the timeout, with an
    /// incremented delivery count.
    async fn receive(
        &self,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<Delivery>, QueueError>;

    /// Acknowledge a leased job, removing it permanently.
    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Give up on a leased job: remove it from the main queue and record it
    /// in the dead-letter store with `reason`.
    async fn dead_letter(&self, receipt: &ReceiptHandle, reason: String) -> Result<(), QueueError>;

    /// Most recently dead-lettered jobs, newest first.
    async fn list_dead_letters(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, QueueError>;
}
