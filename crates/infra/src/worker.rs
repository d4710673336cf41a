//! The fetch-and-persist worker pool.
//!
//! Each worker leases deliveries from the queue and acknowledges a job only
//! after its object is durably written, so the queue entry outlives the job
//! until then. A failed job is either left for the visibility timeout to
//! redeliver or diverted to the dead-letter store, per [`RetryPolicy`].

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fetchvault_core::{Disposition, FetchError, FetchJob, JobState, ObjectKey, RetryPolicy};

use crate::fetch::Fetcher;
use crate::queue::{Delivery, JobQueue};
use crate::store::ObjectStore;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of independent consumer tasks.
    pub concurrency: usize,
    /// Maximum deliveries leased per receive call.
    pub batch_size: usize,
    /// How long a lease hides a job from other consumers.
    pub visibility_timeout: Duration,
    /// Idle sleep between empty receives.
    pub poll_interval: Duration,
    /// Hard per-job deadline covering fetch plus store write. Must stay
    /// below `visibility_timeout`, otherwise a slow job can be leased twice
    /// at once.
    pub job_timeout: Duration,
    /// Retry/dead-letter policy.
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            batch_size: 10,
            visibility_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(100),
            job_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl WorkerConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Pool runtime counters.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkerStats {
    /// Deliveries processed, whatever their outcome.
    pub processed: u64,
    /// Objects written and acknowledged.
    pub stored: u64,
    /// Deliveries left for redelivery.
    pub retried: u64,
    /// Jobs diverted to the dead-letter store.
    pub dead_lettered: u64,
}

/// Cloneable read handle onto the pool's counters.
#[derive(Debug, Clone)]
pub struct WorkerStatsHandle(Arc<Mutex<WorkerStats>>);

impl WorkerStatsHandle {
    pub fn snapshot(&self) -> WorkerStats {
        self.0.lock().unwrap().clone()
    }
}

/// Outcome of processing a single delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Object written and the delivery acknowledged.
    Stored(ObjectKey),
    /// Left unacknowledged; the queue redelivers after the visibility
    /// timeout.
    Retry(FetchError),
    /// Moved to the dead-letter store.
    DeadLettered(String),
}

/// Handle to a running pool: stats access plus graceful shutdown.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerPoolHandle {
    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().unwrap().clone()
    }

    pub fn stats_handle(&self) -> WorkerStatsHandle {
        WorkerStatsHandle(self.stats.clone())
    }

    /// Stop leasing new work immediately, give in-flight jobs up to `grace`
    /// to finish their store-write-then-ack sequence, then abort whatever
    /// is still running. Aborted jobs stay in the queue and are redelivered.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.shutdown.send(true);

        let deadline = tokio::time::Instant::now() + grace;
        for worker in &mut self.workers {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, &mut *worker).await.is_err() {
                warn!("worker exceeded shutdown grace period; aborting");
                worker.abort();
            }
        }
        info!("worker pool stopped");
    }
}

/// The pool itself. [`WorkerPool::spawn`] starts the consumer tasks;
/// [`WorkerPool::process_one`] drives a single delivery synchronously for
/// tests and diagnostics.
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    config: WorkerConfig,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn Fetcher>,
        config: WorkerConfig,
    ) -> Self {
        if config.job_timeout >= config.visibility_timeout {
            warn!(
                job_timeout_secs = config.job_timeout.as_secs(),
                visibility_timeout_secs = config.visibility_timeout.as_secs(),
                "job timeout reaches the visibility timeout; a slow job may be leased twice"
            );
        }
        Self {
            queue,
            store,
            fetcher,
            config,
        }
    }

    /// Spawn the consumer tasks and hand back their control handle.
    pub fn spawn(self) -> WorkerPoolHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(WorkerStats::default()));

        let mut workers = Vec::with_capacity(self.config.concurrency);
        for worker_id in 0..self.config.concurrency {
            workers.push(tokio::spawn(consumer_loop(
                worker_id,
                self.queue.clone(),
                self.store.clone(),
                self.fetcher.clone(),
                self.config.clone(),
                shutdown_rx.clone(),
                stats.clone(),
            )));
        }

        info!(concurrency = self.config.concurrency, "fetch worker pool started");
        WorkerPoolHandle {
            shutdown: shutdown_tx,
            workers,
            stats,
        }
    }

    /// Process one delivery to completion (for tests or synchronous use).
    pub async fn process_one(&self, delivery: &Delivery) -> ProcessOutcome {
        process_delivery(
            self.queue.as_ref(),
            self.store.as_ref(),
            self.fetcher.as_ref(),
            &self.config,
            delivery,
        )
        .await
    }
}

async fn consumer_loop(
    worker_id: usize,
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<Mutex<WorkerStats>>,
) {
    debug!(worker_id, "consumer started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let deliveries = match queue
            .receive(config.batch_size, config.visibility_timeout)
            .await
        {
            Ok(deliveries) => deliveries,
            Err(e) => {
                warn!(worker_id, error = %e, "receive failed");
                if idle(&mut shutdown, config.poll_interval).await.is_break() {
                    break;
                }
                continue;
            }
        };

        if deliveries.is_empty() {
            if idle(&mut shutdown, config.poll_interval).await.is_break() {
                break;
            }
            continue;
        }

        for delivery in deliveries {
            let outcome = process_delivery(
                queue.as_ref(),
                store.as_ref(),
                fetcher.as_ref(),
                &config,
                &delivery,
            )
            .await;
            record_outcome(&stats, &outcome);
        }
    }

    debug!(worker_id, "consumer stopped");
}

/// Sleep for the poll interval, waking early on shutdown.
async fn idle(
    shutdown: &mut watch::Receiver<bool>,
    interval: Duration,
) -> ControlFlow<()> {
    tokio::select! {
        _ = tokio::time::sleep(interval) => ControlFlow::Continue(()),
        changed = shutdown.changed() => {
            // A closed channel means the handle is gone; stop either way.
            if changed.is_err() || *shutdown.borrow() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }
}

fn record_outcome(stats: &Mutex<WorkerStats>, outcome: &ProcessOutcome) {
    let mut stats = stats.lock().unwrap();
    stats.processed += 1;
    match outcome {
        ProcessOutcome::Stored(_) => stats.stored += 1,
        ProcessOutcome::Retry(_) => stats.retried += 1,
        ProcessOutcome::DeadLettered(_) => stats.dead_lettered += 1,
    }
}

async fn process_delivery(
    queue: &dyn JobQueue,
    store: &dyn ObjectStore,
    fetcher: &dyn Fetcher,
    config: &WorkerConfig,
    delivery: &Delivery,
) -> ProcessOutcome {
    let job = &delivery.job;
    debug!(
        job_id = %job.id,
        url = %job.url,
        delivery_count = delivery.delivery_count,
        state = ?JobState::Received,
        "processing delivery"
    );

    // Exhausted delivery budgets are diverted before another fetch is spent
    // on them.
    if config.retry.is_exhausted(delivery.delivery_count) {
        let reason = format!(
            "delivery count {} exceeds cap {}",
            delivery.delivery_count, config.retry.max_delivery_count
        );
        return divert(queue, delivery, reason).await;
    }

    match tokio::time::timeout(config.job_timeout, fetch_then_store(store, fetcher, job)).await {
        Ok(Ok(key)) => match queue.delete(&delivery.receipt).await {
            Ok(()) => {
                info!(
                    job_id = %job.id,
                    key = %key,
                    state = ?JobState::Acknowledged,
                    "job completed"
                );
                ProcessOutcome::Stored(key)
            }
            Err(e) => {
                // The object is durably written; when the lapsed lease
                // redelivers this job it rewrites the same key.
                warn!(job_id = %job.id, error = %e, "acknowledge failed after store write");
                ProcessOutcome::Stored(key)
            }
        },
        Ok(Err(error)) => match config.retry.disposition(delivery.delivery_count, &error) {
            Disposition::Retry => {
                info!(
                    job_id = %job.id,
                    error = %error,
                    delivery_count = delivery.delivery_count,
                    "job failed; leaving for redelivery"
                );
                ProcessOutcome::Retry(error)
            }
            Disposition::DeadLetter => divert(queue, delivery, error.to_string()).await,
        },
        Err(_elapsed) => {
            // Deadline hit mid-fetch or mid-write. Abandon the delivery;
            // the lease lapses and the queue redelivers.
            let error = FetchError::transport(format!(
                "job deadline of {}s elapsed",
                config.job_timeout.as_secs()
            ));
            info!(
                job_id = %job.id,
                delivery_count = delivery.delivery_count,
                "job timed out; leaving for redelivery"
            );
            ProcessOutcome::Retry(error)
        }
    }
}

async fn fetch_then_store(
    store: &dyn ObjectStore,
    fetcher: &dyn Fetcher,
    job: &FetchJob,
) -> Result<ObjectKey, FetchError> {
    debug!(job_id = %job.id, state = ?JobState::Fetching, "fetching");
    let body = fetcher.fetch(&job.url).await?;

    let key = ObjectKey::derive(&job.url, &body.content_type);
    debug!(
        job_id = %job.id,
        key = %key,
        size_bytes = body.bytes.len(),
        state = ?JobState::Storing,
        "storing"
    );
    store
        .put(key.clone(), body.bytes, &body.content_type)
        .await
        .map_err(|e| FetchError::store(e.to_string()))?;

    Ok(key)
}

async fn divert(queue: &dyn JobQueue, delivery: &Delivery, reason: String) -> ProcessOutcome {
    warn!(
        job_id = %delivery.job.id,
        url = %delivery.job.url,
        delivery_count = delivery.delivery_count,
        reason = %reason,
        state = ?JobState::DeadLettered,
        "job dead-lettered"
    );
    if let Err(e) = queue.dead_letter(&delivery.receipt, reason.clone()).await {
        // The lease lapsed under us; the redelivered copy gets diverted on
        // its next receive.
        warn!(job_id = %delivery.job.id, error = %e, "dead-letter failed");
        return ProcessOutcome::Retry(FetchError::transport(e.to_string()));
    }
    ProcessOutcome::DeadLettered(reason)
}
