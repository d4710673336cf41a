//! Process-wide service construction.
//!
//! Backends are built exactly once at startup and shared behind `Arc`s: the
//! ingest handlers and every worker in the pool see the same queue, the
//! same object store, and one pooled HTTP client.

use std::sync::Arc;

use tracing::{info, warn};

use fetchvault_infra::fetch::HttpFetcher;
use fetchvault_infra::queue::{InMemoryQueue, JobQueue};
use fetchvault_infra::store::InMemoryObjectStore;
use fetchvault_infra::worker::{WorkerPool, WorkerPoolHandle, WorkerStatsHandle};

use crate::config::AppConfig;

/// Shared handles the HTTP layer works with.
///
/// The queue is held as its port so a remote backend can slot in; the
/// object store stays concrete because the inspection endpoints read
/// through it, which the write-only port deliberately does not allow.
pub struct AppServices {
    pub queue: Arc<dyn JobQueue>,
    pub objects: Arc<InMemoryObjectStore>,
    pub worker_stats: WorkerStatsHandle,
}

/// Build the backends and start the worker pool.
///
/// Returns the services for the router plus the pool handle `main` uses
/// for graceful shutdown.
pub fn build_services(config: &AppConfig) -> (Arc<AppServices>, WorkerPoolHandle) {
    if let Some(endpoint) = &config.queue_endpoint {
        warn!(
            endpoint = %endpoint,
            "no remote queue backend compiled in; using the in-memory queue"
        );
    }

    let queue = Arc::new(InMemoryQueue::new());
    let objects = Arc::new(InMemoryObjectStore::new(config.object_store_bucket.clone()));
    let fetcher =
        Arc::new(HttpFetcher::new(&config.fetch_limits()).expect("failed to build http client"));

    let pool = WorkerPool::new(
        queue.clone(),
        objects.clone(),
        fetcher,
        config.worker_config(),
    );
    let handle = pool.spawn();

    info!(
        bucket = %config.object_store_bucket,
        worker_concurrency = config.worker_concurrency,
        max_delivery_count = config.max_delivery_count,
        "services ready"
    );

    let services = Arc::new(AppServices {
        queue,
        objects,
        worker_stats: handle.stats_handle(),
    });
    (services, handle)
}
