//! In-memory queue adapter with real visibility-timeout semantics.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use fetchvault_core::{FetchJob, JobId, ReceiptHandle};

use super::{DeadLetterEntry, Delivery, JobQueue, QueueError};

/// A queued job plus its delivery bookkeeping.
#[derive(Debug, Clone)]
struct QueuedJob {
    job: FetchJob,
    delivery_count: u32,
}

/// A leased job, invisible to consumers until `visible_at`.
#[derive(Debug, Clone)]
struct Lease {
    entry: QueuedJob,
    visible_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<QueuedJob>,
    in_flight: HashMap<ReceiptHandle, Lease>,
    dead: Vec<DeadLetterEntry>,
}

/// Process-local [`JobQueue`] for dev and tests.
///
/// Carries the same at-least-once contract as a remote visibility-timeout
/// queue: an unsettled lease lapses back into the ready queue on the next
/// receive, and a receipt whose job has been handed out again settles
/// nothing. A lapsed receipt used before that redelivery still counts.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs currently deliverable (diagnostics and tests).
    pub async fn ready_len(&self) -> usize {
        let mut state = self.state.lock().await;
        Self::reap_expired(&mut state, Instant::now());
        state.ready.len()
    }

    /// Jobs currently leased (diagnostics and tests).
    pub async fn in_flight_len(&self) -> usize {
        let mut state = self.state.lock().await;
        Self::reap_expired(&mut state, Instant::now());
        state.in_flight.len()
    }

    /// Move lapsed leases back into the ready queue.
    fn reap_expired(state: &mut QueueState, now: Instant) {
        let lapsed: Vec<ReceiptHandle> = state
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.visible_at <= now)
            .map(|(receipt, _)| *receipt)
            .collect();

        for receipt in lapsed {
            if let Some(lease) = state.in_flight.remove(&receipt) {
                debug!(job_id = %lease.entry.job.id, "lease lapsed; job deliverable again");
                state.ready.push_back(lease.entry);
            }
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn enqueue(&self, job: FetchJob) -> Result<JobId, QueueError> {
        let id = job.id;
        let mut state = self.state.lock().await;
        state.ready.push_back(QueuedJob {
            job,
            delivery_count: 0,
        });
        Ok(id)
    }

    async fn receive(
        &self,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<Delivery>, QueueError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        Self::reap_expired(&mut state, now);

        let mut deliveries = Vec::new();
        while deliveries.len() < max_batch {
            let Some(mut entry) = state.ready.pop_front() else {
                break;
            };
            entry.delivery_count += 1;
            let receipt = ReceiptHandle::new();
            deliveries.push(Delivery {
                receipt,
                job: entry.job.clone(),
                delivery_count: entry.delivery_count,
            });
            state.in_flight.insert(
                receipt,
                Lease {
                    entry,
                    visible_at: now + visibility_timeout,
                },
            );
        }
        Ok(deliveries)
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .in_flight
            .remove(receipt)
            .map(|_| ())
            .ok_or(QueueError::UnknownReceipt(*receipt))
    }

    async fn dead_letter(&self, receipt: &ReceiptHandle, reason: String) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let lease = state
            .in_flight
            .remove(receipt)
            .ok_or(QueueError::UnknownReceipt(*receipt))?;

        state.dead.push(DeadLetterEntry {
            job: lease.entry.job,
            delivery_count: lease.entry.delivery_count,
            reason,
            dead_lettered_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_dead_letters(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, QueueError> {
        let state = self.state.lock().await;
        Ok(state.dead.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchvault_core::SourceUrl;

    fn job(path: &str) -> FetchJob {
        FetchJob::new(SourceUrl::parse(&format!("https://example.com/{path}")).unwrap())
    }

    #[tokio::test]
    async fn receive_leases_and_hides_the_job() {
        let queue = InMemoryQueue::new();
        queue.enqueue(job("a")).await.unwrap();

        let first = queue.receive(10, Duration::from_secs(60)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].delivery_count, 1);

        // Leased, so a second consumer sees nothing.
        let second = queue.receive(10, Duration::from_secs(60)).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(queue.in_flight_len().await, 1);
    }

    #[tokio::test]
    async fn lapsed_lease_redelivers_with_bumped_count() {
        let queue = InMemoryQueue::new();
        let id = queue.enqueue(job("b")).await.unwrap();

        let first = queue.receive(1, Duration::from_millis(10)).await.unwrap();
        assert_eq!(first[0].delivery_count, 1);

        tokio::time::sleep(Duration::from_millis(25)).await;

        let second = queue.receive(1, Duration::from_secs(60)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].job.id, id);
        assert_eq!(second[0].delivery_count, 2);
        assert_ne!(second[0].receipt, first[0].receipt);
    }

    #[tokio::test]
    async fn delete_settles_the_job_permanently() {
        let queue = InMemoryQueue::new();
        queue.enqueue(job("c")).await.unwrap();

        let deliveries = queue.receive(1, Duration::from_millis(10)).await.unwrap();
        queue.delete(&deliveries[0].receipt).await.unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(queue.receive(1, Duration::from_secs(60)).await.unwrap().is_empty());
        assert_eq!(queue.ready_len().await, 0);
        assert_eq!(queue.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn stale_receipt_is_rejected() {
        let queue = InMemoryQueue::new();
        queue.enqueue(job("d")).await.unwrap();

        let first = queue.receive(1, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        // The lease lapsed and the job went back to ready; the old receipt
        // must no longer settle anything.
        let second = queue.receive(1, Duration::from_secs(60)).await.unwrap();
        assert_eq!(second.len(), 1);

        let err = queue.delete(&first[0].receipt).await.unwrap_err();
        assert!(matches!(err, QueueError::UnknownReceipt(_)));
        assert_eq!(queue.in_flight_len().await, 1);
    }

    #[tokio::test]
    async fn lapsed_receipt_still_settles_before_redelivery() {
        let queue = InMemoryQueue::new();
        queue.enqueue(job("f")).await.unwrap();

        let deliveries = queue.receive(1, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        // The visibility window is over, but nobody has re-received the
        // job, so the original receipt still acknowledges it.
        queue.delete(&deliveries[0].receipt).await.unwrap();

        assert!(queue.receive(1, Duration::from_secs(60)).await.unwrap().is_empty());
        assert_eq!(queue.ready_len().await, 0);
        assert_eq!(queue.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn dead_letter_moves_the_job_out_of_the_main_queue() {
        let queue = InMemoryQueue::new();
        let id = queue.enqueue(job("e")).await.unwrap();

        let deliveries = queue.receive(1, Duration::from_millis(10)).await.unwrap();
        queue
            .dead_letter(&deliveries[0].receipt, "source returned status 404".into())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(queue.receive(1, Duration::from_secs(60)).await.unwrap().is_empty());

        let dead = queue.list_dead_letters(10).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.id, id);
        assert_eq!(dead[0].delivery_count, 1);
        assert_eq!(dead[0].reason, "source returned status 404");
    }

    #[tokio::test]
    async fn list_dead_letters_returns_newest_first_up_to_limit() {
        let queue = InMemoryQueue::new();
        for name in ["one", "two", "three"] {
            queue.enqueue(job(name)).await.unwrap();
            let d = queue.receive(1, Duration::from_secs(60)).await.unwrap();
            queue
                .dead_letter(&d[0].receipt, format!("gave up on {name}"))
                .await
                .unwrap();
        }

        let dead = queue.list_dead_letters(2).await.unwrap();
        assert_eq!(dead.len(), 2);
        assert_eq!(dead[0].reason, "gave up on three");
        assert_eq!(dead[1].reason, "gave up on two");
    }

    #[tokio::test]
    async fn receive_respects_the_batch_cap() {
        let queue = InMemoryQueue::new();
        for i in 0..5 {
            queue.enqueue(job(&format!("batch/{i}"))).await.unwrap();
        }

        let batch = queue.receive(3, Duration::from_secs(60)).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(queue.ready_len().await, 2);
        assert_eq!(queue.in_flight_len().await, 3);
    }
}
