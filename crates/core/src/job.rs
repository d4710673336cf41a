//! The unit of work: one URL to fetch and persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobId;
use crate::url::SourceUrl;

/// One enqueued fetch, created at ingest.
///
/// The job carries only its identity and target; delivery bookkeeping
/// (receipt handles, delivery counts) belongs to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchJob {
    pub id: JobId,
    pub url: SourceUrl,
    pub enqueued_at: DateTime<Utc>,
}

impl FetchJob {
    pub fn new(url: SourceUrl) -> Self {
        Self {
            id: JobId::new(),
            url,
            enqueued_at: Utc::now(),
        }
    }
}

/// Lifecycle of a job as the worker drives it.
///
/// `Acknowledged` and `DeadLettered` are terminal. Everything else is
/// in-flight and reachable again through queue redelivery, so a worker
/// crash can only ever lose progress, not jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Fetching,
    Storing,
    Acknowledged,
    DeadLettered,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Acknowledged | JobState::DeadLettered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_jobs_get_distinct_ids() {
        let url = SourceUrl::parse("https://example.com/x").unwrap();
        let a = FetchJob::new(url.clone());
        let b = FetchJob::new(url);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn only_acknowledged_and_dead_lettered_are_terminal() {
        assert!(JobState::Acknowledged.is_terminal());
        assert!(JobState::DeadLettered.is_terminal());
        assert!(!JobState::Received.is_terminal());
        assert!(!JobState::Fetching.is_terminal());
        assert!(!JobState::Storing.is_terminal());
    }

    #[test]
    fn job_round_trips_through_json() {
        let job = FetchJob::new(SourceUrl::parse("https://example.com/cat.jpg").unwrap());
        let json = serde_json::to_string(&job).unwrap();
        let back: FetchJob = serde_json::from_str(&json).unwrap();
        assert_eq!(job, back);
    }
}
