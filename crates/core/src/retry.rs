//! Retry and dead-letter policy.
//!
//! There is deliberately no backoff schedule here. A failed delivery is
//! simply left unacknowledged, and the queue's visibility timeout paces the
//! redelivery; the policy only decides *whether* a job gets another
//! delivery at all.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// What to do with a delivery that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Leave the delivery unacknowledged; the queue redelivers it after the
    /// visibility timeout.
    Retry,
    /// Remove the job from the main queue into the dead-letter store.
    DeadLetter,
}

/// Caps how often a job may be delivered before it is given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Deliveries beyond this count are diverted to the dead-letter store.
    pub max_delivery_count: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_delivery_count: 5,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_delivery_count: u32) -> Self {
        Self { max_delivery_count }
    }

    /// True once `delivery_count` has gone past the cap; such a delivery
    /// must be diverted without spending another fetch on it.
    pub fn is_exhausted(&self, delivery_count: u32) -> bool {
        delivery_count > self.max_delivery_count
    }

    /// Classify a failure observed on the `delivery_count`-th delivery.
    pub fn disposition(&self, delivery_count: u32, error: &FetchError) -> Disposition {
        if error.is_permanent() || self.is_exhausted(delivery_count) {
            Disposition::DeadLetter
        } else {
            Disposition::Retry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_retry_until_the_cap() {
        let policy = RetryPolicy::new(3);
        let error = FetchError::Status(503);

        for count in 1..=3 {
            assert_eq!(policy.disposition(count, &error), Disposition::Retry);
        }
        assert_eq!(policy.disposition(4, &error), Disposition::DeadLetter);
    }

    #[test]
    fn permanent_failures_dead_letter_on_first_delivery() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.disposition(1, &FetchError::Status(404)),
            Disposition::DeadLetter
        );
        assert_eq!(
            policy.disposition(1, &FetchError::Oversize { limit: 16 }),
            Disposition::DeadLetter
        );
    }

    #[test]
    fn exhaustion_threshold_is_strictly_greater_than_the_cap() {
        let policy = RetryPolicy::new(5);
        assert!(!policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }
}
