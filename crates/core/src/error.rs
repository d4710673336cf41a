//! Failure taxonomy for the fetch-and-persist stage.

use thiserror::Error;

/// What went wrong while fetching or persisting one job.
///
/// Every variant classifies as either retryable or permanent (see
/// [`FetchError::is_permanent`]); none of them crashes a worker. A worker
/// failure only ever translates into redelivery or dead-lettering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network-level failure: connect, TLS, read, or overall timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Source answered with a non-success HTTP status.
    #[error("source returned status {0}")]
    Status(u16),

    /// Response body exceeds the configured object byte cap.
    #[error("response exceeds the {limit}-byte object cap")]
    Oversize { limit: u64 },

    /// Object store rejected or failed the write.
    #[error("store write failed: {0}")]
    Store(String),
}

impl FetchError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Permanent failures cannot succeed on redelivery and go straight to
    /// the dead-letter store regardless of remaining delivery budget.
    ///
    /// 4xx statuses are permanent except 408 (request timeout) and 429
    /// (rate limited), which a later delivery may clear. 5xx, transport,
    /// and store failures are all treated as transient.
    pub fn is_permanent(&self) -> bool {
        match self {
            FetchError::Status(code) => {
                (400..500).contains(code) && *code != 408 && *code != 429
            }
            FetchError::Oversize { .. } => true,
            FetchError::Transport(_) | FetchError::Store(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_permanent() {
        assert!(FetchError::Status(400).is_permanent());
        assert!(FetchError::Status(403).is_permanent());
        assert!(FetchError::Status(404).is_permanent());
        assert!(FetchError::Status(410).is_permanent());
    }

    #[test]
    fn retryable_statuses_are_not_permanent() {
        assert!(!FetchError::Status(408).is_permanent());
        assert!(!FetchError::Status(429).is_permanent());
        assert!(!FetchError::Status(500).is_permanent());
        assert!(!FetchError::Status(502).is_permanent());
        assert!(!FetchError::Status(503).is_permanent());
    }

    #[test]
    fn transport_and_store_failures_are_retryable() {
        assert!(!FetchError::transport("connection reset").is_permanent());
        assert!(!FetchError::store("bucket unavailable").is_permanent());
    }

    #[test]
    fn oversize_is_permanent() {
        assert!(FetchError::Oversize { limit: 1024 }.is_permanent());
    }
}
