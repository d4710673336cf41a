//! Environment-driven configuration.
//!
//! Every knob has a default, so a bare `fetchvault-api` starts against the
//! in-memory backends. Unparseable values fall back to the default with a
//! logged warning instead of aborting startup.

use std::time::Duration;

use fetchvault_core::RetryPolicy;
use fetchvault_infra::fetch::FetchLimits;
use fetchvault_infra::worker::WorkerConfig;

pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address for the HTTP server (`BIND_ADDR`).
    pub bind_addr: String,
    /// Remote queue endpoint (`QUEUE_ENDPOINT`); unset selects the
    /// in-memory queue.
    pub queue_endpoint: Option<String>,
    /// Bucket name recorded with stored objects (`OBJECT_STORE_BUCKET`).
    pub object_store_bucket: String,
    /// Delivery cap before dead-lettering (`MAX_DELIVERY_COUNT`).
    pub max_delivery_count: u32,
    /// Response body cap in bytes (`MAX_OBJECT_BYTES`).
    pub max_object_bytes: u64,
    /// Per-job fetch deadline (`FETCH_TIMEOUT_SECONDS`).
    pub fetch_timeout: Duration,
    /// Queue lease window (`VISIBILITY_TIMEOUT_SECONDS`).
    pub visibility_timeout: Duration,
    /// Worker pool size (`WORKER_CONCURRENCY`).
    pub worker_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            queue_endpoint: None,
            object_store_bucket: "fetchvault-objects".to_string(),
            max_delivery_count: 5,
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
            fetch_timeout: Duration::from_secs(30),
            visibility_timeout: Duration::from_secs(300),
            worker_concurrency: 4,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("BIND_ADDR", defaults.bind_addr),
            queue_endpoint: std::env::var("QUEUE_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            object_store_bucket: env_string("OBJECT_STORE_BUCKET", defaults.object_store_bucket),
            max_delivery_count: env_parse("MAX_DELIVERY_COUNT", defaults.max_delivery_count),
            max_object_bytes: env_parse("MAX_OBJECT_BYTES", defaults.max_object_bytes),
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECONDS", 30)),
            visibility_timeout: Duration::from_secs(env_parse("VISIBILITY_TIMEOUT_SECONDS", 300)),
            worker_concurrency: env_parse("WORKER_CONCURRENCY", defaults.worker_concurrency),
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: self.fetch_timeout,
            max_object_bytes: self.max_object_bytes,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_concurrency(self.worker_concurrency)
            .with_visibility_timeout(self.visibility_timeout)
            .with_job_timeout(self.fetch_timeout)
            .with_retry(RetryPolicy::new(self.max_delivery_count))
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var = key, value = %raw, "unparseable environment value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_delivery_count, 5);
        assert_eq!(config.max_object_bytes, 25 * 1024 * 1024);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.visibility_timeout, Duration::from_secs(300));
        assert!(config.queue_endpoint.is_none());
    }

    #[test]
    fn worker_config_carries_the_pipeline_knobs() {
        let config = AppConfig {
            max_delivery_count: 7,
            worker_concurrency: 2,
            visibility_timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(9),
            ..AppConfig::default()
        };

        let worker = config.worker_config();
        assert_eq!(worker.concurrency, 2);
        assert_eq!(worker.visibility_timeout, Duration::from_secs(120));
        assert_eq!(worker.job_timeout, Duration::from_secs(9));
        assert_eq!(worker.retry.max_delivery_count, 7);

        let limits = config.fetch_limits();
        assert_eq!(limits.timeout, Duration::from_secs(9));
        assert_eq!(limits.max_object_bytes, 25 * 1024 * 1024);
    }
}
