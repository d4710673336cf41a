//! Shared tracing setup for fetchvault binaries and tests.

use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::EnvFilter;

/// Fallback filter when `RUST_LOG` is unset. The pipeline's own stages log
/// the useful per-job signal at `debug`; everything else stays at `info`.
const DEFAULT_FILTER: &str = "info,fetchvault_infra=debug";

/// Initialize process-wide tracing.
///
/// JSON lines with timestamps, filtered by `RUST_LOG` (falling back to
/// [`DEFAULT_FILTER`]). Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_timer(SystemTime)
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init();
}
