//! `fetchvault-core` — domain building blocks for the fetch pipeline.
//!
//! This crate contains **pure domain** primitives (no I/O): identifiers,
//! validated source URLs, deterministic storage keys, the job model, and
//! the retry/dead-letter policy.

pub mod error;
pub mod id;
pub mod job;
pub mod key;
pub mod retry;
pub mod url;

pub use error::FetchError;
pub use id::{JobId, ReceiptHandle};
pub use job::{FetchJob, JobState};
pub use key::ObjectKey;
pub use retry::{Disposition, RetryPolicy};
pub use url::{SourceUrl, UrlError};
