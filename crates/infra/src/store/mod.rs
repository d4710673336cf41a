//! Object store boundary.
//!
//! The pipeline only ever writes: one `put` per completed fetch, keyed by
//! the job's derived [`ObjectKey`]. Writes to the same key are overwrites,
//! which is what makes redelivered jobs idempotent at the storage layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fetchvault_core::ObjectKey;

pub mod memory;

pub use memory::InMemoryObjectStore;

/// A stored blob with the metadata the pipeline recorded alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: ObjectKey,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Store-level failure. Always treated as transient by the worker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Write-side port of the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object there.
    ///
    /// The write is atomic per key: concurrent puts to the same key leave
    /// one complete object, never an interleaving.
    async fn put(&self, key: ObjectKey, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StoreError>;
}
