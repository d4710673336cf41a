//! In-memory object store adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use fetchvault_core::ObjectKey;

use super::{ObjectStore, StoreError, StoredObject};

/// Process-local [`ObjectStore`] keeping whole objects in a map.
///
/// The bucket name is carried for log parity with a remote store; it does
/// not namespace anything here.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: RwLock<HashMap<ObjectKey, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read an object back. Reads are an inspection surface, not part of
    /// the pipeline's write-only port.
    pub async fn get(&self, key: &ObjectKey) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        debug!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            content_type = %content_type,
            "object stored"
        );
        objects.insert(
            key.clone(),
            StoredObject {
                key,
                bytes,
                content_type: content_type.to_string(),
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchvault_core::SourceUrl;

    fn key_for(path: &str) -> ObjectKey {
        let url = SourceUrl::parse(&format!("https://example.com/{path}")).unwrap();
        ObjectKey::derive(&url, "image/png")
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryObjectStore::new("test-bucket");
        let key = key_for("a.png");

        store
            .put(key.clone(), vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        let object = store.get(&key).await.unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.content_type, "image/png");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_put_to_the_same_key_overwrites() {
        let store = InMemoryObjectStore::new("test-bucket");
        let key = key_for("b.png");

        store
            .put(key.clone(), vec![0; 16], "image/png")
            .await
            .unwrap();
        store
            .put(key.clone(), vec![9; 8], "image/png")
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&key).await.unwrap().bytes, vec![9; 8]);
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = InMemoryObjectStore::new("test-bucket");
        assert!(store.get(&key_for("nope")).await.is_none());
        assert!(store.is_empty().await);
    }
}
