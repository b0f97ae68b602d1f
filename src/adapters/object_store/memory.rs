//! In-memory object store
//!
//! Backs dry runs and tests. Buckets and objects live in ordered maps so
//! listings come back sorted by name, the way S3 returns them.

use super::traits::{ObjectMetadata, ObjectStore, ObjectSummary, StoreResult};
use crate::domain::ObjectStoreError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Object store held entirely in process memory
///
/// # Example
///
/// ```
/// use tierflow::adapters::object_store::{MemoryObjectStore, ObjectStore};
/// use bytes::Bytes;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryObjectStore::new("memory://staging");
/// store.ensure_bucket("raw-data").await?;
/// store.put_object("raw-data", "sample.csv", Bytes::from("NPI\n"), "text/csv").await?;
/// assert_eq!(store.head_object("raw-data", "sample.csv").await?.size, 4);
/// # Ok(())
/// # }
/// ```
pub struct MemoryObjectStore {
    name: String,
    buckets: RwLock<Buckets>,
    unreachable: AtomicBool,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buckets: RwLock::new(BTreeMap::new()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Create a store with the given buckets already present
    pub fn with_buckets(name: impl Into<String>, buckets: &[&str]) -> Self {
        let map = buckets
            .iter()
            .map(|b| (b.to_string(), BTreeMap::new()))
            .collect();
        Self {
            name: name.into(),
            buckets: RwLock::new(map),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with a timeout
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self, operation: &str) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Timeout {
                endpoint: self.name.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn not_found(bucket: &str, key: &str) -> ObjectStoreError {
        ObjectStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.check_reachable("create_bucket")?;
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            tracing::info!(bucket = %bucket, endpoint = %self.name, "Bucket already exists");
        } else {
            buckets.insert(bucket.to_string(), BTreeMap::new());
            tracing::info!(bucket = %bucket, endpoint = %self.name, "Created bucket");
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StoreResult<()> {
        self.check_reachable("put_object")?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::not_found(bucket, key))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        self.check_reachable("get_object")?;
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        self.check_reachable("head_object")?;
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| ObjectMetadata {
                size: object.data.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    async fn list_objects(&self, bucket: &str) -> StoreResult<Vec<ObjectSummary>> {
        self.check_reachable("list_objects")?;
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Self::not_found(bucket, ""))?;
        Ok(objects
            .iter()
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.data.len() as u64,
            })
            .collect())
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        self.check_reachable("list_buckets")?;
        Ok(self.buckets.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = MemoryObjectStore::with_buckets("memory", &["raw-data"]);
        store
            .put_object("raw-data", "a.csv", Bytes::from("first"), "text/csv")
            .await
            .unwrap();
        store
            .put_object("raw-data", "a.csv", Bytes::from("second"), "text/csv")
            .await
            .unwrap();

        let data = store.get_object("raw-data", "a.csv").await.unwrap();
        assert_eq!(&data[..], b"second");
        assert_eq!(store.list_objects("raw-data").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_bucket_idempotent() {
        let store = MemoryObjectStore::new("memory");
        store.ensure_bucket("raw-data").await.unwrap();
        store.ensure_bucket("raw-data").await.unwrap();
        assert_eq!(store.list_buckets().await.unwrap(), vec!["raw-data"]);
    }

    #[tokio::test]
    async fn test_missing_key_and_bucket_are_not_found() {
        let store = MemoryObjectStore::with_buckets("memory", &["raw-data"]);
        let err = store.get_object("raw-data", "missing.csv").await.unwrap_err();
        assert!(err.is_not_found());

        let err = store.head_object("nope", "x").await.unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .put_object("nope", "x", Bytes::from("x"), "text/csv")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unreachable_times_out() {
        let store = MemoryObjectStore::with_buckets("memory", &["raw-data"]);
        store.set_unreachable(true);
        let err = store.get_object("raw-data", "a.csv").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::Timeout { .. }));
        assert!(!err.is_not_found());

        store.set_unreachable(false);
        assert!(store.list_buckets().await.is_ok());
    }

    #[tokio::test]
    async fn test_head_reports_size() {
        let store = MemoryObjectStore::with_buckets("memory", &["b"]);
        store
            .put_object("b", "k", Bytes::from("12345"), "text/csv")
            .await
            .unwrap();
        let meta = store.head_object("b", "k").await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(meta.last_modified.is_some());
    }
}
