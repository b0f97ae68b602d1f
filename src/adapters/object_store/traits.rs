//! Object store abstraction traits
//!
//! This module defines the trait both the staging endpoint and the cloud
//! store are driven through.

use crate::domain::ObjectStoreError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Result type for object store operations
pub type StoreResult<T> = std::result::Result<T, ObjectStoreError>;

/// Content type of every serialized batch
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Metadata returned by a head request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Object size in bytes
    pub size: u64,

    /// Last modification time, when the store reports one
    pub last_modified: Option<DateTime<Utc>>,
}

/// One entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key
    pub key: String,

    /// Object size in bytes
    pub size: u64,
}

/// S3-style object store
///
/// Every call reaches the live endpoint; nothing is cached between calls.
/// Implementations never expose SDK error types.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable endpoint name used in logs and errors
    fn endpoint(&self) -> &str;

    /// Create the bucket if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `BucketCreationFailed` for any failure other than the bucket
    /// already existing, which is logged and treated as success.
    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Write an object, silently overwriting any existing one
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;

    /// Read an entire object
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bucket or key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// Read object metadata
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the bucket or key does not exist
    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata>;

    /// List every object in a bucket
    async fn list_objects(&self, bucket: &str) -> StoreResult<Vec<ObjectSummary>>;

    /// List bucket names
    async fn list_buckets(&self) -> StoreResult<Vec<String>>;
}
