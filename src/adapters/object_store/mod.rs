//! Object store adapters
//!
//! The staging endpoint and the cloud store are both driven through the
//! [`ObjectStore`] trait:
//!
//! - [`S3ObjectStore`] talks to a live S3-compatible endpoint via aws-sdk-s3
//! - [`MemoryObjectStore`] keeps everything in process memory for dry runs
//!   and tests

pub mod memory;
pub mod s3;
pub mod traits;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;
pub use traits::{
    ObjectMetadata, ObjectStore, ObjectSummary, StoreResult, CSV_CONTENT_TYPE,
};
