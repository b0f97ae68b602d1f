//! External system integrations for Tierflow.
//!
//! This module provides adapters for the three kinds of store a run touches:
//!
//! - [`object_store`] - S3 protocol stores (staging endpoint and cloud bucket)
//! - [`database`] - Relational store abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//! - [`factory`] - Builds the clients for a run from configuration
//!
//! # Design Pattern
//!
//! Adapters isolate third-party SDKs behind traits so the pipeline can run
//! against in-memory implementations in tests and dry runs:
//!
//! ```rust
//! use tierflow::adapters::object_store::{MemoryObjectStore, ObjectStore};
//! use tierflow::adapters::database::{MemoryProviderStore, ProviderStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let staging = MemoryObjectStore::new("memory://staging");
//! staging.ensure_bucket("raw-data").await?;
//!
//! let table = MemoryProviderStore::new("cardiology_providers");
//! table.ensure_table().await?;
//! assert_eq!(table.count().await?, 0);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod factory;
pub mod object_store;
pub mod postgresql;

pub use factory::{create_in_memory_stores, create_stores, Stores};
