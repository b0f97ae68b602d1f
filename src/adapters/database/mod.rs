//! Relational store abstraction layer
//!
//! The provider table is reached through the [`ProviderStore`] trait so the
//! pipeline runs unchanged against PostgreSQL or the in-memory store.

pub mod memory;
pub mod traits;

pub use memory::MemoryProviderStore;
pub use traits::{ProviderStore, UpsertOutcome};
