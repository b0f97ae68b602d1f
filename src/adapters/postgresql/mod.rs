//! PostgreSQL database integration
//!
//! This module provides the relational tier: a pooled client, the table
//! model and the [`ProviderStore`](crate::adapters::database::ProviderStore)
//! implementation.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::ProviderColumns;
