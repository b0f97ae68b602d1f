//! Relational store abstraction traits
//!
//! This module defines the trait the provider table is driven through.

use crate::domain::{ProviderRecord, Result, StateCount};
use async_trait::async_trait;

/// Outcome of one bulk insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertOutcome {
    /// Rows sent in the statement
    pub attempted: usize,

    /// Rows actually inserted; conflicting NPIs are skipped
    pub inserted: u64,
}

impl UpsertOutcome {
    /// Rows skipped because their NPI was already present
    pub fn skipped(&self) -> u64 {
        (self.attempted as u64).saturating_sub(self.inserted)
    }
}

/// Provider table client
///
/// One implementation talks to PostgreSQL, the other keeps rows in memory.
/// Connections are scoped to the client; callers must invoke
/// [`close`](ProviderStore::close) once the run is over, whatever its outcome.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Human-readable endpoint name used in logs and errors
    fn endpoint(&self) -> String;

    /// Name of the provider table
    fn table(&self) -> &str;

    /// Open a connection and return the server version
    ///
    /// # Errors
    ///
    /// Returns `Connection`, `Authentication` or `Timeout` naming the endpoint
    async fn test_connection(&self) -> Result<String>;

    /// Create the provider table if it does not exist
    async fn ensure_table(&self) -> Result<()>;

    /// Whether the provider table exists
    async fn table_exists(&self) -> Result<bool>;

    /// Insert records in one statement, skipping NPIs already present
    ///
    /// Re-running with the same records leaves the row count unchanged.
    async fn upsert(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome>;

    /// Delete every row and insert `records`, atomically
    ///
    /// On any failure the transaction is rolled back and the previous
    /// contents survive.
    async fn replace_all(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome>;

    /// Number of rows in the table
    async fn count(&self) -> Result<i64>;

    /// Every row in NPI order
    async fn fetch_all(&self) -> Result<Vec<ProviderRecord>>;

    /// The first `limit` rows in NPI order
    async fn sample(&self, limit: usize) -> Result<Vec<ProviderRecord>>;

    /// Providers per state, largest first
    async fn top_states(&self, limit: usize) -> Result<Vec<StateCount>>;

    /// Release every connection held by the client
    async fn close(&self);
}
