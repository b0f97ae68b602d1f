//! In-memory provider store
//!
//! Mirrors the PostgreSQL table semantics closely enough for dry runs and
//! tests: the table must be created before use, conflicting NPIs are
//! skipped on insert, `replace_all` is all-or-nothing and a closed store
//! rejects every call.

use super::traits::{ProviderStore, UpsertOutcome};
use crate::domain::{ProviderRecord, Result, StateCount, TierflowError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Provider table held in process memory
pub struct MemoryProviderStore {
    table: String,
    rows: Arc<RwLock<Option<BTreeMap<String, ProviderRecord>>>>,
    closed: AtomicBool,
    unreachable: AtomicBool,
}

impl MemoryProviderStore {
    /// Create a store whose table does not exist yet
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Arc::new(RwLock::new(None)),
            closed: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Open a new handle on the same table
    ///
    /// Rows are shared with `self`; the new handle starts open, the way a
    /// later run connects a fresh pool to the same database.
    pub fn reconnect(&self) -> Self {
        Self {
            table: self.table.clone(),
            rows: Arc::clone(&self.rows),
            closed: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Whether [`close`](ProviderStore::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a connection error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_open(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TierflowError::Connection {
                endpoint: self.endpoint(),
                message: "connection refused".to_string(),
            });
        }
        if self.is_closed() {
            return Err(TierflowError::Connection {
                endpoint: self.endpoint(),
                message: "connection pool is closed".to_string(),
            });
        }
        Ok(())
    }

    fn missing_table(&self) -> TierflowError {
        TierflowError::Database(format!("relation \"{}\" does not exist", self.table))
    }

    fn insert_into(table: &mut BTreeMap<String, ProviderRecord>, records: &[ProviderRecord]) -> u64 {
        let now = Utc::now().naive_utc();
        let mut inserted = 0;
        for record in records {
            let key = record.npi.to_string();
            if !table.contains_key(&key) {
                let mut stored = record.clone();
                stored.created_at = Some(now);
                table.insert(key, stored);
                inserted += 1;
            }
        }
        inserted
    }
}

#[async_trait]
impl ProviderStore for MemoryProviderStore {
    fn endpoint(&self) -> String {
        "memory".to_string()
    }

    fn table(&self) -> &str {
        &self.table
    }

    async fn test_connection(&self) -> Result<String> {
        self.check_open()?;
        Ok("in-memory provider store".to_string())
    }

    async fn ensure_table(&self) -> Result<()> {
        self.check_open()?;
        let mut rows = self.rows.write().await;
        if rows.is_none() {
            *rows = Some(BTreeMap::new());
        }
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.rows.read().await.is_some())
    }

    async fn upsert(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome> {
        self.check_open()?;
        let mut rows = self.rows.write().await;
        let table = rows.as_mut().ok_or_else(|| self.missing_table())?;
        let inserted = Self::insert_into(table, records);
        Ok(UpsertOutcome {
            attempted: records.len(),
            inserted,
        })
    }

    async fn replace_all(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome> {
        self.check_open()?;
        let mut rows = self.rows.write().await;
        if rows.is_none() {
            return Err(self.missing_table());
        }
        let mut fresh = BTreeMap::new();
        let inserted = Self::insert_into(&mut fresh, records);
        *rows = Some(fresh);
        Ok(UpsertOutcome {
            attempted: records.len(),
            inserted,
        })
    }

    async fn count(&self) -> Result<i64> {
        self.check_open()?;
        let rows = self.rows.read().await;
        let table = rows.as_ref().ok_or_else(|| self.missing_table())?;
        Ok(table.len() as i64)
    }

    async fn fetch_all(&self) -> Result<Vec<ProviderRecord>> {
        self.check_open()?;
        let rows = self.rows.read().await;
        let table = rows.as_ref().ok_or_else(|| self.missing_table())?;
        Ok(table.values().cloned().collect())
    }

    async fn sample(&self, limit: usize) -> Result<Vec<ProviderRecord>> {
        let mut all = self.fetch_all().await?;
        all.truncate(limit);
        Ok(all)
    }

    async fn top_states(&self, limit: usize) -> Result<Vec<StateCount>> {
        let all = self.fetch_all().await?;
        let mut counts: HashMap<Option<String>, i64> = HashMap::new();
        for record in all {
            *counts.entry(record.state).or_insert(0) += 1;
        }
        let mut counts: Vec<StateCount> = counts
            .into_iter()
            .map(|(state, count)| StateCount { state, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.state.cmp(&b.state)));
        counts.truncate(limit);
        Ok(counts)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
