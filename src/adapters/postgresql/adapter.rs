//! PostgreSQL adapter implementing the provider store trait

use crate::adapters::database::traits::{ProviderStore, UpsertOutcome};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    count_sql, create_table_sql, delete_all_sql, record_from_row, select_all_sql,
    select_sample_sql, state_count_from_row, top_states_sql, upsert_sql, ProviderColumns,
    TABLE_EXISTS_SQL,
};
use crate::domain::{ProviderRecord, Result, StateCount, TierflowError};
use async_trait::async_trait;
use std::sync::Arc;

/// PostgreSQL implementation of [`ProviderStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
    table: String,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter for one table
    pub fn new(client: PostgreSQLClient, table: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            table: table.into(),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl ProviderStore for PostgreSQLAdapter {
    fn endpoint(&self) -> String {
        self.client.endpoint()
    }

    fn table(&self) -> &str {
        &self.table
    }

    async fn test_connection(&self) -> Result<String> {
        self.client.test_connection().await
    }

    async fn ensure_table(&self) -> Result<()> {
        let client = self.client.get_connection().await?;
        client
            .batch_execute(&create_table_sql(&self.table))
            .await
            .map_err(|e| self.client.map_query_error(e, "create table"))?;

        tracing::info!(table = %self.table, "Table created/verified");
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool> {
        let rows = self.client.query(TABLE_EXISTS_SQL, &[&self.table]).await?;
        rows.first()
            .map(|row| row.try_get::<_, bool>(0))
            .transpose()
            .map_err(|e| TierflowError::Database(format!("Table lookup failed: {}", e)))
            .map(|exists| exists.unwrap_or(false))
    }

    async fn upsert(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let columns = ProviderColumns::from(records);
        let inserted = self
            .client
            .execute(
                &upsert_sql(&self.table),
                &[
                    &columns.npis,
                    &columns.states,
                    &columns.cities,
                    &columns.specialty_codes,
                ],
            )
            .await?;

        tracing::debug!(
            table = %self.table,
            attempted = columns.len(),
            inserted,
            "Bulk insert finished"
        );

        Ok(UpsertOutcome {
            attempted: columns.len(),
            inserted,
        })
    }

    async fn replace_all(&self, records: &[ProviderRecord]) -> Result<UpsertOutcome> {
        let columns = ProviderColumns::from(records);
        let mut client = self.client.get_connection().await?;

        let tx = client
            .transaction()
            .await
            .map_err(|e| self.client.map_query_error(e, "begin transaction"))?;

        let deleted = tx
            .execute(delete_all_sql(&self.table).as_str(), &[])
            .await
            .map_err(|e| self.client.map_query_error(e, "delete"))?;

        let inserted = if columns.is_empty() {
            0
        } else {
            tx.execute(
                upsert_sql(&self.table).as_str(),
                &[
                    &columns.npis,
                    &columns.states,
                    &columns.cities,
                    &columns.specialty_codes,
                ],
            )
            .await
            .map_err(|e| self.client.map_query_error(e, "bulk insert"))?
        };

        tx.commit()
            .await
            .map_err(|e| self.client.map_query_error(e, "commit"))?;

        tracing::info!(
            table = %self.table,
            deleted,
            attempted = columns.len(),
            inserted,
            "Table contents replaced"
        );

        Ok(UpsertOutcome {
            attempted: columns.len(),
            inserted,
        })
    }

    async fn count(&self) -> Result<i64> {
        let rows = self.client.query(&count_sql(&self.table), &[]).await?;
        rows.first()
            .ok_or_else(|| TierflowError::Database("COUNT returned no rows".to_string()))?
            .try_get(0)
            .map_err(|e| TierflowError::Database(format!("Failed to read count: {}", e)))
    }

    async fn fetch_all(&self) -> Result<Vec<ProviderRecord>> {
        let rows = self.client.query(&select_all_sql(&self.table), &[]).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn sample(&self, limit: usize) -> Result<Vec<ProviderRecord>> {
        let limit = limit as i64;
        let rows = self
            .client
            .query(&select_sample_sql(&self.table), &[&limit])
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn top_states(&self, limit: usize) -> Result<Vec<StateCount>> {
        let limit = limit as i64;
        let rows = self
            .client
            .query(&top_states_sql(&self.table), &[&limit])
            .await?;
        rows.iter().map(state_count_from_row).collect()
    }

    async fn close(&self) {
        self.client.close();
    }
}
