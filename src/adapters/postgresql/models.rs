//! PostgreSQL table model for provider records
//!
//! SQL for the `cardiology_providers` table and the conversions between
//! [`ProviderRecord`] and driver rows. The table name comes from
//! configuration and is validated as a plain identifier at load time.

use crate::domain::{Npi, ProviderRecord, Result, StateCount, TierflowError};
use chrono::NaiveDateTime;
use tokio_postgres::Row;

/// `CREATE TABLE IF NOT EXISTS` statement for the provider table
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            npi VARCHAR(10) PRIMARY KEY,
            provider_state VARCHAR(2),
            provider_city VARCHAR(100),
            specialty_code VARCHAR(20),
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#
    )
}

/// Bulk insert of column arrays; conflicting NPIs are skipped, never updated
pub fn upsert_sql(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table} (npi, provider_state, provider_city, specialty_code)
        SELECT * FROM UNNEST($1::varchar[], $2::varchar[], $3::varchar[], $4::varchar[])
        ON CONFLICT (npi) DO NOTHING
        "#
    )
}

/// Removes every row; paired with [`upsert_sql`] inside one transaction
pub fn delete_all_sql(table: &str) -> String {
    format!("DELETE FROM {table}")
}

/// Full table read in primary key order
pub fn select_all_sql(table: &str) -> String {
    format!(
        "SELECT npi, provider_state, provider_city, specialty_code, created_at \
         FROM {table} ORDER BY npi"
    )
}

/// First `$1` rows in primary key order
pub fn select_sample_sql(table: &str) -> String {
    format!(
        "SELECT npi, provider_state, provider_city, specialty_code, created_at \
         FROM {table} ORDER BY npi LIMIT $1"
    )
}

/// Row count
pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}

/// Providers per state, largest first
pub fn top_states_sql(table: &str) -> String {
    format!(
        "SELECT provider_state, COUNT(*) AS count FROM {table} \
         GROUP BY provider_state ORDER BY count DESC, provider_state LIMIT $1"
    )
}

/// Whether a table exists in the current search path
pub const TABLE_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)";

/// Provider records split into parallel arrays for `UNNEST`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProviderColumns {
    pub npis: Vec<String>,
    pub states: Vec<Option<String>>,
    pub cities: Vec<Option<String>>,
    pub specialty_codes: Vec<String>,
}

impl ProviderColumns {
    /// Number of rows carried
    pub fn len(&self) -> usize {
        self.npis.len()
    }

    /// Whether no rows are carried
    pub fn is_empty(&self) -> bool {
        self.npis.is_empty()
    }
}

impl From<&[ProviderRecord]> for ProviderColumns {
    fn from(records: &[ProviderRecord]) -> Self {
        let mut columns = ProviderColumns {
            npis: Vec::with_capacity(records.len()),
            states: Vec::with_capacity(records.len()),
            cities: Vec::with_capacity(records.len()),
            specialty_codes: Vec::with_capacity(records.len()),
        };
        for record in records {
            columns.npis.push(record.npi.to_string());
            columns.states.push(record.state.clone());
            columns.cities.push(record.city.clone());
            columns.specialty_codes.push(record.specialty_code.clone());
        }
        columns
    }
}

/// Converts a table row into a provider record
///
/// # Errors
///
/// Returns `TierflowError::Database` if a column is missing or has an
/// unexpected type, and `TierflowError::Validation` for a malformed NPI
pub fn record_from_row(row: &Row) -> Result<ProviderRecord> {
    let column_error =
        |e: tokio_postgres::Error| TierflowError::Database(format!("Unexpected row shape: {}", e));

    let npi: String = row.try_get("npi").map_err(column_error)?;
    let state: Option<String> = row.try_get("provider_state").map_err(column_error)?;
    let city: Option<String> = row.try_get("provider_city").map_err(column_error)?;
    let specialty_code: Option<String> = row.try_get("specialty_code").map_err(column_error)?;
    let created_at: Option<NaiveDateTime> = row.try_get("created_at").map_err(column_error)?;

    Ok(ProviderRecord {
        npi: Npi::new(npi).map_err(TierflowError::Validation)?,
        state,
        city,
        specialty_code: specialty_code.unwrap_or_default(),
        created_at,
    })
}

/// Converts a `top_states_sql` row
pub fn state_count_from_row(row: &Row) -> Result<StateCount> {
    Ok(StateCount {
        state: row
            .try_get("provider_state")
            .map_err(|e| TierflowError::Database(format!("Unexpected row shape: {}", e)))?,
        count: row
            .try_get("count")
            .map_err(|e| TierflowError::Database(format!("Unexpected row shape: {}", e)))?,
    })
}
