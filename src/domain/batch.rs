//! Tabular batch of provider rows
//!
//! A [`Batch`] is what flows between stages: an ordered header plus rows of
//! string cells. Object-store tiers hold a batch serialized as CSV; the
//! relational tier holds [`ProviderRecord`]s, and a [`RecordLayout`] names the
//! columns that carry each record field so the two can be converted.
//!
//! # Example
//!
//! ```
//! use tierflow::domain::batch::Batch;
//!
//! let mut batch = Batch::new(vec!["NPI".to_string(), "State".to_string()]);
//! batch.push_row(vec!["1467503512".to_string(), "TN".to_string()]).unwrap();
//!
//! let bytes = batch.to_csv_bytes().unwrap();
//! assert_eq!(Batch::from_csv_bytes(&bytes).unwrap(), batch);
//! ```

use super::errors::TierflowError;
use super::record::{ProviderRecord, CREATED_AT_FORMAT};
use super::result::Result;
use std::collections::HashSet;

/// Ordered rows sharing one header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Batch {
    /// Creates an empty batch with the given header
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a batch from a header and rows
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Schema` if any row width differs from the header
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut batch = Self::new(columns);
        for row in rows {
            batch.push_row(row)?;
        }
        Ok(batch)
    }

    /// Appends a row
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Schema` if the row width differs from the header
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TierflowError::Schema(format!(
                "Row {} has {} cells, header has {} columns",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Header names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column, or a schema error naming it
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            TierflowError::Schema(format!(
                "Column '{}' not found (have: {})",
                name,
                self.columns.join(", ")
            ))
        })
    }

    /// Values of one column in row order
    pub fn column_values(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Number of distinct non-empty values in a column
    pub fn distinct_count(&self, name: &str) -> Result<usize> {
        let values: HashSet<&str> = self
            .column_values(name)?
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        Ok(values.len())
    }

    /// Replaces the header, keeping every row untouched
    pub(crate) fn with_columns(self, columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: self.rows,
        }
    }

    /// Serializes the batch as CSV with a header row
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Serialization` if the CSV writer fails
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| TierflowError::Serialization(format!("Failed to flush CSV: {}", e)))
    }

    /// Parses CSV bytes (header row first) into a batch
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Serialization` for malformed CSV or ragged rows
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut batch = Self::new(columns);
        for record in reader.records() {
            let record = record?;
            batch.rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(batch)
    }

    /// Converts rows into provider records using a layout
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Schema` if a layout column is missing and
    /// `TierflowError::Validation` for a row with an invalid NPI
    pub fn to_records(&self, layout: &RecordLayout) -> Result<Vec<ProviderRecord>> {
        let npi = self.require_column(&layout.npi)?;
        let state = self.require_column(&layout.state)?;
        let city = self.require_column(&layout.city)?;
        let specialty = self.require_column(&layout.specialty_code)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                ProviderRecord::from_cells(&row[npi], &row[state], &row[city], &row[specialty])
                    .map_err(|e| TierflowError::Validation(format!("Row {}: {}", i + 1, e)))
            })
            .collect()
    }

    /// Builds a batch from provider records using a layout
    pub fn from_records(records: &[ProviderRecord], layout: &RecordLayout) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                let mut row = vec![
                    r.npi.to_string(),
                    r.state.clone().unwrap_or_default(),
                    r.city.clone().unwrap_or_default(),
                    r.specialty_code.clone(),
                ];
                if layout.created_at.is_some() {
                    row.push(
                        r.created_at
                            .map(|ts| ts.format(CREATED_AT_FORMAT).to_string())
                            .unwrap_or_default(),
                    );
                }
                row
            })
            .collect();

        Self {
            columns: layout.columns(),
            rows,
        }
    }
}

/// Names of the columns carrying each record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Column holding the NPI
    pub npi: String,
    /// Column holding the state
    pub state: String,
    /// Column holding the city
    pub city: String,
    /// Column holding the taxonomy code
    pub specialty_code: String,
    /// Column holding the relational timestamp, when present
    pub created_at: Option<String>,
}

impl RecordLayout {
    /// Layout of a freshly extracted batch (tier A)
    pub fn extracted() -> Self {
        Self {
            npi: "NPI".to_string(),
            state: "State".to_string(),
            city: "City".to_string(),
            specialty_code: "Taxonomy".to_string(),
            created_at: None,
        }
    }

    /// Layout after the column rename (tier B)
    pub fn processed() -> Self {
        Self {
            npi: "NPI".to_string(),
            state: "provider_state".to_string(),
            city: "provider_city".to_string(),
            specialty_code: "specialty_code".to_string(),
            created_at: None,
        }
    }

    /// Layout of a full relational table export (tiers D and E)
    pub fn relational() -> Self {
        Self {
            npi: "npi".to_string(),
            state: "provider_state".to_string(),
            city: "provider_city".to_string(),
            specialty_code: "specialty_code".to_string(),
            created_at: Some("created_at".to_string()),
        }
    }

    /// Header in field order
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.npi.clone(),
            self.state.clone(),
            self.city.clone(),
            self.specialty_code.clone(),
        ];
        if let Some(created_at) = &self.created_at {
            columns.push(created_at.clone());
        }
        columns
    }
}
