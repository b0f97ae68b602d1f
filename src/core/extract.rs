//! Bulk extractor for the NPPES dissemination file
//!
//! The source file is several gigabytes, so it is streamed row by row on a
//! blocking thread and reading stops as soon as `limit` matching rows have
//! been collected.

use crate::config::schema::SourceConfig;
use crate::core::transform::ColumnMapping;
use crate::domain::{Batch, Result, TierflowError};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exact-match filter on one source column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Source column compared
    pub column: String,
    /// Value the column must equal
    pub value: String,
}

impl Predicate {
    /// Creates a predicate
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Predicate configured under `[source]`
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.filter_column.clone(), config.filter_value.clone())
    }

    fn matches(&self, cell: Option<&[u8]>) -> bool {
        cell == Some(self.value.as_bytes())
    }
}

/// Confirm the source file exists
///
/// # Errors
///
/// Returns `TierflowError::Configuration` if `path` is not a file
pub fn check_source(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(TierflowError::Configuration(format!(
            "Source file not found: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Extract matching rows from a CSV file
///
/// Rows are returned in source order with duplicates preserved. The result
/// header is the projection's target column names. Rows are compared as raw
/// bytes, so non-UTF-8 text in rows that do not match is never decoded;
/// projected cells of matching rows are decoded lossily.
///
/// # Errors
///
/// - `TierflowError::Configuration` if the source file does not exist
/// - `TierflowError::Schema` if the predicate or a projection column is not
///   in the file header
/// - `TierflowError::Serialization` for malformed CSV
pub async fn extract(
    path: impl AsRef<Path>,
    predicate: &Predicate,
    projection: &ColumnMapping,
    limit: usize,
) -> Result<Batch> {
    let path = path.as_ref().to_path_buf();
    check_source(&path)?;

    let predicate = predicate.clone();
    let projection = projection.clone();
    let start = Instant::now();

    tracing::info!(
        source = %path.display(),
        filter_column = %predicate.column,
        filter_value = %predicate.value,
        limit,
        "Extracting rows from source file"
    );

    let batch = tokio::task::spawn_blocking(move || scan(&path, &predicate, &projection, limit))
        .await
        .map_err(|e| TierflowError::Other(format!("Extraction task failed: {e}")))??;

    tracing::info!(
        rows = batch.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Extraction completed"
    );

    Ok(batch)
}

/// Extract using the `[source]` settings and the NPPES projection
///
/// # Errors
///
/// See [`extract`]
pub async fn extract_from_config(config: &SourceConfig) -> Result<Batch> {
    extract(
        PathBuf::from(&config.file_path),
        &Predicate::from_config(config),
        &ColumnMapping::nppes_projection(&config.filter_column),
        config.limit,
    )
    .await
}

fn scan(
    path: &Path,
    predicate: &Predicate,
    projection: &ColumnMapping,
    limit: usize,
) -> Result<Batch> {
    let mut batch = Batch::new(projection.targets());

    let file = File::open(path).map_err(|e| {
        TierflowError::Io(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = reader.byte_headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name.as_bytes());

    let mut missing = Vec::new();
    let filter_idx = position(predicate.column.as_str());
    if filter_idx.is_none() {
        missing.push(predicate.column.clone());
    }
    let mut source_idx = Vec::with_capacity(projection.len());
    for source in projection.sources() {
        match position(source) {
            Some(idx) => source_idx.push(idx),
            None => missing.push(source.to_string()),
        }
    }
    let filter_idx = match filter_idx {
        Some(idx) if missing.is_empty() => idx,
        _ => {
            return Err(TierflowError::Schema(format!(
                "Source file {} is missing column(s): {}",
                path.display(),
                missing.join(", ")
            )))
        }
    };

    if limit == 0 {
        return Ok(batch);
    }

    let mut record = csv::ByteRecord::new();
    let mut scanned: u64 = 0;
    let mut lossy: u64 = 0;
    while reader.read_byte_record(&mut record)? {
        scanned += 1;
        if !predicate.matches(record.get(filter_idx)) {
            continue;
        }
        let row = source_idx
            .iter()
            .map(|&idx| {
                let cell = record.get(idx).unwrap_or_default();
                match std::str::from_utf8(cell) {
                    Ok(text) => text.to_string(),
                    Err(_) => {
                        lossy += 1;
                        String::from_utf8_lossy(cell).into_owned()
                    }
                }
            })
            .collect();
        batch.push_row(row)?;
        if batch.len() >= limit {
            break;
        }
    }

    if lossy > 0 {
        tracing::warn!(cells = lossy, "Replaced invalid UTF-8 in extracted cells");
    }
    tracing::debug!(scanned, matched = batch.len(), "Source scan finished");

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "NPI,Entity Type Code,Provider Business Practice Location Address City Name,Provider Business Practice Location Address State Name,Healthcare Provider Taxonomy Code_1";

    fn source_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn cardiology() -> Predicate {
        Predicate::new("Healthcare Provider Taxonomy Code_1", "207RC0000X")
    }

    fn projection() -> ColumnMapping {
        ColumnMapping::nppes_projection("Healthcare Provider Taxonomy Code_1")
    }

    #[tokio::test]
    async fn test_extract_filters_and_projects() {
        let file = source_file(&[
            "1467503512,1,NASHVILLE,TN,207RC0000X",
            "1000000002,1,AUSTIN,TX,208D00000X",
            "1730142874,1,LOS ANGELES,CA,207RC0000X",
        ]);

        let batch = extract(file.path(), &cardiology(), &projection(), 10)
            .await
            .unwrap();

        assert_eq!(batch.columns(), ["NPI", "State", "City", "Taxonomy"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.rows()[0],
            vec!["1467503512", "TN", "NASHVILLE", "207RC0000X"]
        );
        assert_eq!(batch.rows()[1][0], "1730142874");
    }

    #[tokio::test]
    async fn test_extract_stops_at_limit() {
        let file = source_file(&[
            "1000000001,1,A,TN,207RC0000X",
            "1000000002,1,B,TN,207RC0000X",
            "1000000003,1,C,TN,207RC0000X",
        ]);

        let batch = extract(file.path(), &cardiology(), &projection(), 2)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[1][0], "1000000002");
    }

    #[tokio::test]
    async fn test_extract_zero_limit_is_empty() {
        let file = source_file(&["1000000001,1,A,TN,207RC0000X"]);
        let batch = extract(file.path(), &cardiology(), &projection(), 0)
            .await
            .unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.columns().len(), 4);
    }

    #[tokio::test]
    async fn test_extract_keeps_duplicates() {
        let file = source_file(&[
            "1000000001,1,A,TN,207RC0000X",
            "1000000001,1,A,TN,207RC0000X",
        ]);
        let batch = extract(file.path(), &cardiology(), &projection(), 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_missing_column() {
        let file = source_file(&["1000000001,1,A,TN,207RC0000X"]);
        let predicate = Predicate::new("Healthcare Provider Taxonomy Code_2", "207RC0000X");

        let err = extract(file.path(), &predicate, &projection(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, TierflowError::Schema(_)));
        assert!(err.to_string().contains("Code_2"));
    }

    #[tokio::test]
    async fn test_extract_skips_non_utf8_rows_that_do_not_match() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        file.write_all(b"1467503512,1,NASHVILLE,TN,207RC0000X\n").unwrap();
        file.write_all(b"1000000002,1,SAN JOS\xC9,CA,208D00000X\n").unwrap();
        file.write_all(b"1730142874,1,LOS ANGELES,CA,207RC0000X\n").unwrap();
        file.flush().unwrap();

        let batch = extract(file.path(), &cardiology(), &projection(), 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[1][0], "1730142874");
    }

    #[tokio::test]
    async fn test_extract_decodes_matching_non_utf8_cell_lossily() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        file.write_all(b"1000000002,1,SAN JOS\xC9,CA,207RC0000X\n").unwrap();
        file.flush().unwrap();

        let batch = extract(file.path(), &cardiology(), &projection(), 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.rows()[0][2], "SAN JOS\u{FFFD}");
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let err = extract(
            "/nonexistent/npidata.csv",
            &cardiology(),
            &projection(),
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TierflowError::Configuration(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
