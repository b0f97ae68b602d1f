//! Column rename transform
//!
//! The transform between tier A and tier B only renames columns: row count,
//! row order and every cell value are carried over unchanged. A
//! [`ColumnMapping`] is an ordered list of `source -> target` pairs and is
//! reversible.

use crate::domain::{Batch, Result, TierflowError};

/// Ordered `source -> target` column pairs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    pairs: Vec<(String, String)>,
}

impl ColumnMapping {
    /// Creates a mapping from `(source, target)` pairs
    pub fn new<S, T>(pairs: impl IntoIterator<Item = (S, T)>) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        }
    }

    /// Rename applied between the raw and processed tiers
    pub fn provider_default() -> Self {
        Self::new([
            ("State", "provider_state"),
            ("City", "provider_city"),
            ("Taxonomy", "specialty_code"),
        ])
    }

    /// Projection applied to the NPPES dissemination file during extraction
    ///
    /// `filter_column` is the taxonomy column the predicate reads, which is
    /// also the column projected to `Taxonomy`.
    pub fn nppes_projection(filter_column: &str) -> Self {
        Self::new([
            ("NPI", "NPI"),
            (
                "Provider Business Practice Location Address State Name",
                "State",
            ),
            (
                "Provider Business Practice Location Address City Name",
                "City",
            ),
            (filter_column, "Taxonomy"),
        ])
    }

    /// The same mapping with every pair flipped
    pub fn reverse(&self) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .map(|(s, t)| (t.clone(), s.clone()))
                .collect(),
        }
    }

    /// Pairs in order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Source column names in order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(s, _)| s.as_str())
    }

    /// Target column names in order
    pub fn targets(&self) -> Vec<String> {
        self.pairs.iter().map(|(_, t)| t.clone()).collect()
    }

    /// Target name for a source column, if mapped
    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the mapping has no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Rename batch columns according to `mapping`
///
/// Columns not named by the mapping keep their name.
///
/// # Errors
///
/// Returns `TierflowError::Schema` if a mapping source column is not in the
/// batch header.
///
/// # Examples
///
/// ```
/// use tierflow::core::transform::{rename, ColumnMapping};
/// use tierflow::domain::Batch;
///
/// let batch = Batch::from_parts(
///     vec!["NPI".into(), "State".into(), "City".into(), "Taxonomy".into()],
///     vec![vec!["1467503512".into(), "TN".into(), "NASHVILLE".into(), "207RC0000X".into()]],
/// )
/// .unwrap();
///
/// let renamed = rename(batch, &ColumnMapping::provider_default()).unwrap();
/// assert_eq!(renamed.columns(), ["NPI", "provider_state", "provider_city", "specialty_code"]);
/// ```
pub fn rename(batch: Batch, mapping: &ColumnMapping) -> Result<Batch> {
    let missing: Vec<&str> = mapping
        .sources()
        .filter(|source| batch.column_index(source).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(TierflowError::Schema(format!(
            "Rename source column(s) not in batch: {} (have: {})",
            missing.join(", "),
            batch.columns().join(", ")
        )));
    }

    let columns = batch
        .columns()
        .iter()
        .map(|c| mapping.target_of(c).unwrap_or(c).to_string())
        .collect();

    tracing::debug!(rows = batch.len(), renamed = mapping.len(), "Renamed columns");

    Ok(batch.with_columns(columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_batch() -> Batch {
        Batch::from_parts(
            vec![
                "NPI".to_string(),
                "State".to_string(),
                "City".to_string(),
                "Taxonomy".to_string(),
            ],
            vec![
                vec![
                    "1467503512".to_string(),
                    "TN".to_string(),
                    "NASHVILLE".to_string(),
                    "207RC0000X".to_string(),
                ],
                vec![
                    "1730142874".to_string(),
                    "".to_string(),
                    "Los Angeles".to_string(),
                    "207RC0000X".to_string(),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rename_preserves_rows() {
        let original = raw_batch();
        let renamed = rename(original.clone(), &ColumnMapping::provider_default()).unwrap();

        assert_eq!(
            renamed.columns(),
            ["NPI", "provider_state", "provider_city", "specialty_code"]
        );
        assert_eq!(renamed.len(), original.len());
        assert_eq!(renamed.rows(), original.rows());
    }

    #[test]
    fn test_rename_missing_source_column() {
        let batch = Batch::new(vec!["NPI".to_string(), "State".to_string()]);
        let err = rename(batch, &ColumnMapping::provider_default()).unwrap_err();

        assert!(matches!(err, TierflowError::Schema(_)));
        assert!(err.to_string().contains("City"));
        assert!(err.to_string().contains("Taxonomy"));
    }

    #[test]
    fn test_reverse_restores_header() {
        let mapping = ColumnMapping::provider_default();
        let original = raw_batch();
        let renamed = rename(original.clone(), &mapping).unwrap();
        let restored = rename(renamed, &mapping.reverse()).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_empty_mapping_is_identity() {
        let original = raw_batch();
        let renamed = rename(original.clone(), &ColumnMapping::default()).unwrap();
        assert_eq!(renamed, original);
    }

    #[test]
    fn test_nppes_projection_uses_filter_column() {
        let projection = ColumnMapping::nppes_projection("Healthcare Provider Taxonomy Code_1");
        assert_eq!(projection.targets(), vec!["NPI", "State", "City", "Taxonomy"]);
        assert_eq!(
            projection.target_of("Healthcare Provider Taxonomy Code_1"),
            Some("Taxonomy")
        );
    }
}
