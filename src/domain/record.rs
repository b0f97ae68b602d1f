//! Provider record, the canonical unit moved between tiers

use super::errors::TierflowError;
use super::ids::Npi;
use super::result::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Taxonomy code for cardiovascular disease physicians
pub const CARDIOLOGY_TAXONOMY: &str = "207RC0000X";

/// Format used when a relational timestamp is written to CSV
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One provider as stored in the relational tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Primary key at the relational tier
    pub npi: Npi,

    /// Two-letter practice state; `None` when missing or malformed
    pub state: Option<String>,

    /// Practice city
    pub city: Option<String>,

    /// Primary taxonomy code
    pub specialty_code: String,

    /// Insertion time assigned by the relational tier, never by the source
    pub created_at: Option<NaiveDateTime>,
}

impl ProviderRecord {
    /// Builds a record from raw cell values
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Validation` if the NPI is not ten digits
    pub fn from_cells(npi: &str, state: &str, city: &str, specialty_code: &str) -> Result<Self> {
        let npi = Npi::new(npi).map_err(TierflowError::Validation)?;
        Ok(Self {
            npi,
            state: normalize_state(state),
            city: non_empty(city),
            specialty_code: specialty_code.trim().to_string(),
            created_at: None,
        })
    }

    /// Sets the relational timestamp
    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A state value is kept only when it is exactly two ASCII letters
pub fn normalize_state(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Per-state provider count, as returned by the post-load summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCount {
    /// Two-letter state, `None` for providers without a valid state
    pub state: Option<String>,

    /// Number of providers
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_cells() {
        let record =
            ProviderRecord::from_cells("1467503512", "TN", "NASHVILLE", CARDIOLOGY_TAXONOMY)
                .unwrap();
        assert_eq!(record.npi.as_str(), "1467503512");
        assert_eq!(record.state.as_deref(), Some("TN"));
        assert_eq!(record.city.as_deref(), Some("NASHVILLE"));
        assert_eq!(record.specialty_code, "207RC0000X");
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_from_cells_invalid_npi() {
        let result = ProviderRecord::from_cells("N/A", "TN", "NASHVILLE", CARDIOLOGY_TAXONOMY);
        assert!(matches!(result, Err(TierflowError::Validation(_))));
    }

    #[test]
    fn test_normalize_state() {
        assert_eq!(normalize_state("ca"), Some("CA".to_string()));
        assert_eq!(normalize_state(" NY "), Some("NY".to_string()));
        assert_eq!(normalize_state(""), None);
        assert_eq!(normalize_state("TENNESSEE"), None);
        assert_eq!(normalize_state("1A"), None);
    }

    #[test]
    fn test_empty_city_is_none() {
        let record =
            ProviderRecord::from_cells("1467503512", "", " ", CARDIOLOGY_TAXONOMY).unwrap();
        assert!(record.state.is_none());
        assert!(record.city.is_none());
    }

    #[test]
    fn test_with_created_at() {
        let ts = NaiveDate::from_ymd_opt(2025, 4, 13)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let record = ProviderRecord::from_cells("1467503512", "TN", "NASHVILLE", "207RC0000X")
            .unwrap()
            .with_created_at(ts);
        assert_eq!(record.created_at, Some(ts));
    }
}
