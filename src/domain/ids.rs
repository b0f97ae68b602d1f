//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a National Provider Identifier
pub const NPI_LENGTH: usize = 10;

/// National Provider Identifier newtype wrapper
///
/// A fixed-format, 10-digit numeric identifier. It is the primary key of the
/// relational tier and the identity carried across every hop.
///
/// # Examples
///
/// ```
/// use tierflow::domain::ids::Npi;
/// use std::str::FromStr;
///
/// let npi = Npi::from_str("1234567893").unwrap();
/// assert_eq!(npi.as_str(), "1234567893");
/// assert!(Npi::from_str("12-34").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Npi(String);

impl Npi {
    /// Creates a new Npi, trimming surrounding whitespace
    ///
    /// # Returns
    ///
    /// Returns `Err` if the value is not exactly ten ASCII digits
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("NPI cannot be empty".to_string());
        }
        if trimmed.len() != NPI_LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "Invalid NPI '{trimmed}': expected {NPI_LENGTH} digits"
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the NPI as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Npi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Npi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Npi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npi_valid() {
        let npi = Npi::new("1467503512").unwrap();
        assert_eq!(npi.as_str(), "1467503512");
        assert_eq!(npi.to_string(), "1467503512");
    }

    #[test]
    fn test_npi_trims_whitespace() {
        let npi = Npi::new(" 1467503512 ").unwrap();
        assert_eq!(npi.as_str(), "1467503512");
    }

    #[test]
    fn test_npi_rejects_bad_values() {
        assert!(Npi::new("").is_err());
        assert!(Npi::new("   ").is_err());
        assert!(Npi::new("146750351").is_err());
        assert!(Npi::new("14675035120").is_err());
        assert!(Npi::new("14675O3512").is_err());
    }

    #[test]
    fn test_npi_ordering() {
        let a = Npi::new("1000000001").unwrap();
        let b = Npi::new("1000000002").unwrap();
        assert!(a < b);
    }
}
