//! Domain models and types for Tierflow.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`Npi`])
//! - **Records and batches** ([`ProviderRecord`], [`Batch`], [`RecordLayout`])
//! - **Error types** ([`TierflowError`], [`ObjectStoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TierflowError>`]:
//!
//! ```rust
//! use tierflow::domain::{Npi, Result, TierflowError};
//!
//! fn parse(raw: &str) -> Result<Npi> {
//!     Npi::new(raw).map_err(TierflowError::Validation)
//! }
//!
//! assert!(parse("1467503512").is_ok());
//! assert!(parse("bogus").is_err());
//! ```

pub mod batch;
pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use batch::{Batch, RecordLayout};
pub use errors::{ObjectStoreError, TierflowError};
pub use ids::Npi;
pub use record::{ProviderRecord, StateCount, CARDIOLOGY_TAXONOMY};
pub use result::Result;
