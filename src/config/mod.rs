//! Configuration management for Tierflow.
//!
//! TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Tierflow uses one TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `TIERFLOW_<SECTION>_<KEY>` overrides
//! - Default values for bucket, key and table names
//! - Validation before any stage runs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tierflow::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tierflow.toml")?;
//! println!("Source: {}", config.source.file_path);
//! println!("Staging: {}", config.staging.endpoint);
//! println!("Table: {}", config.pipeline.table);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! file_path = "${SOURCE_FILE_PATH}"
//!
//! [staging]
//! endpoint = "${MINIO_ENDPOINT}"
//! access_key = "${MINIO_ACCESS_KEY}"
//! secret_key = "${MINIO_SECRET_KEY}"
//!
//! [cloud]
//! profile = "${AWS_PROFILE}"
//! region = "${AWS_REGION}"
//! bucket = "${AWS_BUCKET}"
//!
//! [postgresql]
//! host = "${POSTGRES_HOST}"
//! port = 5432
//! database = "${POSTGRES_DB}"
//! user = "${POSTGRES_USER}"
//! password = "${POSTGRES_PASSWORD}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CloudStoreConfig, LoggingConfig, PipelineConfig, PostgreSQLConfig,
    SourceConfig, StagingStoreConfig, TierflowConfig, VerificationConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
