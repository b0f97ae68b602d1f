//! Domain error types
//!
//! This module defines the error hierarchy for Tierflow. All errors are
//! domain-specific and don't expose third-party SDK or driver types.

use thiserror::Error;

/// Main Tierflow error type
///
/// This is the primary error type used throughout the application.
/// Each variant maps to one failure category of a pipeline run.
#[derive(Debug, Error)]
pub enum TierflowError {
    /// Configuration-related errors (missing option, missing source file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Object store errors
    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    /// Relational store errors
    #[error("Database error: {0}")]
    Database(String),

    /// A store could not be reached
    #[error("Connection error ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A network call exceeded its deadline
    #[error("Timeout during {operation} against {endpoint}")]
    Timeout { endpoint: String, operation: String },

    /// The artifact a stage depends on does not exist
    #[error("Missing predecessor artifact for {stage}: {artifact}")]
    MissingArtifact { stage: String, artifact: String },

    /// Column layout does not match what a stage expects
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// Post-write verification failed
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was stopped by a shutdown signal between stages
    #[error("Run interrupted before {0}")]
    Interrupted(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl TierflowError {
    /// Whether the failure is transient (a re-run may succeed without changes)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TierflowError::Timeout { .. }
                | TierflowError::ObjectStore(ObjectStoreError::Timeout { .. })
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TierflowError::Configuration(_) => 2,
            TierflowError::MissingArtifact { .. } => 3,
            TierflowError::Connection { .. }
            | TierflowError::Authentication(_)
            | TierflowError::Timeout { .. }
            | TierflowError::ObjectStore(ObjectStoreError::Connection { .. })
            | TierflowError::ObjectStore(ObjectStoreError::Timeout { .. }) => 4,
            TierflowError::Interrupted(_) => 130,
            _ => 5,
        }
    }
}

/// Object store-specific errors
///
/// Errors that occur when talking to an S3-compatible endpoint.
/// These errors don't expose SDK types.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Object or bucket does not exist
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Request exceeded its timeout
    #[error("Request timeout during {operation} against {endpoint}")]
    Timeout { endpoint: String, operation: String },

    /// Endpoint unreachable or the request could not be dispatched
    #[error("Failed to reach {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// Bucket creation failed for a reason other than "already exists"
    #[error("Failed to create bucket {bucket}: {message}")]
    BucketCreationFailed { bucket: String, message: String },

    /// Any other service-side failure
    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// Response body could not be read
    #[error("Failed to read body of s3://{bucket}/{key}: {message}")]
    BodyReadFailed {
        bucket: String,
        key: String,
        message: String,
    },
}

impl ObjectStoreError {
    /// Whether this error means the object is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, ObjectStoreError::NotFound { .. })
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TierflowError {
    fn from(err: std::io::Error) -> Self {
        TierflowError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TierflowError {
    fn from(err: serde_json::Error) -> Self {
        TierflowError::Serialization(err.to_string())
    }
}

// Conversion from csv errors
impl From<csv::Error> for TierflowError {
    fn from(err: csv::Error) -> Self {
        TierflowError::Serialization(format!("CSV error: {err}"))
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TierflowError {
    fn from(err: toml::de::Error) -> Self {
        TierflowError::Configuration(format!("TOML parse error: {err}"))
    }
}
