//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs with daily, hourly or no rotation
//! - Configurable log levels
//! - Text or JSON console output
//!
//! # Example
//!
//! ```no_run
//! use tierflow::logging::init_logging;
//! use tierflow::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use tierflow::log_stage_start;
///
/// let run_id = "6f1c2a4e";
/// log_stage_start!(run_id, "StageA_write");
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($run_id:expr, $stage:expr) => {
        tracing::info!(
            run_id = %$run_id,
            stage = %$stage,
            "Stage started"
        );
    };
}

/// Log the completion of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use tierflow::log_stage_complete;
/// use std::time::Duration;
///
/// log_stage_complete!("6f1c2a4e", "StageC_upsert", 3, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($run_id:expr, $stage:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            run_id = %$run_id,
            stage = %$stage,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Stage completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use tierflow::log_error_with_context;
/// use tierflow::domain::TierflowError;
///
/// let error = TierflowError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::TierflowError;
    use std::time::Duration;

    #[test]
    fn test_macros_expand() {
        let error = TierflowError::Schema("missing column".to_string());
        log_stage_start!("run-1", "Extract");
        log_stage_complete!("run-1", "Extract", 3usize, Duration::from_millis(5));
        log_error_with_context!(&error, "stage failed");
    }
}
