//! Run summary and reporting
//!
//! This module defines the structure the runner fills while stages complete
//! and the CLI prints at the end of a run.

use super::stage::Stage;
use crate::core::verification::report::VerificationReport;
use crate::domain::StateCount;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// Summary of a pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Run identifier carried by every event
    pub run_id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// First stage executed
    pub started_from: Stage,

    /// Stages that completed, in order
    pub stages_completed: Vec<Stage>,

    /// Rows matched in the source file
    pub rows_extracted: usize,

    /// Rows sent to the relational tier
    pub rows_attempted: usize,

    /// Rows actually inserted by the relational tier
    pub rows_inserted: u64,

    /// Row count of the table after the load
    pub table_rows: Option<i64>,

    /// Rows in the relational export
    pub rows_exported: usize,

    /// `bucket/key` of every object written
    pub objects_written: Vec<String>,

    /// Largest per-state provider counts after the load
    pub top_states: Vec<StateCount>,

    /// Buckets visible on the staging store after the archive copy
    pub staging_buckets: Vec<String>,

    /// Post-hop checks
    pub verification_report: VerificationReport,

    /// Duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Create an empty summary for a run
    pub fn new(run_id: Uuid, started_from: Stage) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            started_from,
            stages_completed: Vec::new(),
            rows_extracted: 0,
            rows_attempted: 0,
            rows_inserted: 0,
            table_rows: None,
            rows_exported: 0,
            objects_written: Vec::new(),
            top_states: Vec::new(),
            staging_buckets: Vec::new(),
            verification_report: VerificationReport::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the run reached the terminal stage
    pub fn is_complete(&self) -> bool {
        self.stages_completed.last() == Some(&Stage::StageEWrite)
    }

    /// Rows skipped by the relational tier as already present
    pub fn rows_skipped(&self) -> u64 {
        (self.rows_attempted as u64).saturating_sub(self.rows_inserted)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            started_from = %self.started_from,
            stages_completed = self.stages_completed.len(),
            rows_extracted = self.rows_extracted,
            rows_attempted = self.rows_attempted,
            rows_inserted = self.rows_inserted,
            table_rows = ?self.table_rows,
            rows_exported = self.rows_exported,
            objects_written = self.objects_written.len(),
            duration_secs = self.duration.as_secs(),
            "Pipeline run completed"
        );

        for state in &self.top_states {
            tracing::info!(
                state = state.state.as_deref().unwrap_or("unknown"),
                count = state.count,
                "Providers by state"
            );
        }

        if !self.verification_report.is_success() {
            tracing::warn!(
                failed = self.verification_report.failed,
                "Run completed with verification failures"
            );
        }
    }

    /// Format the summary as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run ID: {}\n", self.run_id));
        out.push_str(&format!("Started from: {}\n", self.started_from));
        out.push_str(&format!(
            "Stages completed: {}\n",
            self.stages_completed.len()
        ));
        out.push_str(&format!("Rows extracted: {}\n", self.rows_extracted));
        out.push_str(&format!(
            "Rows loaded: {} attempted, {} inserted, {} skipped\n",
            self.rows_attempted,
            self.rows_inserted,
            self.rows_skipped()
        ));
        if let Some(rows) = self.table_rows {
            out.push_str(&format!("Table rows: {rows}\n"));
        }
        out.push_str(&format!("Rows exported: {}\n", self.rows_exported));
        out.push_str(&format!("Duration: {:.2}s\n", self.duration.as_secs_f64()));

        if !self.objects_written.is_empty() {
            out.push_str("\nObjects written:\n");
            for object in &self.objects_written {
                out.push_str(&format!("  - {object}\n"));
            }
        }

        if !self.top_states.is_empty() {
            out.push_str("\nTop states:\n");
            for state in &self.top_states {
                out.push_str(&format!(
                    "  {}: {}\n",
                    state.state.as_deref().unwrap_or("(none)"),
                    state.count
                ));
            }
        }

        if !self.staging_buckets.is_empty() {
            out.push_str(&format!(
                "\nStaging buckets: {}\n",
                self.staging_buckets.join(", ")
            ));
        }

        out
    }
}
