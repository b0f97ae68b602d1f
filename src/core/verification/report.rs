//! Verification report structures
//!
//! This module defines the structures for reporting the post-hop checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of post-hop check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Object exists with the expected size
    Object,
    /// Relational row count covers the batch
    RowCount,
    /// Round-trip copy matches its source byte for byte
    RoundTrip,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::RowCount => write!(f, "row_count"),
            Self::RoundTrip => write!(f, "round_trip"),
        }
    }
}

/// Verification report containing results of the post-hop checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// When the report was started
    pub verified_at: DateTime<Utc>,

    /// Total number of checks
    pub total_verified: usize,

    /// Number of checks that passed
    pub passed: usize,

    /// Number of checks that failed
    pub failed: usize,

    /// Number of checksum comparisons skipped by configuration
    pub skipped: usize,

    /// List of failed checks with details
    pub failures: Vec<VerificationFailure>,

    /// Time spent in checks in milliseconds
    pub duration_ms: u64,
}

/// Details of a failed check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    /// Which check failed
    pub check: CheckKind,

    /// Object or table the check ran against
    pub target: String,

    /// Expected value
    pub expected: String,

    /// Observed value
    pub actual: String,

    /// Reason for failure
    pub reason: String,
}

impl VerificationReport {
    /// Create a new verification report
    pub fn new() -> Self {
        Self {
            verified_at: Utc::now(),
            total_verified: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Record a successful check
    pub fn record_pass(&mut self) {
        self.total_verified += 1;
        self.passed += 1;
    }

    /// Record a failed check
    pub fn record_failure(&mut self, failure: VerificationFailure) {
        self.total_verified += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Record a skipped check
    pub fn record_skip(&mut self) {
        self.total_verified += 1;
        self.skipped += 1;
    }

    /// Add time spent in a check
    pub fn add_duration(&mut self, duration_ms: u64) {
        self.duration_ms += duration_ms;
    }

    /// Check if all verifications passed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_verified == 0 {
            return 100.0;
        }
        (self.passed as f64 / self.total_verified as f64) * 100.0
    }

    /// Format the report as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("📊 Verification Report\n");
        summary.push_str(&format!("  Verified at: {}\n", self.verified_at));
        summary.push_str(&format!("  Duration: {} ms\n", self.duration_ms));
        summary.push_str(&format!("  Total verified: {}\n", self.total_verified));
        summary.push_str(&format!("  ✅ Passed: {}\n", self.passed));
        summary.push_str(&format!("  ❌ Failed: {}\n", self.failed));
        summary.push_str(&format!("  ⏭️  Skipped: {}\n", self.skipped));
        summary.push_str(&format!("  Success rate: {:.2}%\n", self.success_rate()));

        if !self.failures.is_empty() {
            summary.push_str("\n❌ Failures:\n");
            for (i, failure) in self.failures.iter().enumerate() {
                summary.push_str(&format!(
                    "  {}. {} check on {}\n",
                    i + 1,
                    failure.check,
                    failure.target
                ));
                summary.push_str(&format!("     Expected: {}\n", failure.expected));
                summary.push_str(&format!("     Actual: {}\n", failure.actual));
                summary.push_str(&format!("     Reason: {}\n", failure.reason));
            }
        }

        summary
    }
}

impl Default for VerificationReport {
    fn default() -> Self {
        Self::new()
    }
}
