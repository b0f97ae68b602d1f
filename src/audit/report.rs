//! Security audit report

use serde::{Deserialize, Serialize};

/// How serious an audit finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something expected is absent (env file, `.gitignore`)
    Missing,
    /// Something present looks unsafe
    Warning,
}

/// One audit finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditIssue {
    /// Finding severity
    pub severity: Severity,

    /// Human-readable description
    pub message: String,
}

impl AuditIssue {
    pub(crate) fn missing(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Missing,
            message: message.into(),
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Result of a security audit
///
/// Advisory only: a report with issues never blocks a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    /// Checks that passed
    pub passed: Vec<String>,

    /// Findings
    pub issues: Vec<AuditIssue>,

    /// Sensitive files that exist locally
    pub sensitive_files: Vec<String>,
}

impl AuditReport {
    /// Whether the audit found nothing
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any finding message contains `needle`
    pub fn has_issue(&self, needle: &str) -> bool {
        self.issues.iter().any(|i| i.message.contains(needle))
    }

    /// Format the report as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        out.push_str("🔒 Security Audit\n");
        out.push_str(&format!("\n✅ Passed checks: {}\n", self.passed.len()));
        for check in &self.passed {
            out.push_str(&format!("  - {check}\n"));
        }

        if !self.sensitive_files.is_empty() {
            out.push_str("\n📁 Sensitive files present (keep them out of version control):\n");
            for file in &self.sensitive_files {
                out.push_str(&format!("  - {file}\n"));
            }
        }

        if self.issues.is_empty() {
            out.push_str("\n✅ No security issues found\n");
        } else {
            out.push_str(&format!("\n⚠️  Issues found: {}\n", self.issues.len()));
            for issue in &self.issues {
                let marker = match issue.severity {
                    Severity::Missing => "❌",
                    Severity::Warning => "⚠️ ",
                };
                out.push_str(&format!("  {marker} {}\n", issue.message));
            }
        }

        out
    }
}
