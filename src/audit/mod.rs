//! Security audit of a deployment directory
//!
//! The audit inspects explicit paths (env file, `.gitignore`, source
//! directory) and reports what passed and what looks unsafe. It is advisory:
//! nothing here can fail a pipeline run.
//!
//! # Example
//!
//! ```no_run
//! use tierflow::audit::{AuditPaths, SecurityAudit};
//!
//! let report = SecurityAudit::new(AuditPaths::under(".")).run();
//! println!("{}", report.format_summary());
//! ```

pub mod report;

pub use report::{AuditIssue, AuditReport, Severity};

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries `.gitignore` must cover
pub const REQUIRED_GITIGNORE: [&str; 4] = [".env", "target", "*.log", "*.csv"];

/// Assignments that indicate an inline credential, matched case-insensitively
pub const CREDENTIAL_PATTERNS: [&str; 4] = [
    "password=",
    "secret_key=",
    "aws_access_key_id=\"",
    "aws_secret_access_key=\"",
];

/// Value following a credential assignment, captured as group 1
const VALUE_PATTERN: &str = r#"["']?([^\s"',;)]*)"#;

/// Reads showing a value comes from the environment
const ENV_READ_PATTERN: &str = r"(?i)env::var|std::env|getenv|\$\{";

/// Characters after a credential pattern searched for an environment marker
const ENV_WINDOW: usize = 100;

/// Default credential shipped with local S3-compatible servers
const DEFAULT_CREDENTIAL: &str = "minioadmin";

/// Paths the audit inspects
#[derive(Debug, Clone)]
pub struct AuditPaths {
    /// Environment file
    pub env_file: PathBuf,
    /// Ignore file
    pub gitignore: PathBuf,
    /// Directory scanned recursively for `.rs` files
    pub source_dir: PathBuf,
    /// Files that must stay out of version control
    pub sensitive_files: Vec<PathBuf>,
}

impl AuditPaths {
    /// Conventional layout under a project root
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            env_file: root.join(".env"),
            gitignore: root.join(".gitignore"),
            source_dir: root.join("src"),
            sensitive_files: vec![root.join(".env")],
        }
    }

    /// Add a sensitive file, such as the source extract
    pub fn with_sensitive_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sensitive_files.push(path.into());
        self
    }
}

/// Security audit over a set of paths
pub struct SecurityAudit {
    paths: AuditPaths,
}

impl SecurityAudit {
    /// Create an audit
    pub fn new(paths: AuditPaths) -> Self {
        Self { paths }
    }

    /// Run every check
    pub fn run(&self) -> AuditReport {
        let mut report = AuditReport::default();

        let env_vars = self.check_env_file(&mut report);
        self.check_gitignore(&mut report);
        self.check_source(&mut report);
        check_profile(env_vars.as_ref(), &mut report);
        self.check_sensitive_files(&mut report);

        tracing::info!(
            passed = report.passed.len(),
            issues = report.issues.len(),
            "Security audit completed"
        );
        report
    }

    fn check_env_file(&self, report: &mut AuditReport) -> Option<HashMap<String, String>> {
        let path = &self.paths.env_file;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                report.issues.push(AuditIssue::missing(format!(
                    "Environment file not found: {}",
                    path.display()
                )));
                return None;
            }
        };
        report.passed.push("Environment file present".to_string());

        if !content.contains(DEFAULT_CREDENTIAL) || content.contains("MINIO_ACCESS_KEY") {
            report
                .passed
                .push("No inline default credentials in environment file".to_string());
        } else {
            report.issues.push(AuditIssue::warning(format!(
                "Environment file {} contains default credentials",
                path.display()
            )));
        }

        let (vars, malformed) = parse_env(&content);
        if malformed > 0 {
            report.issues.push(AuditIssue::warning(format!(
                "Environment file {} has {} unparseable line(s)",
                path.display(),
                malformed
            )));
        }
        Some(vars)
    }

    fn check_gitignore(&self, report: &mut AuditReport) {
        let path = &self.paths.gitignore;
        let Ok(content) = fs::read_to_string(path) else {
            report.issues.push(AuditIssue::missing(format!(
                ".gitignore not found: {}",
                path.display()
            )));
            return;
        };

        let entries: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| l.trim_start_matches('/').trim_end_matches('/'))
            .collect();

        let missing: Vec<&str> = REQUIRED_GITIGNORE
            .into_iter()
            .filter(|required| !entries.contains(required))
            .collect();

        if missing.is_empty() {
            report.passed.push(".gitignore covers sensitive files".to_string());
        } else {
            for entry in missing {
                report
                    .issues
                    .push(AuditIssue::warning(format!(".gitignore missing: {entry}")));
            }
        }
    }

    fn check_source(&self, report: &mut AuditReport) {
        let mut files = Vec::new();
        collect_rust_files(&self.paths.source_dir, &mut files);
        if files.is_empty() {
            tracing::debug!(dir = %self.paths.source_dir.display(), "No source files to scan");
            return;
        }

        let scanner = match CredentialScanner::new() {
            Ok(scanner) => scanner,
            Err(e) => {
                tracing::warn!(error = %e, "Credential patterns failed to compile");
                report.issues.push(AuditIssue::warning(format!(
                    "Source scan skipped: {e}"
                )));
                return;
            }
        };

        let mut violations = Vec::new();
        for file in &files {
            let Ok(content) = fs::read_to_string(file) else {
                continue;
            };
            for pattern in scanner.find(&content) {
                violations.push(format!("{}: {}", file.display(), pattern));
            }
        }

        if violations.is_empty() {
            report
                .passed
                .push("Source code reads credentials from the environment".to_string());
        } else {
            for violation in violations {
                report.issues.push(AuditIssue::warning(format!(
                    "Possible hardcoded credential: {violation}"
                )));
            }
        }
    }

    fn check_sensitive_files(&self, report: &mut AuditReport) {
        for file in &self.paths.sensitive_files {
            if file.exists() {
                report.sensitive_files.push(file.display().to_string());
            }
        }
        if !report.sensitive_files.is_empty() {
            report
                .passed
                .push("Sensitive files present locally (keep them ignored)".to_string());
        }
    }
}

fn check_profile(env_vars: Option<&HashMap<String, String>>, report: &mut AuditReport) {
    match env_vars.and_then(|vars| vars.get("AWS_PROFILE")) {
        Some(profile) => report
            .passed
            .push(format!("Cloud credentials use profile '{profile}'")),
        None => report
            .issues
            .push(AuditIssue::warning("AWS_PROFILE not set in environment file")),
    }
}

/// Variables of an env file and the number of lines that failed to parse
///
/// Quoting, comments and `export` prefixes follow dotenv rules.
fn parse_env(content: &str) -> (HashMap<String, String>, usize) {
    let mut vars = HashMap::new();
    let mut malformed = 0;
    for item in dotenvy::from_read_iter(content.as_bytes()) {
        match item {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Skipping env file line");
                malformed += 1;
            }
        }
    }
    (vars, malformed)
}

/// Compiled credential patterns
pub struct CredentialScanner {
    patterns: Vec<(&'static str, Regex)>,
    env_read: Regex,
}

impl CredentialScanner {
    /// Compile [`CREDENTIAL_PATTERNS`]
    ///
    /// # Errors
    ///
    /// Returns the regex error of the first pattern that fails to compile
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = CREDENTIAL_PATTERNS
            .into_iter()
            .map(|label| {
                Regex::new(&format!("(?i){}{}", regex::escape(label), VALUE_PATTERN))
                    .map(|re| (label, re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            env_read: Regex::new(ENV_READ_PATTERN)?,
        })
    }

    /// Labels of the patterns assigned a literal value in `content`
    ///
    /// A match is ignored when its value is empty or a `$` placeholder, or
    /// when an environment read follows within a short window.
    pub fn find(&self, content: &str) -> Vec<&'static str> {
        self.patterns
            .iter()
            .filter(|(_, re)| {
                re.captures_iter(content).any(|caps| {
                    let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                        return false;
                    };
                    let value = value.as_str();
                    if value.is_empty() || value.starts_with('$') {
                        return false;
                    }
                    !self.env_read.is_match(window(content, whole.start()))
                })
            })
            .map(|(label, _)| *label)
            .collect()
    }
}

/// Up to `ENV_WINDOW` bytes of `content` from `start`, on a char boundary
fn window(content: &str, start: usize) -> &str {
    let mut end = (start + ENV_WINDOW).min(content.len());
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[start..end]
}

fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files.sort();
}
