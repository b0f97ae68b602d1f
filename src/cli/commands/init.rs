//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "tierflow.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Tierflow configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set SOURCE_FILE_PATH to the NPPES dissemination CSV");
                println!("     - Set MINIO_ENDPOINT, MINIO_ACCESS_KEY and MINIO_SECRET_KEY");
                println!("     - Set AWS_PROFILE, AWS_REGION and AWS_BUCKET");
                println!("     - Set POSTGRES_HOST, POSTGRES_DB, POSTGRES_USER and POSTGRES_PASSWORD");
                println!("  3. Validate configuration: tierflow validate-config");
                println!("  4. Check connectivity: tierflow status");
                println!("  5. Run the pipeline: tierflow run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Tierflow Configuration File
# NPPES cardiology providers across staging, relational and cloud tiers

[application]
log_level = "info"
dry_run = false

[source]
file_path = "${SOURCE_FILE_PATH}"
filter_column = "Healthcare Provider Taxonomy Code_1"
filter_value = "207RC0000X"
limit = 1000

[staging]
endpoint = "${MINIO_ENDPOINT}"
access_key = "${MINIO_ACCESS_KEY}"
secret_key = "${MINIO_SECRET_KEY}"

[cloud]
profile = "${AWS_PROFILE}"
region = "${AWS_REGION}"
bucket = "${AWS_BUCKET}"

[postgresql]
host = "${POSTGRES_HOST}"
database = "${POSTGRES_DB}"
user = "${POSTGRES_USER}"
password = "${POSTGRES_PASSWORD}"

[verification]
compare_checksums = true

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Tierflow Configuration File
#
# Tierflow moves a filtered extract of the NPPES provider file through five
# storage tiers:
#
#   A  staging raw-data        (CSV as extracted)
#   B  staging processed-data  (columns renamed)
#   C  PostgreSQL table        (upserted by NPI)
#   D  cloud bucket            (table export)
#   E  staging aws-backup      (copy of D)
#
# Values written as ${NAME} are read from the environment (or a .env file).
# Any option can also be overridden with TIERFLOW_<SECTION>_<KEY>.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (run every stage against in-memory stores)
dry_run = false

# ============================================================================
# Source File
# ============================================================================
[source]
# NPPES dissemination CSV (several GB, streamed)
file_path = "${SOURCE_FILE_PATH}"

# Rows are kept when this column equals filter_value
filter_column = "Healthcare Provider Taxonomy Code_1"

# 207RC0000X = Cardiovascular Disease
filter_value = "207RC0000X"

# Maximum number of matching rows extracted
limit = 1000

# ============================================================================
# Staging Object Store (S3-compatible, e.g. MinIO)
# ============================================================================
[staging]
endpoint = "${MINIO_ENDPOINT}"
access_key = "${MINIO_ACCESS_KEY}"
secret_key = "${MINIO_SECRET_KEY}"

# Region reported to the S3 API
region = "us-east-1"

# Per-request timeout in seconds
timeout_seconds = 30

# ============================================================================
# Cloud Object Store
# ============================================================================
[cloud]
# Named credentials profile (no keys in this file)
profile = "${AWS_PROFILE}"
region = "${AWS_REGION}"

# The bucket must already exist; the pipeline does not create it
bucket = "${AWS_BUCKET}"

# Optional endpoint override
# endpoint = "http://localhost:4566"

timeout_seconds = 30

# ============================================================================
# PostgreSQL
# ============================================================================
[postgresql]
host = "${POSTGRES_HOST}"
port = 5432
database = "${POSTGRES_DB}"
user = "${POSTGRES_USER}"
password = "${POSTGRES_PASSWORD}"

# Connection pool settings
max_connections = 4
connection_timeout_seconds = 30
statement_timeout_seconds = 60

# SSL/TLS mode: disable | prefer | require
ssl_mode = "disable"

# ============================================================================
# Tier Names
# ============================================================================
[pipeline]
raw_bucket = "raw-data"
raw_key = "cardiology_sample.csv"
processed_bucket = "processed-data"
processed_key = "cardiology_processed.csv"
table = "cardiology_providers"
cloud_key = "postgres-backup/cardiology_providers.csv"
backup_bucket = "aws-backup"
backup_key = "from-aws/cardiology_providers.csv"

# Number of states listed after the relational load
top_states = 5

# ============================================================================
# Verification
# ============================================================================
[verification]
# Objects and row counts are always checked after each write.
# Compare SHA-256 checksums of the cloud object and its staging copy
compare_checksums = true

# ============================================================================
# Logging
# ============================================================================
[logging]
# Enable local file logging
local_enabled = true

# Directory for log files
local_path = "./logs"

# Log rotation (daily, hourly or never)
local_rotation = "daily"

# Emit JSON on the console instead of text
console_json = false
"#
        .to_string()
    }
}
