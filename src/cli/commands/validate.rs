//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Tierflow configuration file.

use crate::config::load_config;
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source File: {}", config.source.file_path);
        if !Path::new(&config.source.file_path).is_file() {
            println!("    ⚠️  File not found; `run` will fail at Extract");
        }
        println!(
            "  Filter: {} = {}",
            config.source.filter_column, config.source.filter_value
        );
        println!("  Row Limit: {}", config.source.limit);
        println!("  Staging Endpoint: {}", config.staging.endpoint);
        println!(
            "  Cloud Bucket: {} (profile {}, region {})",
            config.cloud.bucket, config.cloud.profile, config.cloud.region
        );
        println!(
            "  PostgreSQL: {}",
            config.postgresql.connection_string_safe()
        );
        println!("  Table: {}", config.pipeline.table);
        println!(
            "  Tiers: {}/{} -> {}/{} -> {} -> {}/{} -> {}/{}",
            config.pipeline.raw_bucket,
            config.pipeline.raw_key,
            config.pipeline.processed_bucket,
            config.pipeline.processed_key,
            config.pipeline.table,
            config.cloud.bucket,
            config.pipeline.cloud_key,
            config.pipeline.backup_bucket,
            config.pipeline.backup_key
        );
        println!(
            "  Round-trip checksum: {}",
            if config.verification.compare_checksums {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let code = ValidateArgs {}
            .execute("/nonexistent/tierflow.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_validate_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[source]
file_path = "/data/npidata.csv"

[staging]
endpoint = "http://localhost:9000"
access_key = "minio"
secret_key = "minio-secret"

[cloud]
profile = "default"
region = "us-east-2"
bucket = "nppes-backup"

[postgresql]
host = "localhost"
database = "nppes"
user = "postgres"
password = "postgres-pw"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
