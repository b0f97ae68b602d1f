//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TierflowConfig;
use super::secret::secret_string;
use crate::domain::errors::TierflowError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TierflowConfig
/// 4. Applies environment variable overrides (TIERFLOW_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns `TierflowError::Configuration` if the file cannot be read, a
/// referenced variable is unset, parsing fails or validation fails. All of
/// these happen before any stage runs.
///
/// # Examples
///
/// ```no_run
/// use tierflow::config::loader::load_config;
///
/// let config = load_config("tierflow.toml").expect("Failed to load config");
/// println!("{}", config.pipeline.table);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TierflowConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TierflowError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TierflowError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn parse_config(contents: &str) -> Result<TierflowConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: TierflowConfig = toml::from_str(&contents)
        .map_err(|e| TierflowError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        TierflowError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so a commented-out option does not
/// require its variable.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TierflowError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TierflowError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the TIERFLOW_* prefix
///
/// Variables follow the pattern `TIERFLOW_<SECTION>_<KEY>`, for example
/// `TIERFLOW_SOURCE_LIMIT` or `TIERFLOW_POSTGRESQL_HOST`. Unparseable
/// numeric values are ignored and the file value is kept.
fn apply_env_overrides(config: &mut TierflowConfig) {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("TIERFLOW_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = var("TIERFLOW_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Source overrides
    if let Some(val) = var("TIERFLOW_SOURCE_FILE_PATH") {
        config.source.file_path = val;
    }
    if let Some(limit) = var("TIERFLOW_SOURCE_LIMIT").and_then(|v| v.parse().ok()) {
        config.source.limit = limit;
    }
    if let Some(val) = var("TIERFLOW_SOURCE_FILTER_VALUE") {
        config.source.filter_value = val;
    }

    // Staging store overrides
    if let Some(val) = var("TIERFLOW_STAGING_ENDPOINT") {
        config.staging.endpoint = val;
    }
    if let Some(val) = var("TIERFLOW_STAGING_ACCESS_KEY") {
        config.staging.access_key = secret_string(val);
    }
    if let Some(val) = var("TIERFLOW_STAGING_SECRET_KEY") {
        config.staging.secret_key = secret_string(val);
    }

    // Cloud store overrides
    if let Some(val) = var("TIERFLOW_CLOUD_PROFILE") {
        config.cloud.profile = val;
    }
    if let Some(val) = var("TIERFLOW_CLOUD_REGION") {
        config.cloud.region = val;
    }
    if let Some(val) = var("TIERFLOW_CLOUD_BUCKET") {
        config.cloud.bucket = val;
    }
    if let Some(val) = var("TIERFLOW_CLOUD_ENDPOINT") {
        config.cloud.endpoint = Some(val);
    }

    // PostgreSQL overrides
    if let Some(val) = var("TIERFLOW_POSTGRESQL_HOST") {
        config.postgresql.host = val;
    }
    if let Some(port) = var("TIERFLOW_POSTGRESQL_PORT").and_then(|v| v.parse().ok()) {
        config.postgresql.port = port;
    }
    if let Some(val) = var("TIERFLOW_POSTGRESQL_DATABASE") {
        config.postgresql.database = val;
    }
    if let Some(val) = var("TIERFLOW_POSTGRESQL_USER") {
        config.postgresql.user = val;
    }
    if let Some(val) = var("TIERFLOW_POSTGRESQL_PASSWORD") {
        config.postgresql.password = secret_string(val);
    }
    if let Some(val) = var("TIERFLOW_POSTGRESQL_SSL_MODE") {
        config.postgresql.ssl_mode = val;
    }

    // Verification overrides
    if let Some(val) = var("TIERFLOW_VERIFICATION_COMPARE_CHECKSUMS") {
        config.verification.compare_checksums = val.parse().unwrap_or(true);
    }

    // Logging overrides
    if let Some(val) = var("TIERFLOW_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Some(val) = var("TIERFLOW_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_TOML: &str = r#"
[application]
log_level = "info"

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
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("TIERFLOW_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${TIERFLOW_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("TIERFLOW_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("TIERFLOW_LOADER_MISSING_VAR");
        let input = "password = \"${TIERFLOW_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("TIERFLOW_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        std::env::remove_var("TIERFLOW_LOADER_COMMENTED_VAR");
        let input = "# endpoint = \"${TIERFLOW_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(TierflowError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_TOML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source.file_path, "/data/npidata.csv");
        assert_eq!(config.source.filter_value, "207RC0000X");
        assert_eq!(config.postgresql.port, 5432);
        assert_eq!(config.pipeline.raw_bucket, "raw-data");
        assert_eq!(config.cloud.bucket, "nppes-backup");
    }

    #[test]
    fn test_parse_config_missing_section() {
        let toml = VALID_TOML.replace("[cloud]", "[cloud_unused]");
        let err = parse_config(&toml).unwrap_err();
        assert!(matches!(err, TierflowError::Configuration(_)));
    }
}
