//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Tierflow using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tierflow - NPPES multi-tier data pipeline
#[derive(Parser, Debug)]
#[command(name = "tierflow")]
#[command(version, about, long_about = None)]
#[command(author = "Tierflow Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tierflow.toml", env = "TIERFLOW_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TIERFLOW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline from the source file through every tier
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Check every endpoint and show what each tier holds
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Audit a project directory for credential hygiene
    Audit(commands::audit::AuditArgs),

    /// Invoke a request handler locally
    Invoke(commands::invoke::InvokeArgs),
}
