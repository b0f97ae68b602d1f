//! Run command implementation
//!
//! This module implements the `run` command, which drives the pipeline
//! from the source file (or a later stage) through every storage tier.

use crate::adapters::{create_in_memory_stores, create_stores};
use crate::config::load_config;
use crate::core::pipeline::{Pipeline, Stage, TracingSink};
use crate::domain::TierflowError;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dry run mode - run every stage against in-memory stores
    #[arg(long)]
    pub dry_run: bool,

    /// Start at a later stage (extract, stage-b, transform, stage-c, stage-d, stage-e)
    #[arg(long, value_name = "STAGE")]
    pub from: Option<String>,

    /// Override the number of source rows extracted
    #[arg(long)]
    pub limit: Option<usize>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("❌ Configuration error: {e}");
                return Ok(e.exit_code());
            }
        };

        if let Some(limit) = self.limit {
            tracing::info!(limit, "Overriding extraction limit from CLI");
            config.source.limit = limit;
        }

        let start = match self.from.as_deref() {
            Some(stage) => match stage.parse::<Stage>() {
                Ok(stage) => stage,
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(e.exit_code());
                }
            },
            None => Stage::Extract,
        };

        let dry_run = self.dry_run || config.application.dry_run;
        let stores = if dry_run {
            println!("🔍 DRY RUN MODE - stores are in memory, nothing is written to live services");
            println!();
            create_in_memory_stores(&config)
        } else {
            match create_stores(&config).await {
                Ok(stores) => stores,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create store clients");
                    eprintln!("❌ Failed to initialize stores: {e}");
                    return Ok(e.exit_code());
                }
            }
        };

        if let Err(e) = stores.relational.test_connection().await {
            stores.relational.close().await;
            eprintln!("❌ Relational store unreachable: {e}");
            return Ok(e.exit_code());
        }

        let pipeline = Pipeline::new(&config, stores, Arc::new(TracingSink))
            .with_shutdown(shutdown_signal);

        println!("🚀 Starting pipeline run {} from {}", pipeline.run_id(), start);
        println!();

        let summary = match pipeline.run_from(start).await {
            Ok(summary) => summary,
            Err(TierflowError::Interrupted(stage)) => {
                println!();
                println!("⚠️  Run interrupted before {stage}. Tiers already written are kept.");
                println!("   Re-run with --from {stage} to continue.");
                return Ok(130);
            }
            Err(e) => {
                eprintln!("❌ Pipeline failed: {e}");
                if e.is_transient() {
                    eprintln!("   The failure is transient; re-running may succeed.");
                }
                return Ok(e.exit_code());
            }
        };

        println!("📊 Run Summary:");
        for line in summary.format_summary().lines() {
            println!("  {line}");
        }
        println!();
        print!("{}", summary.verification_report.format_summary());
        println!();
        println!("✅ Pipeline completed successfully!");

        Ok(0)
    }
}
