//! Status command implementation
//!
//! This module implements the `status` command, which checks every
//! endpoint the pipeline touches and reports what each tier currently holds.

use crate::adapters::object_store::ObjectStore;
use crate::adapters::{create_in_memory_stores, create_stores, Stores};
use crate::config::load_config;
use crate::config::schema::TierflowConfig;
use clap::Args;
use std::path::Path;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Check the in-memory stores instead of the live services
    #[arg(long)]
    pub dry_run: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking tier status");

        println!("📊 Tierflow Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2);
            }
        };

        print_source(&config);

        let stores = if self.dry_run || config.application.dry_run {
            create_in_memory_stores(&config)
        } else {
            match create_stores(&config).await {
                Ok(s) => s,
                Err(e) => {
                    println!("❌ Failed to create store clients");
                    println!("   Error: {}", e);
                    return Ok(e.exit_code());
                }
            }
        };

        let code = check_stores(&config, &stores).await;
        stores.relational.close().await;
        Ok(code)
    }
}

fn print_source(config: &TierflowConfig) {
    let path = Path::new(&config.source.file_path);
    match path.metadata() {
        Ok(meta) => println!(
            "✅ Source file: {} ({:.2} GB)",
            path.display(),
            meta.len() as f64 / 1024f64.powi(3)
        ),
        Err(_) => println!("⚠️  Source file not found: {}", path.display()),
    }
    println!();
}

async fn check_stores(config: &TierflowConfig, stores: &Stores) -> i32 {
    let tiers = &config.pipeline;
    let mut code = 0;

    println!("Staging ({}):", stores.staging.endpoint());
    match stores.staging.list_buckets().await {
        Ok(buckets) => {
            println!("  ✅ Connected, buckets: {}", display_list(&buckets));
            print_object(stores.staging.as_ref(), "A", &tiers.raw_bucket, &tiers.raw_key).await;
            print_object(
                stores.staging.as_ref(),
                "B",
                &tiers.processed_bucket,
                &tiers.processed_key,
            )
            .await;
            print_object(
                stores.staging.as_ref(),
                "E",
                &tiers.backup_bucket,
                &tiers.backup_key,
            )
            .await;
        }
        Err(e) => {
            println!("  ❌ {}", e);
            code = 4;
        }
    }
    println!();

    println!("Cloud ({}):", stores.cloud.endpoint());
    match stores.cloud.list_objects(&config.cloud.bucket).await {
        Ok(objects) => {
            println!(
                "  ✅ Connected, {} object(s) in {}",
                objects.len(),
                config.cloud.bucket
            );
            print_object(
                stores.cloud.as_ref(),
                "D",
                &config.cloud.bucket,
                &tiers.cloud_key,
            )
            .await;
        }
        Err(e) => {
            println!("  ❌ {}", e);
            code = 4;
        }
    }
    println!();

    let relational = &stores.relational;
    println!("PostgreSQL ({}):", relational.endpoint());
    match relational.test_connection().await {
        Ok(version) => {
            println!("  ✅ Connected: {}", version);
            match relational.table_exists().await {
                Ok(true) => {
                    match relational.count().await {
                        Ok(rows) => println!("  C  {}: {} row(s)", relational.table(), rows),
                        Err(e) => println!("  ⚠️  Count failed: {}", e),
                    }
                    if let Ok(states) = relational.top_states(tiers.top_states).await {
                        for entry in states {
                            println!(
                                "       {}: {}",
                                entry.state.as_deref().unwrap_or("(none)"),
                                entry.count
                            );
                        }
                    }
                }
                Ok(false) => println!("  C  {}: not created yet", relational.table()),
                Err(e) => println!("  ⚠️  Table check failed: {}", e),
            }
        }
        Err(e) => {
            println!("  ❌ {}", e);
            code = 4;
        }
    }
    println!();

    if code == 0 {
        println!("✅ All endpoints reachable");
    } else {
        println!("❌ One or more endpoints are unreachable");
    }
    code
}

async fn print_object(store: &dyn ObjectStore, tier: &str, bucket: &str, key: &str) {
    match store.head_object(bucket, key).await {
        Ok(meta) => println!("  {tier}  {bucket}/{key}: {} bytes", meta.size),
        Err(e) if e.is_not_found() => println!("  {tier}  {bucket}/{key}: not written yet"),
        Err(e) => println!("  {tier}  {bucket}/{key}: ⚠️  {e}"),
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
