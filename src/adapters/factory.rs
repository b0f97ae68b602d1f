//! Store client factory
//!
//! This module builds the three store clients a run needs from the
//! configuration, either live or in memory for dry runs.

use crate::adapters::database::{MemoryProviderStore, ProviderStore};
use crate::adapters::object_store::{MemoryObjectStore, ObjectStore, S3ObjectStore};
use crate::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
use crate::config::schema::TierflowConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Store clients for one pipeline run
#[derive(Clone)]
pub struct Stores {
    /// S3-compatible staging endpoint (tiers A, B and E)
    pub staging: Arc<dyn ObjectStore>,

    /// Cloud object store (tier D)
    pub cloud: Arc<dyn ObjectStore>,

    /// Relational tier (tier C)
    pub relational: Arc<dyn ProviderStore>,
}

/// Create the live store clients
///
/// # Arguments
///
/// * `config` - The Tierflow configuration
///
/// # Errors
///
/// Returns an error if the PostgreSQL pool cannot be created
pub async fn create_stores(config: &TierflowConfig) -> Result<Stores> {
    tracing::info!("Creating staging object store client");
    let staging = S3ObjectStore::staging(&config.staging);

    tracing::info!("Creating cloud object store client");
    let cloud = S3ObjectStore::cloud(&config.cloud).await;

    let relational = create_provider_store(config).await?;

    Ok(Stores {
        staging: Arc::new(staging),
        cloud: Arc::new(cloud),
        relational,
    })
}

/// Create the PostgreSQL-backed provider store
///
/// # Errors
///
/// Returns an error if the client cannot be created
pub async fn create_provider_store(config: &TierflowConfig) -> Result<Arc<dyn ProviderStore>> {
    tracing::info!(
        target_db = %config.postgresql.connection_string_safe(),
        "Creating PostgreSQL client"
    );
    let client = PostgreSQLClient::new(config.postgresql.clone()).await?;
    let adapter = PostgreSQLAdapter::new(client, config.pipeline.table.clone());
    Ok(Arc::new(adapter))
}

/// Create in-memory stores for a dry run
///
/// The cloud bucket is pre-created because the live cloud bucket is
/// provisioned outside the pipeline.
pub fn create_in_memory_stores(config: &TierflowConfig) -> Stores {
    tracing::info!("DRY RUN: using in-memory stores");
    Stores {
        staging: Arc::new(MemoryObjectStore::new("memory://staging")),
        cloud: Arc::new(MemoryObjectStore::with_buckets(
            "memory://cloud",
            &[config.cloud.bucket.as_str()],
        )),
        relational: Arc::new(MemoryProviderStore::new(config.pipeline.table.clone())),
    }
}
