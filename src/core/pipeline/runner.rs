//! Pipeline runner - drives the stage state machine
//!
//! This module coordinates one run across the storage tiers. Stages are
//! awaited strictly in sequence; each write is verified before the next
//! stage starts and every read of a predecessor artifact turns a missing
//! object into `TierflowError::MissingArtifact`.

use super::events::{EventSink, StageEvent};
use super::stage::Stage;
use super::summary::RunSummary;
use crate::adapters::object_store::{ObjectStore, CSV_CONTENT_TYPE};
use crate::adapters::Stores;
use crate::config::schema::{PipelineConfig, SourceConfig, TierflowConfig};
use crate::core::extract::{check_source, extract_from_config};
use crate::core::transform::{rename, ColumnMapping};
use crate::core::verification::{ObjectLocation, Verifier};
use crate::domain::{Batch, ProviderRecord, RecordLayout, Result, TierflowError};
use bytes::Bytes;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// Values handed from one stage to the next within a run
#[derive(Default)]
struct Carry {
    batch: Option<Batch>,
    records: Option<Vec<ProviderRecord>>,
    payload: Option<Bytes>,
    table_loaded: bool,
}

impl Carry {
    fn take_batch(&mut self, stage: Stage, what: &str) -> Result<Batch> {
        self.batch.take().ok_or_else(|| in_memory_missing(stage, what))
    }
}

fn in_memory_missing(stage: Stage, what: &str) -> TierflowError {
    TierflowError::MissingArtifact {
        stage: stage.to_string(),
        artifact: format!("{what} (produced by the previous stage of this run)"),
    }
}

/// What a stage reports on completion
#[derive(Default)]
struct StageOutput {
    rows: Option<usize>,
    detail: Option<String>,
}

impl StageOutput {
    fn rows(rows: usize) -> Self {
        Self {
            rows: Some(rows),
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Multi-tier pipeline
pub struct Pipeline {
    source: SourceConfig,
    tiers: PipelineConfig,
    cloud_bucket: String,
    stores: Stores,
    verifier: Verifier,
    sink: Arc<dyn EventSink>,
    shutdown: Option<watch::Receiver<bool>>,
    run_id: Uuid,
}

impl Pipeline {
    /// Create a pipeline over the given stores
    pub fn new(config: &TierflowConfig, stores: Stores, sink: Arc<dyn EventSink>) -> Self {
        Self {
            source: config.source.clone(),
            tiers: config.pipeline.clone(),
            cloud_bucket: config.cloud.bucket.clone(),
            stores,
            verifier: Verifier::new(config.verification.clone()),
            sink,
            shutdown: None,
            run_id: Uuid::new_v4(),
        }
    }

    /// Stop between stages once the receiver reads `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Identifier of the run this pipeline executes
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run every stage from extraction to the archive copy
    ///
    /// # Errors
    ///
    /// Returns the first stage error; earlier tiers are left as written.
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_from(Stage::Extract).await
    }

    /// Run from `start` to the end
    ///
    /// Later stages read their input from the store of the previous tier, so
    /// starting at a `*_read` stage works whenever that artifact exists. The
    /// relational store is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Configuration` when starting from extraction
    /// without a source file, `TierflowError::MissingArtifact` when the
    /// predecessor artifact of a stage does not exist,
    /// `TierflowError::Interrupted` when shutdown was requested, or the error
    /// of the failing stage.
    pub async fn run_from(&self, start: Stage) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new(self.run_id, start);

        tracing::info!(
            run_id = %self.run_id,
            start = %start,
            staging = %self.stores.staging.endpoint(),
            cloud = %self.stores.cloud.endpoint(),
            relational = %self.stores.relational.endpoint(),
            "Starting pipeline run"
        );

        let result = match self.preflight(start) {
            Ok(()) => self.drive(start, &mut summary).await,
            Err(e) => Err(e),
        };

        self.stores.relational.close().await;
        tracing::debug!(run_id = %self.run_id, "Relational store closed");

        match result {
            Ok(()) => {
                let summary = summary.with_duration(started.elapsed());
                summary.log_summary();
                Ok(summary)
            }
            Err(e) => {
                crate::log_error_with_context!(&e, "Pipeline run aborted");
                Err(e)
            }
        }
    }

    /// Startup checks that run before any stage event
    fn preflight(&self, start: Stage) -> Result<()> {
        if start == Stage::Extract {
            check_source(Path::new(&self.source.file_path))?;
        }
        Ok(())
    }

    async fn drive(&self, start: Stage, summary: &mut RunSummary) -> Result<()> {
        let mut carry = Carry::default();
        let mut stage = start;

        while !stage.is_done() {
            self.check_shutdown(stage)?;

            self.sink.emit(&StageEvent::started(self.run_id, stage));
            let stage_start = Instant::now();
            let outcome = self.execute(stage, &mut carry, summary).await;
            let duration_ms = stage_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    self.sink.emit(&StageEvent::completed(
                        self.run_id,
                        stage,
                        output.rows,
                        output.detail,
                        duration_ms,
                    ));
                    summary.stages_completed.push(stage);
                }
                Err(e) => {
                    self.sink.emit(&StageEvent::failed(
                        self.run_id,
                        stage,
                        e.to_string(),
                        duration_ms,
                    ));
                    return Err(e);
                }
            }

            stage = stage.next();
        }

        Ok(())
    }

    fn check_shutdown(&self, stage: Stage) -> Result<()> {
        if let Some(shutdown) = &self.shutdown {
            if *shutdown.borrow() {
                tracing::warn!(run_id = %self.run_id, next_stage = %stage, "Shutdown requested, halting run");
                return Err(TierflowError::Interrupted(stage.to_string()));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        stage: Stage,
        carry: &mut Carry,
        summary: &mut RunSummary,
    ) -> Result<StageOutput> {
        let staging = self.stores.staging.as_ref();
        let cloud = self.stores.cloud.as_ref();
        let relational = self.stores.relational.as_ref();
        let tiers = &self.tiers;

        match stage {
            Stage::Extract => {
                let batch = extract_from_config(&self.source).await?;
                summary.rows_extracted = batch.len();
                let output = StageOutput::rows(batch.len());
                carry.batch = Some(batch);
                Ok(output)
            }

            Stage::StageAWrite => {
                let batch = carry.take_batch(stage, "extracted batch")?;
                let payload = Bytes::from(batch.to_csv_bytes()?);
                self.write_object(staging, &tiers.raw_bucket, &tiers.raw_key, payload, true, summary)
                    .await?;
                Ok(StageOutput::rows(batch.len())
                    .with_detail(format!("{}/{}", tiers.raw_bucket, tiers.raw_key)))
            }

            Stage::StageBRead => {
                let payload = self
                    .read_object(stage, staging, &tiers.raw_bucket, &tiers.raw_key)
                    .await?;
                let batch = Batch::from_csv_bytes(&payload)?;
                let output = StageOutput::rows(batch.len());
                carry.batch = Some(batch);
                Ok(output)
            }

            Stage::Transform => {
                let batch = carry.take_batch(stage, "raw batch")?;
                let renamed = rename(batch, &ColumnMapping::provider_default())?;
                let output = StageOutput::rows(renamed.len());
                carry.batch = Some(renamed);
                Ok(output)
            }

            Stage::StageBWrite => {
                let batch = carry.take_batch(stage, "renamed batch")?;
                let payload = Bytes::from(batch.to_csv_bytes()?);
                self.write_object(
                    staging,
                    &tiers.processed_bucket,
                    &tiers.processed_key,
                    payload,
                    true,
                    summary,
                )
                .await?;
                Ok(StageOutput::rows(batch.len())
                    .with_detail(format!("{}/{}", tiers.processed_bucket, tiers.processed_key)))
            }

            Stage::StageCRead => {
                let payload = self
                    .read_object(stage, staging, &tiers.processed_bucket, &tiers.processed_key)
                    .await?;
                let records = Batch::from_csv_bytes(&payload)?.to_records(&RecordLayout::processed())?;
                let output = StageOutput::rows(records.len());
                carry.records = Some(records);
                Ok(output)
            }

            Stage::StageCUpsert => {
                let records = carry
                    .records
                    .take()
                    .ok_or_else(|| in_memory_missing(stage, "processed records"))?;

                relational.ensure_table().await?;
                let outcome = relational.replace_all(&records).await?;
                carry.table_loaded = true;
                summary.rows_attempted = outcome.attempted;
                summary.rows_inserted = outcome.inserted;

                tracing::info!(
                    table = %relational.table(),
                    attempted = outcome.attempted,
                    inserted = outcome.inserted,
                    skipped = outcome.skipped(),
                    "Loaded provider table"
                );

                let unique: HashSet<&str> = records.iter().map(|r| r.npi.as_str()).collect();
                let count = self
                    .verifier
                    .verify_row_count(relational, unique.len(), &mut summary.verification_report)
                    .await?;
                summary.table_rows = Some(count);

                summary.top_states = relational.top_states(tiers.top_states).await?;
                for state in &summary.top_states {
                    tracing::info!(
                        state = state.state.as_deref().unwrap_or("unknown"),
                        count = state.count,
                        "Providers by state"
                    );
                }

                Ok(StageOutput::rows(outcome.attempted)
                    .with_detail(format!("{} rows in {}", count, relational.table())))
            }

            Stage::StageDRead => {
                let table = relational.table().to_string();
                if !relational.table_exists().await? {
                    return Err(TierflowError::MissingArtifact {
                        stage: stage.to_string(),
                        artifact: format!("table {table}"),
                    });
                }
                // An empty table is only a valid input when this run loaded it
                if !carry.table_loaded && relational.count().await? == 0 {
                    return Err(TierflowError::MissingArtifact {
                        stage: stage.to_string(),
                        artifact: format!("rows in table {table}"),
                    });
                }
                let records = relational.fetch_all().await?;
                let batch = Batch::from_records(&records, &RecordLayout::relational());
                summary.rows_exported = batch.len();
                let output = StageOutput::rows(batch.len());
                carry.batch = Some(batch);
                Ok(output)
            }

            Stage::StageDWrite => {
                let batch = carry.take_batch(stage, "table export")?;
                let payload = Bytes::from(batch.to_csv_bytes()?);
                self.write_object(cloud, &self.cloud_bucket, &tiers.cloud_key, payload, false, summary)
                    .await?;
                Ok(StageOutput::rows(batch.len())
                    .with_detail(format!("{}/{}", self.cloud_bucket, tiers.cloud_key)))
            }

            Stage::StageERead => {
                let payload = self
                    .read_object(stage, cloud, &self.cloud_bucket, &tiers.cloud_key)
                    .await?;
                let output = StageOutput::default().with_detail(format!("{} bytes", payload.len()));
                carry.payload = Some(payload);
                Ok(output)
            }

            Stage::StageEWrite => {
                let payload = carry
                    .payload
                    .take()
                    .ok_or_else(|| in_memory_missing(stage, "cloud export"))?;
                self.write_object(
                    staging,
                    &tiers.backup_bucket,
                    &tiers.backup_key,
                    payload,
                    true,
                    summary,
                )
                .await?;

                self.verifier
                    .verify_round_trip(
                        ObjectLocation {
                            store: cloud,
                            bucket: &self.cloud_bucket,
                            key: &tiers.cloud_key,
                        },
                        ObjectLocation {
                            store: staging,
                            bucket: &tiers.backup_bucket,
                            key: &tiers.backup_key,
                        },
                        &mut summary.verification_report,
                    )
                    .await?;

                summary.staging_buckets = staging.list_buckets().await?;
                tracing::info!(
                    endpoint = %staging.endpoint(),
                    buckets = ?summary.staging_buckets,
                    "Staging buckets"
                );

                Ok(StageOutput::default()
                    .with_detail(format!("{}/{}", tiers.backup_bucket, tiers.backup_key)))
            }

            Stage::Done => Ok(StageOutput::default()),
        }
    }

    async fn read_object(
        &self,
        stage: Stage,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<Bytes> {
        store.get_object(bucket, key).await.map_err(|e| {
            if e.is_not_found() {
                TierflowError::MissingArtifact {
                    stage: stage.to_string(),
                    artifact: format!("{}/{}/{}", store.endpoint(), bucket, key),
                }
            } else {
                e.into()
            }
        })
    }

    async fn write_object(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        payload: Bytes,
        ensure_bucket: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if ensure_bucket {
            store.ensure_bucket(bucket).await?;
        }

        let size = payload.len() as u64;
        store
            .put_object(bucket, key, payload, CSV_CONTENT_TYPE)
            .await?;
        tracing::info!(
            endpoint = %store.endpoint(),
            bucket = %bucket,
            key = %key,
            size,
            "Uploaded object"
        );

        self.verifier
            .verify_object(
                ObjectLocation { store, bucket, key },
                size,
                &mut summary.verification_report,
            )
            .await?;
        summary.objects_written.push(format!("{bucket}/{key}"));

        self.log_listing(store, bucket).await;
        Ok(())
    }

    async fn log_listing(&self, store: &dyn ObjectStore, bucket: &str) {
        match store.list_objects(bucket).await {
            Ok(objects) => {
                for object in objects {
                    tracing::info!(
                        bucket = %bucket,
                        key = %object.key,
                        size = object.size,
                        "Bucket object"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, error = %e, "Failed to list bucket");
            }
        }
    }
}
