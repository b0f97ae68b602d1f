//! End-to-end pipeline tests against in-memory stores

use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tierflow::adapters::database::{MemoryProviderStore, ProviderStore};
use tierflow::adapters::object_store::{MemoryObjectStore, ObjectStore};
use tierflow::adapters::Stores;
use tierflow::config::{parse_config, TierflowConfig};
use tierflow::core::pipeline::{CollectingSink, Pipeline, Stage, StageStatus};
use tierflow::domain::{Batch, ProviderRecord, RecordLayout, TierflowError};

const NPPES_HEADER: &str = "NPI,Entity Type Code,Provider Business Practice Location Address City Name,Provider Business Practice Location Address State Name,Healthcare Provider Taxonomy Code_1";

const SOURCE_ROWS: [&str; 5] = [
    "1467503512,1,NASHVILLE,TN,207RC0000X",
    "1356412345,1,AUSTIN,TX,208D00000X",
    "1730142874,1,LOS ANGELES,CA,207RC0000X",
    "1205893412,1,DALLAS,TX,207Q00000X",
    "1982736450,1,MEMPHIS,TN,207RC0000X",
];

struct Harness {
    _source: NamedTempFile,
    config: TierflowConfig,
    staging: Arc<MemoryObjectStore>,
    cloud: Arc<MemoryObjectStore>,
    relational: Arc<MemoryProviderStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with_rows(&SOURCE_ROWS)
    }

    fn with_rows(rows: &[&str]) -> Self {
        let mut source = NamedTempFile::new().unwrap();
        writeln!(source, "{NPPES_HEADER}").unwrap();
        for row in rows {
            writeln!(source, "{row}").unwrap();
        }
        source.flush().unwrap();

        let config = parse_config(&format!(
            r#"
[source]
file_path = "{}"
limit = 10

[staging]
endpoint = "http://localhost:9000"
access_key = "staging-user"
secret_key = "staging-secret"

[cloud]
profile = "default"
region = "us-east-2"
bucket = "nppes-backup"

[postgresql]
host = "localhost"
database = "nppes"
user = "postgres"
password = "pg-secret"
"#,
            source.path().display()
        ))
        .unwrap();

        let cloud = MemoryObjectStore::with_buckets("memory://cloud", &["nppes-backup"]);
        Self {
            _source: source,
            staging: Arc::new(MemoryObjectStore::new("memory://staging")),
            cloud: Arc::new(cloud),
            relational: Arc::new(MemoryProviderStore::new(config.pipeline.table.clone())),
            config,
        }
    }

    fn stores(&self) -> Stores {
        Stores {
            staging: self.staging.clone(),
            cloud: self.cloud.clone(),
            relational: self.relational.clone(),
        }
    }

    fn fresh_relational(&mut self) {
        self.relational = Arc::new(MemoryProviderStore::new(self.config.pipeline.table.clone()));
    }

    /// A later run connecting to the same table
    fn reconnect_relational(&mut self) {
        self.relational = Arc::new(self.relational.reconnect());
    }

    fn pipeline(&self, sink: Arc<CollectingSink>) -> Pipeline {
        Pipeline::new(&self.config, self.stores(), sink)
    }
}

#[tokio::test]
async fn test_full_run_moves_cardiology_rows_through_every_tier() {
    let harness = Harness::new();
    let sink = Arc::new(CollectingSink::new());

    let summary = harness.pipeline(sink.clone()).run().await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.rows_extracted, 3);
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(summary.table_rows, Some(3));
    assert_eq!(summary.rows_exported, 3);
    assert_eq!(summary.objects_written.len(), 4);
    assert!(summary.verification_report.is_success());
    assert_eq!(summary.verification_report.failed, 0);
    assert_eq!(
        summary.staging_buckets,
        vec!["aws-backup", "processed-data", "raw-data"]
    );

    let tiers = &harness.config.pipeline;
    let raw = harness
        .staging
        .get_object(&tiers.raw_bucket, &tiers.raw_key)
        .await
        .unwrap();
    let raw = Batch::from_csv_bytes(&raw).unwrap();
    assert_eq!(raw.columns(), ["NPI", "State", "City", "Taxonomy"]);
    assert_eq!(raw.len(), 3);
    assert!(raw.rows().iter().all(|row| row[3] == "207RC0000X"));

    let processed = harness
        .staging
        .get_object(&tiers.processed_bucket, &tiers.processed_key)
        .await
        .unwrap();
    let processed = Batch::from_csv_bytes(&processed).unwrap();
    assert_eq!(
        processed.columns(),
        ["NPI", "provider_state", "provider_city", "specialty_code"]
    );
    assert_eq!(processed.rows(), raw.rows());

    let top = summary.top_states.first().unwrap();
    assert_eq!(top.state.as_deref(), Some("TN"));
    assert_eq!(top.count, 2);
}

#[tokio::test]
async fn test_round_trip_copy_is_byte_identical() {
    let harness = Harness::new();
    harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    let tiers = &harness.config.pipeline;
    let cloud_copy = harness
        .cloud
        .get_object(&harness.config.cloud.bucket, &tiers.cloud_key)
        .await
        .unwrap();
    let backup = harness
        .staging
        .get_object(&tiers.backup_bucket, &tiers.backup_key)
        .await
        .unwrap();
    assert_eq!(cloud_copy, backup);

    let exported = Batch::from_csv_bytes(&cloud_copy).unwrap();
    assert_eq!(exported.columns(), RecordLayout::relational().columns());
    assert_eq!(exported.len(), 3);
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let harness = Harness::new();
    let sink = Arc::new(CollectingSink::new());
    harness.pipeline(sink.clone()).run().await.unwrap();

    let expected: Vec<Stage> = Stage::ALL
        .iter()
        .copied()
        .filter(|s| !s.is_done())
        .collect();
    assert_eq!(sink.completed_stages(), expected);
    assert!(sink.failure().is_none());

    let events = sink.events();
    assert_eq!(events.len(), expected.len() * 2);
    assert_eq!(events[0].status, StageStatus::Started);
    assert_eq!(events[0].stage, Stage::Extract);
    assert_eq!(events[1].status, StageStatus::Completed);
    assert_eq!(events[1].rows, Some(3));
}

#[tokio::test]
async fn test_relational_store_closed_after_success_and_failure() {
    let harness = Harness::new();
    harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();
    assert!(harness.relational.is_closed());

    let failing = Harness::new();
    let err = failing
        .pipeline(Arc::new(CollectingSink::new()))
        .run_from(Stage::StageCRead)
        .await
        .unwrap_err();
    assert!(matches!(err, TierflowError::MissingArtifact { .. }));
    assert!(failing.relational.is_closed());
}

#[tokio::test]
async fn test_stage_c_before_stage_b_write_is_missing_artifact() {
    let harness = Harness::new();
    let sink = Arc::new(CollectingSink::new());

    let err = harness
        .pipeline(sink.clone())
        .run_from(Stage::StageCRead)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("processed-data"));
    let failure = sink.failure().unwrap();
    assert_eq!(failure.stage, Stage::StageCRead);
    assert_eq!(failure.status, StageStatus::Failed);
    assert!(sink.completed_stages().is_empty());
}

#[tokio::test]
async fn test_stage_d_without_table_is_missing_artifact() {
    let harness = Harness::new();
    let err = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run_from(Stage::StageDRead)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("cardiology_providers"));
}

#[tokio::test]
async fn test_resume_from_stage_c_reuses_staged_object() {
    let mut harness = Harness::new();
    harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    harness.fresh_relational();
    let sink = Arc::new(CollectingSink::new());
    let summary = harness
        .pipeline(sink.clone())
        .run_from(Stage::StageCRead)
        .await
        .unwrap();

    assert_eq!(summary.started_from, Stage::StageCRead);
    assert_eq!(summary.rows_extracted, 0);
    assert_eq!(summary.table_rows, Some(3));
    assert_eq!(sink.completed_stages().first(), Some(&Stage::StageCRead));
}

#[tokio::test]
async fn test_rerun_against_populated_table_keeps_final_state() {
    let mut harness = Harness::new();
    harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    harness.reconnect_relational();
    let summary = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(summary.table_rows, Some(3));
    assert_eq!(summary.rows_exported, 3);
    assert!(harness.relational.is_closed());
}

#[tokio::test]
async fn test_rerun_removes_rows_no_longer_in_source() {
    let mut harness = Harness::new();
    let stale = ProviderRecord::from_cells("1000000009", "NY", "ALBANY", "207RC0000X").unwrap();
    harness.relational.ensure_table().await.unwrap();
    harness.relational.upsert(&[stale]).await.unwrap();
    harness.relational.close().await;

    harness.reconnect_relational();
    let summary = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();
    assert_eq!(summary.table_rows, Some(3));

    let tiers = &harness.config.pipeline;
    let export = harness
        .cloud
        .get_object(&harness.config.cloud.bucket, &tiers.cloud_key)
        .await
        .unwrap();
    let npis: Vec<String> = Batch::from_csv_bytes(&export)
        .unwrap()
        .to_records(&RecordLayout::relational())
        .unwrap()
        .into_iter()
        .map(|r| r.npi.to_string())
        .collect();
    assert_eq!(npis.len(), 3);
    assert!(!npis.contains(&"1000000009".to_string()));
}

#[tokio::test]
async fn test_run_with_no_matching_rows_exports_empty_table() {
    let harness = Harness::with_rows(&["1356412345,1,AUSTIN,TX,208D00000X"]);
    let sink = Arc::new(CollectingSink::new());

    let summary = harness.pipeline(sink.clone()).run().await.unwrap();

    assert!(summary.is_complete());
    assert!(sink.failure().is_none());
    assert_eq!(summary.rows_extracted, 0);
    assert_eq!(summary.table_rows, Some(0));
    assert_eq!(summary.rows_exported, 0);

    let tiers = &harness.config.pipeline;
    let export = harness
        .cloud
        .get_object(&harness.config.cloud.bucket, &tiers.cloud_key)
        .await
        .unwrap();
    let exported = Batch::from_csv_bytes(&export).unwrap();
    assert!(exported.is_empty());
    assert_eq!(exported.columns(), RecordLayout::relational().columns());
}

#[tokio::test]
async fn test_stage_d_on_empty_table_from_earlier_run_is_missing_artifact() {
    let harness = Harness::new();
    harness.relational.ensure_table().await.unwrap();

    let err = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run_from(Stage::StageDRead)
        .await
        .unwrap_err();
    assert!(matches!(err, TierflowError::MissingArtifact { .. }));
    assert!(err.to_string().contains("rows in table"));
}

#[tokio::test]
async fn test_missing_source_file_stops_before_any_stage() {
    let mut harness = Harness::new();
    harness.config.source.file_path = "/nonexistent/npidata.csv".to_string();
    let sink = Arc::new(CollectingSink::new());

    let err = harness.pipeline(sink.clone()).run().await.unwrap_err();
    assert!(matches!(err, TierflowError::Configuration(_)));
    assert!(sink.events().is_empty());
    assert!(harness.relational.is_closed());
}

#[tokio::test]
async fn test_upsert_is_idempotent_by_npi() {
    let harness = Harness::new();
    harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap();

    let tiers = &harness.config.pipeline;
    let processed = harness
        .staging
        .get_object(&tiers.processed_bucket, &tiers.processed_key)
        .await
        .unwrap();
    let records = Batch::from_csv_bytes(&processed)
        .unwrap()
        .to_records(&RecordLayout::processed())
        .unwrap();

    let store = MemoryProviderStore::new(tiers.table.clone());
    store.ensure_table().await.unwrap();
    let first = store.upsert(&records).await.unwrap();
    let second = store.upsert(&records).await.unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped(), 3);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_unreachable_staging_is_transient_not_missing() {
    let harness = Harness::new();
    harness.staging.set_unreachable(true);

    let err = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.exit_code(), 4);
    assert!(!matches!(err, TierflowError::MissingArtifact { .. }));

    harness.staging.set_unreachable(false);
    let missing = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run_from(Stage::StageBRead)
        .await
        .unwrap_err();
    assert!(!missing.is_transient());
    assert_eq!(missing.exit_code(), 3);
}

#[tokio::test]
async fn test_unreachable_relational_store_is_connection_error() {
    let harness = Harness::new();
    harness.relational.set_unreachable(true);

    let err = harness
        .pipeline(Arc::new(CollectingSink::new()))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, TierflowError::Connection { .. }));
    assert_eq!(err.exit_code(), 4);

    // Stages before the relational tier completed and their objects remain
    let tiers = &harness.config.pipeline;
    assert!(harness
        .staging
        .head_object(&tiers.processed_bucket, &tiers.processed_key)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_ensure_bucket_is_idempotent() {
    let store = MemoryObjectStore::new("memory://staging");
    store.ensure_bucket("raw-data").await.unwrap();
    store.ensure_bucket("raw-data").await.unwrap();
    assert_eq!(store.list_buckets().await.unwrap(), vec!["raw-data"]);
}
