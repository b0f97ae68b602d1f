//! Post-hop verification
//!
//! After every write the pipeline confirms the artifact before the next hop
//! starts: objects must exist with the size that was written, the relational
//! table must hold at least one row per unique NPI of the batch, and the
//! round-trip copy must match the cloud object byte for byte.

use crate::adapters::database::ProviderStore;
use crate::adapters::object_store::ObjectStore;
use crate::config::schema::VerificationConfig;
use crate::core::verification::checksum::calculate_checksum_bytes;
use crate::core::verification::report::{CheckKind, VerificationFailure, VerificationReport};
use crate::domain::{Result, TierflowError};
use std::time::Instant;

/// Location of one object
#[derive(Clone, Copy)]
pub struct ObjectLocation<'a> {
    /// Store holding the object
    pub store: &'a dyn ObjectStore,
    /// Bucket name
    pub bucket: &'a str,
    /// Object key
    pub key: &'a str,
}

impl std::fmt::Display for ObjectLocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Verifier for post-hop validation
pub struct Verifier {
    config: VerificationConfig,
}

impl Verifier {
    /// Create a new verifier
    pub fn new(config: VerificationConfig) -> Self {
        Self { config }
    }

    /// Confirm an object exists, is non-empty and has the size written
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Verification` when the check fails and the
    /// store error when the head request itself fails.
    pub async fn verify_object(
        &self,
        location: ObjectLocation<'_>,
        expected_size: u64,
        report: &mut VerificationReport,
    ) -> Result<()> {
        let start = Instant::now();
        let target = location.to_string();
        let outcome = match location
            .store
            .head_object(location.bucket, location.key)
            .await
        {
            Ok(meta) if meta.size == 0 => Some(("0 bytes".to_string(), "Object is empty")),
            Ok(meta) if meta.size != expected_size => Some((
                format!("{} bytes", meta.size),
                "Object size differs from bytes written",
            )),
            Ok(_) => None,
            Err(e) if e.is_not_found() => {
                Some(("missing".to_string(), "Object not found after write"))
            }
            Err(e) => return Err(e.into()),
        };
        report.add_duration(start.elapsed().as_millis() as u64);

        match outcome {
            None => {
                tracing::debug!(target = %target, size = expected_size, "Object verified");
                report.record_pass();
                Ok(())
            }
            Some((actual, reason)) => fail(
                report,
                VerificationFailure {
                    check: CheckKind::Object,
                    target,
                    expected: format!("{expected_size} bytes"),
                    actual,
                    reason: reason.to_string(),
                },
            ),
        }
    }

    /// Confirm the table holds at least `unique_npis` rows
    ///
    /// Returns the observed row count.
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Verification` when the count is short
    pub async fn verify_row_count(
        &self,
        store: &dyn ProviderStore,
        unique_npis: usize,
        report: &mut VerificationReport,
    ) -> Result<i64> {
        let start = Instant::now();
        let count = store.count().await?;
        report.add_duration(start.elapsed().as_millis() as u64);

        if count < unique_npis as i64 {
            fail(
                report,
                VerificationFailure {
                    check: CheckKind::RowCount,
                    target: store.table().to_string(),
                    expected: format!(">= {unique_npis} rows"),
                    actual: format!("{count} rows"),
                    reason: "Table holds fewer rows than unique NPIs loaded".to_string(),
                },
            )?;
        }

        tracing::debug!(table = %store.table(), count, unique_npis, "Row count verified");
        report.record_pass();
        Ok(count)
    }

    /// Confirm a copy is byte-identical to its source by SHA-256
    ///
    /// # Errors
    ///
    /// Returns `TierflowError::Verification` when the digests differ
    pub async fn verify_round_trip(
        &self,
        source: ObjectLocation<'_>,
        copy: ObjectLocation<'_>,
        report: &mut VerificationReport,
    ) -> Result<()> {
        if !self.config.compare_checksums {
            report.record_skip();
            return Ok(());
        }

        let start = Instant::now();
        let source_bytes = source.store.get_object(source.bucket, source.key).await?;
        let copy_bytes = copy.store.get_object(copy.bucket, copy.key).await?;
        let expected = calculate_checksum_bytes(&source_bytes);
        let actual = calculate_checksum_bytes(&copy_bytes);
        report.add_duration(start.elapsed().as_millis() as u64);

        if expected != actual {
            return fail(
                report,
                VerificationFailure {
                    check: CheckKind::RoundTrip,
                    target: copy.to_string(),
                    expected,
                    actual,
                    reason: format!("Copy differs from {source}"),
                },
            );
        }

        tracing::info!(
            source = %source,
            copy = %copy,
            sha256 = %expected,
            "Round-trip copy matches source"
        );
        report.record_pass();
        Ok(())
    }
}

fn fail(report: &mut VerificationReport, failure: VerificationFailure) -> Result<()> {
    let message = format!(
        "{} check failed for {}: {} (expected {}, got {})",
        failure.check, failure.target, failure.reason, failure.expected, failure.actual
    );
    tracing::error!(
        check = %failure.check,
        target = %failure.target,
        reason = %failure.reason,
        "Verification failure"
    );
    report.record_failure(failure);
    Err(TierflowError::Verification(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::MemoryProviderStore;
    use crate::adapters::object_store::{MemoryObjectStore, CSV_CONTENT_TYPE};
    use crate::domain::ProviderRecord;
    use bytes::Bytes;

    fn enabled() -> Verifier {
        Verifier::new(VerificationConfig::default())
    }

    async fn store_with(key: &str, body: &'static [u8]) -> MemoryObjectStore {
        let store = MemoryObjectStore::with_buckets("memory://staging", &["raw-data"]);
        store
            .put_object("raw-data", key, Bytes::from_static(body), CSV_CONTENT_TYPE)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_verify_object_passes() {
        let store = store_with("a.csv", b"NPI\n1467503512\n").await;
        let mut report = VerificationReport::new();
        let location = ObjectLocation {
            store: &store,
            bucket: "raw-data",
            key: "a.csv",
        };

        enabled()
            .verify_object(location, 15, &mut report)
            .await
            .unwrap();
        assert_eq!(report.passed, 1);
    }

    #[tokio::test]
    async fn test_verify_object_size_mismatch() {
        let store = store_with("a.csv", b"NPI\n").await;
        let mut report = VerificationReport::new();
        let location = ObjectLocation {
            store: &store,
            bucket: "raw-data",
            key: "a.csv",
        };

        let err = enabled()
            .verify_object(location, 99, &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, TierflowError::Verification(_)));
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_verify_object_missing() {
        let store = MemoryObjectStore::with_buckets("memory://staging", &["raw-data"]);
        let mut report = VerificationReport::new();
        let location = ObjectLocation {
            store: &store,
            bucket: "raw-data",
            key: "absent.csv",
        };

        let err = enabled()
            .verify_object(location, 10, &mut report)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found after write"));
    }

    #[tokio::test]
    async fn test_checksum_opt_out_keeps_object_checks() {
        let verifier = Verifier::new(VerificationConfig {
            compare_checksums: false,
        });
        let store = MemoryObjectStore::new("memory://staging");
        let mut report = VerificationReport::new();
        let location = ObjectLocation {
            store: &store,
            bucket: "raw-data",
            key: "a.csv",
        };

        let err = verifier
            .verify_object(location, 10, &mut report)
            .await
            .unwrap_err();
        assert!(matches!(err, TierflowError::Verification(_)));
        assert_eq!(report.failed, 1);

        verifier
            .verify_round_trip(location, location, &mut report)
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_verify_row_count() {
        let table = MemoryProviderStore::new("cardiology_providers");
        table.ensure_table().await.unwrap();
        table
            .upsert(&[
                ProviderRecord::from_cells("1467503512", "TN", "NASHVILLE", "207RC0000X").unwrap(),
            ])
            .await
            .unwrap();

        let mut report = VerificationReport::new();
        assert_eq!(
            enabled()
                .verify_row_count(&table, 1, &mut report)
                .await
                .unwrap(),
            1
        );
        assert!(enabled()
            .verify_row_count(&table, 2, &mut report)
            .await
            .is_err());
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_verify_round_trip() {
        let cloud = MemoryObjectStore::with_buckets("memory://cloud", &["backup"]);
        let staging = MemoryObjectStore::with_buckets("memory://staging", &["aws-backup"]);
        let body = Bytes::from_static(b"npi,provider_state\n1467503512,TN\n");
        cloud
            .put_object("backup", "export.csv", body.clone(), CSV_CONTENT_TYPE)
            .await
            .unwrap();
        staging
            .put_object("aws-backup", "copy.csv", body, CSV_CONTENT_TYPE)
            .await
            .unwrap();

        let mut report = VerificationReport::new();
        enabled()
            .verify_round_trip(
                ObjectLocation {
                    store: &cloud,
                    bucket: "backup",
                    key: "export.csv",
                },
                ObjectLocation {
                    store: &staging,
                    bucket: "aws-backup",
                    key: "copy.csv",
                },
                &mut report,
            )
            .await
            .unwrap();
        assert_eq!(report.passed, 1);

        staging
            .put_object(
                "aws-backup",
                "copy.csv",
                Bytes::from_static(b"npi\n"),
                CSV_CONTENT_TYPE,
            )
            .await
            .unwrap();
        let err = enabled()
            .verify_round_trip(
                ObjectLocation {
                    store: &cloud,
                    bucket: "backup",
                    key: "export.csv",
                },
                ObjectLocation {
                    store: &staging,
                    bucket: "aws-backup",
                    key: "copy.csv",
                },
                &mut report,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TierflowError::Verification(_)));
    }
}
