//! S3 object store client
//!
//! One client type serves both tiers that speak the S3 protocol:
//!
//! - the staging endpoint (MinIO or any S3-compatible server) with static
//!   credentials, a custom endpoint and path-style addressing
//! - the cloud store with credentials from a named profile
//!
//! Every client carries an operation timeout and a connect timeout. SDK
//! errors are translated into [`ObjectStoreError`] at this boundary.

use super::traits::{ObjectMetadata, ObjectStore, ObjectSummary, StoreResult};
use crate::config::{CloudStoreConfig, StagingStoreConfig};
use crate::domain::ObjectStoreError;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use secrecy::ExposeSecret;
use std::time::Duration;

/// Error codes S3 uses for a missing bucket or key
const NOT_FOUND_CODES: [&str; 3] = ["NoSuchKey", "NoSuchBucket", "NotFound"];

/// aws-sdk-s3 backed object store
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    endpoint: String,
}

impl S3ObjectStore {
    /// Build a client for the S3-compatible staging endpoint
    ///
    /// Uses the static access key pair from the configuration and path-style
    /// addressing. The region is only used for request signing.
    pub fn staging(config: &StagingStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.expose_secret().as_str(),
            config.secret_key.expose_secret().as_str(),
            None,
            None,
            "tierflow-staging",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .timeout_config(timeouts(config.timeout_seconds))
            .build();

        tracing::info!(endpoint = %config.endpoint, "Staging object store client initialized");

        Self {
            client: Client::from_conf(s3_config),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Build a client for the cloud store from a named credentials profile
    pub async fn cloud(config: &CloudStoreConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&config.profile)
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .timeout_config(timeouts(config.timeout_seconds));

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("s3.{}.amazonaws.com", config.region));

        tracing::info!(
            endpoint = %endpoint,
            profile = %config.profile,
            "Cloud object store client initialized"
        );

        Self {
            client: Client::from_conf(builder.build()),
            endpoint,
        }
    }

    /// Map an SDK failure onto the domain error
    ///
    /// Timeouts and dispatch failures are checked first so a slow endpoint is
    /// never reported as a missing object.
    fn classify<E>(&self, err: SdkError<E>, operation: &str, bucket: &str, key: &str) -> ObjectStoreError
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        match &err {
            SdkError::TimeoutError(_) => ObjectStoreError::Timeout {
                endpoint: self.endpoint.clone(),
                operation: operation.to_string(),
            },
            SdkError::DispatchFailure(failure) if failure.is_timeout() => {
                ObjectStoreError::Timeout {
                    endpoint: self.endpoint.clone(),
                    operation: operation.to_string(),
                }
            }
            SdkError::DispatchFailure(_) => ObjectStoreError::Connection {
                endpoint: self.endpoint.clone(),
                message: DisplayErrorContext(&err).to_string(),
            },
            SdkError::ServiceError(service)
                if service
                    .err()
                    .code()
                    .is_some_and(|code| NOT_FOUND_CODES.contains(&code)) =>
            {
                ObjectStoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            }
            _ => ObjectStoreError::OperationFailed {
                operation: operation.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }
}

fn timeouts(seconds: u64) -> TimeoutConfig {
    TimeoutConfig::builder()
        .operation_timeout(Duration::from_secs(seconds))
        .connect_timeout(Duration::from_secs(seconds))
        .build()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        let result = self.client.create_bucket().bucket(bucket).send().await;

        match result {
            Ok(_) => {
                tracing::info!(bucket = %bucket, endpoint = %self.endpoint, "Created bucket");
                Ok(())
            }
            Err(SdkError::ServiceError(ref service))
                if service.err().is_bucket_already_owned_by_you()
                    || service.err().is_bucket_already_exists() =>
            {
                tracing::info!(bucket = %bucket, endpoint = %self.endpoint, "Bucket already exists");
                Ok(())
            }
            Err(err @ (SdkError::TimeoutError(_) | SdkError::DispatchFailure(_))) => {
                Err(self.classify(err, "create_bucket", bucket, ""))
            }
            Err(err) => Err(ObjectStoreError::BucketCreationFailed {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            }),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        let size = data.len();
        tracing::debug!(bucket = %bucket, key = %key, size, "Uploading object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| self.classify(e, "put_object", bucket, key))?;

        tracing::info!(bucket = %bucket, key = %key, size, "Uploaded object");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.classify(e, "get_object", bucket, key))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::BodyReadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?
            .into_bytes();

        tracing::debug!(bucket = %bucket, key = %key, size = data.len(), "Downloaded object");
        Ok(data)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| self.classify(e, "head_object", bucket, key))?;

        let last_modified = response
            .last_modified()
            .and_then(|ts| chrono::DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()));

        Ok(ObjectMetadata {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            last_modified,
        })
    }

    async fn list_objects(&self, bucket: &str) -> StoreResult<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| self.classify(e, "list_objects", bucket, ""))?;

            objects.extend(response.contents().iter().filter_map(|object| {
                object.key().map(|key| ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                })
            }));

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| self.classify(e, "list_buckets", "", ""))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }
}
