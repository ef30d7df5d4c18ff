use crate::traits::{BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

/// S3-backed blob store.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore.
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible
    ///   providers (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            // S3-compatible providers need path-style addressing
            let mut builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config)
                .force_path_style(true);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                builder = builder.credentials_provider(provider);
            }
            Client::from_conf(builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3BlobStore { client, bucket })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
                {
                    StorageError::NotFound(storage_key.to_string())
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %storage_key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let bytes = data.into_bytes().to_vec();

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn put(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let body = ByteStream::from(Bytes::from(data));
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(bucket = %self.bucket, key = %storage_key, "S3 delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
                {
                    Ok(false)
                }
                _ => Err(StorageError::Backend(e.to_string())),
            },
        }
    }
}
