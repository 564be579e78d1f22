//! S3-compatible backend (AWS S3, Minio, Backblaze, …).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::error::ObjectStoreError;

use super::r#trait::ObjectStore;

/// Object store over the AWS SDK.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create from an existing SDK client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client for an explicit endpoint (S3-compatible servers).
    ///
    /// `force_path_style` is required for Minio-style endpoints.
    pub fn for_endpoint(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: impl Into<String>,
    ) -> Self {
        let creds = aws_sdk_s3::config::Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "vibe-config",
        );
        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint)
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(creds)
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        Self::new(Client::from_conf(config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket if absent (call on startup).
    pub async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                // Some servers reject re-creation; a successful head means
                // the bucket is usable.
                match self.client.head_bucket().bucket(&self.bucket).send().await {
                    Ok(_) => Ok(()),
                    Err(_) => Err(ObjectStoreError::backend(format!(
                        "failed to create or access bucket '{}': {e}",
                        self.bucket
                    ))),
                }
            }
        }
    }

    fn presign_config(ttl: Duration) -> Result<PresigningConfig, ObjectStoreError> {
        PresigningConfig::expires_in(ttl)
            .map_err(|e| ObjectStoreError::backend(format!("invalid presign ttl: {e}")))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        debug!(bucket = %self.bucket, key, size = bytes.len(), "putting object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ObjectStoreError::backend(format!("put '{key}': {e}")))?;
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(ObjectStoreError::backend(format!(
                        "head '{key}': {service_err}"
                    )))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError> {
        // S3 delete is idempotent; absent keys succeed.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::backend(format!("delete '{key}': {e}")))?;
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presign_config(ttl)?)
            .await
            .map_err(|e| ObjectStoreError::backend(format!("presign upload '{key}': {e}")))?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_download(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presign_config(ttl)?)
            .await
            .map_err(|e| ObjectStoreError::backend(format!("presign download '{key}': {e}")))?;
        Ok(presigned.uri().to_string())
    }
}
