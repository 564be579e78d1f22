use std::time::Duration;

use async_trait::async_trait;

use crate::error::ObjectStoreError;

/// Storage-agnostic binary object operations.
///
/// Presigned URLs carry explicit wall-clock expiry enforced by the backend;
/// `delete_object` follows S3 semantics and succeeds for absent keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn object_exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Time-boxed URL for a single-object upload of `key`.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, ObjectStoreError>;

    /// Time-boxed URL for downloading `key`. Does not check existence.
    async fn presign_download(&self, key: &str, ttl: Duration)
        -> Result<String, ObjectStoreError>;
}
