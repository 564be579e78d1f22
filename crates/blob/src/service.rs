//! Object + metadata dual-consistency logic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};

use vibe_core::{Did, ObjectId};
use vibe_store::{Document, DocumentStore, StoreError, SYSTEM_DB};

use crate::error::BlobError;
use crate::metadata::{key_owner, object_key, sanitize_filename, BlobMetadata};
use crate::object::ObjectStore;

/// Result of a completed upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobUpload {
    pub object_id: ObjectId,
    pub key: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

/// A presigned upload slot: the client PUTs to `url`, then finalizes `key`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub object_id: ObjectId,
    pub key: String,
    pub url: String,
}

/// Outcome counts of an account-deletion sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// Blob operations combining the object store and the owner's metadata
/// documents. Ownership is absolute: every operation takes the calling owner
/// and refuses foreign keys.
#[derive(Clone)]
pub struct BlobStore {
    objects: Arc<dyn ObjectStore>,
    documents: Arc<dyn DocumentStore>,
    bucket: String,
}

impl BlobStore {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        documents: Arc<dyn DocumentStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            documents,
            bucket: bucket.into(),
        }
    }

    fn require_owner(key: &str, owner: &Did) -> Result<(), BlobError> {
        if key_owner(key) == Some(owner.as_str()) {
            Ok(())
        } else {
            Err(BlobError::forbidden("not the blob owner"))
        }
    }

    /// Direct upload: object write, then metadata write.
    ///
    /// If the metadata write fails after the object landed, the object is
    /// left in place and a structured orphan event is logged — a possibly
    /// referenced object is never silently deleted. The out-of-band sweep
    /// reconciles from that log.
    pub async fn upload(
        &self,
        owner: &Did,
        collection: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<BlobUpload, BlobError> {
        let object_id = ObjectId::new();
        let key = object_key(owner, collection, &object_id, filename);
        let size = bytes.len() as u64;

        self.objects.put_object(&key, bytes, content_type).await?;

        if let Err(e) = self
            .write_metadata(owner, &key, collection, filename, content_type, size)
            .await
        {
            error!(
                object_key = %key,
                phase = "metadata_write",
                timestamp = %Utc::now(),
                error = %e,
                "orphaned blob object: object stored, metadata write failed"
            );
            return Err(e.into());
        }

        Ok(BlobUpload {
            object_id,
            key,
            filename: sanitize_filename(filename),
            content_type: content_type.to_string(),
            size,
        })
    }

    /// Issue a time-boxed single-object upload URL. The object key is fixed
    /// here; the client uploads directly and later finalizes.
    pub async fn create_presigned_upload(
        &self,
        owner: &Did,
        collection: &str,
        filename: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<PresignedUpload, BlobError> {
        let object_id = ObjectId::new();
        let key = object_key(owner, collection, &object_id, filename);
        let url = self.objects.presign_upload(&key, content_type, ttl).await?;
        Ok(PresignedUpload {
            object_id,
            key,
            url,
        })
    }

    /// Finalize a presigned upload by writing metadata for the already
    /// present object. Fails `NotFound` if the client never uploaded.
    pub async fn finalize_upload(
        &self,
        owner: &Did,
        key: &str,
        collection: &str,
        filename: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), BlobError> {
        Self::require_owner(key, owner)?;
        if !self.objects.object_exists(key).await? {
            return Err(BlobError::NotFound);
        }
        self.write_metadata(owner, key, collection, filename, content_type, size)
            .await
            .map_err(Into::into)
    }

    /// Time-boxed download URL. `NotFound` when the key is absent from the
    /// object store; only the owner may download.
    pub async fn presigned_download(
        &self,
        owner: &Did,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        Self::require_owner(key, owner)?;
        if !self.objects.object_exists(key).await? {
            return Err(BlobError::NotFound);
        }
        Ok(self.objects.presign_download(key, ttl).await?)
    }

    /// Metadata for one owned blob.
    pub async fn metadata(&self, owner: &Did, key: &str) -> Result<BlobMetadata, BlobError> {
        Self::require_owner(key, owner)?;
        let doc = self
            .documents
            .get(SYSTEM_DB, key)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => BlobError::NotFound,
                other => BlobError::Metadata(other),
            })?;
        serde_json::from_value(doc.body)
            .map_err(|e| BlobError::Metadata(StoreError::backend(format!("malformed metadata: {e}"))))
    }

    /// Ordered, idempotent, best-effort delete.
    ///
    /// 1. Read metadata — NotFound is tolerated; the object deletion still
    ///    runs as a best-effort sweep.
    /// 2. Delete the object — failures are logged, never abort.
    /// 3. Delete the metadata at the revision read in step 1 —
    ///    NotFound/Conflict mean "already gone".
    ///
    /// Calling this twice for the same key never raises a fatal error.
    pub async fn delete(&self, owner: &Did, key: &str) -> Result<(), BlobError> {
        Self::require_owner(key, owner)?;
        let metadata_rev = match self.documents.get(SYSTEM_DB, key).await {
            Ok(doc) => doc.rev,
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.objects.delete_object(key).await {
            warn!(object_key = %key, error = %e, "object deletion failed; continuing sweep");
        }

        if let Some(rev) = metadata_rev {
            match self.documents.delete(SYSTEM_DB, key, &rev).await {
                Ok(()) => {}
                Err(StoreError::NotFound) | Err(StoreError::Conflict(_)) => {
                    // Already gone (or replaced concurrently); nothing to do.
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// All metadata documents owned by `owner` (id-prefix scan over the
    /// system database, keyed by the owner's DID prefix).
    pub async fn owned_metadata_keys(&self, owner: &Did) -> Result<Vec<String>, BlobError> {
        Ok(self
            .owned_metadata_docs(owner)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect())
    }

    /// Resolve an owned blob by its object id. Scans the owner's metadata
    /// documents for the `{objectId}-` key segment; `None` when the owner has
    /// no blob with that id. Returns the full object key with the metadata.
    pub async fn find_by_object_id(
        &self,
        owner: &Did,
        object_id: &ObjectId,
    ) -> Result<Option<(String, BlobMetadata)>, BlobError> {
        let needle = format!("/{object_id}-");
        for doc in self.owned_metadata_docs(owner).await? {
            if doc.id.contains(&needle) {
                let meta = serde_json::from_value(doc.body).map_err(|e| {
                    BlobError::Metadata(StoreError::backend(format!("malformed metadata: {e}")))
                })?;
                return Ok(Some((doc.id, meta)));
            }
        }
        Ok(None)
    }

    async fn owned_metadata_docs(&self, owner: &Did) -> Result<Vec<Document>, BlobError> {
        let docs = self
            .documents
            .find(
                SYSTEM_DB,
                &serde_json::json!({
                    "_id": {
                        "$gte": format!("{}/", owner.as_str()),
                        "$lt": format!("{}0", owner.as_str()),
                    }
                }),
            )
            .await?;
        Ok(docs)
    }

    /// Account-deletion sweep: for every owned blob, delete the object, then
    /// — only if that succeeded — delete its metadata. Per-key failures are
    /// logged and never abort the sweep.
    pub async fn purge_owned(&self, owner: &Did) -> Result<PurgeSummary, BlobError> {
        let docs = self.owned_metadata_docs(owner).await?;

        let mut summary = PurgeSummary::default();
        for doc in docs {
            if let Err(e) = self.objects.delete_object(&doc.id).await {
                warn!(object_key = %doc.id, error = %e, "purge: object deletion failed; keeping metadata");
                summary.failed += 1;
                continue;
            }
            let rev = doc.rev.as_deref().unwrap_or_default();
            match self.documents.delete(SYSTEM_DB, &doc.id, rev).await {
                Ok(()) | Err(StoreError::NotFound) | Err(StoreError::Conflict(_)) => {
                    summary.deleted += 1;
                }
                Err(e) => {
                    warn!(object_key = %doc.id, error = %e, "purge: metadata deletion failed");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn write_metadata(
        &self,
        owner: &Did,
        key: &str,
        collection: &str,
        filename: &str,
        content_type: &str,
        size: u64,
    ) -> Result<(), StoreError> {
        let meta = BlobMetadata {
            original_filename: filename.to_string(),
            content_type: content_type.to_string(),
            size,
            owner_did: owner.clone(),
            collection: collection.to_string(),
            upload_timestamp: Utc::now(),
            bucket: self.bucket.clone(),
        };
        let body = serde_json::to_value(&meta)
            .map_err(|e| StoreError::backend(format!("serialize metadata: {e}")))?;
        self.documents
            .put(SYSTEM_DB, &Document::new(key, body))
            .await?;
        Ok(())
    }
}
