use thiserror::Error;

use vibe_core::CoreError;
use vibe_store::StoreError;

/// Object-store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("object not found")]
    NotFound,

    #[error("object store error: {0}")]
    Backend(String),
}

impl ObjectStoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Blob-service failures across both halves of the dual write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,

    /// Non-owner access. Ownership is absolute for blobs.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Object(#[from] ObjectStoreError),

    #[error(transparent)]
    Metadata(#[from] StoreError),
}

impl BlobError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

impl From<BlobError> for CoreError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound | BlobError::Object(ObjectStoreError::NotFound) => {
                CoreError::NotFound
            }
            BlobError::Forbidden(msg) => CoreError::Forbidden(msg),
            BlobError::Object(ObjectStoreError::Backend(msg)) => CoreError::Internal(msg),
            BlobError::Metadata(e) => e.into(),
        }
    }
}
