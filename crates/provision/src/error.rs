use thiserror::Error;

use vibe_core::CoreError;
use vibe_store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// An identity with this DID already exists.
    #[error("identity already exists")]
    AlreadyExists,

    /// Claim code missing, mismatched, expired, or already spent.
    #[error("invalid claim code: {0}")]
    InvalidClaim(String),

    /// The user record was written but the database was not provisioned.
    /// Recoverable by re-running provisioning; no automatic rollback.
    #[error("identity partially provisioned: user record exists, database missing ({0})")]
    PartiallyProvisioned(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProvisionError {
    pub fn invalid_claim(msg: impl Into<String>) -> Self {
        Self::InvalidClaim(msg.into())
    }
}

impl From<ProvisionError> for CoreError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::AlreadyExists => {
                CoreError::conflict("identity already exists")
            }
            ProvisionError::InvalidClaim(msg) => CoreError::Forbidden(msg),
            ProvisionError::PartiallyProvisioned(msg) => CoreError::Internal(msg),
            ProvisionError::Store(e) => e.into(),
        }
    }
}
