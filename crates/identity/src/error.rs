use thiserror::Error;

/// Errors from key handling and the DID codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// A key of the wrong length was supplied (caller error).
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// A DID string failed to decode.
    #[error("malformed identifier: {0}")]
    Format(String),
}

impl IdentityError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}
