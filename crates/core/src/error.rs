//! Error taxonomy shared across the core.

use thiserror::Error;

/// Result type used across the core crates.
pub type CoreResult<T> = Result<T, CoreError>;

/// Canonical failure taxonomy.
///
/// Every store/service error eventually maps into one of these variants; the
/// HTTP layer turns them into status codes in exactly one place. Keep variants
/// coarse: callers branch on the kind, the message is for logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Missing, malformed, or expired credentials.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Authenticated but not allowed (identity mismatch, capability denied,
    /// non-owner blob access). The message names the specific cause.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed request (missing app-id header, bad payload).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Stale revision / concurrent update.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Document or object absent.
    #[error("not found")]
    NotFound,

    /// Required instance configuration is missing; fail closed.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Unexpected store or I/O failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
