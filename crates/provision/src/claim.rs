//! Admin bootstrap claim codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vibe_core::Did;

/// Singleton id of the bootstrap claim code.
pub const INITIAL_ADMIN: &str = "INITIAL_ADMIN";

/// A one-shot code that lets its bearer claim an (admin) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimCode {
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// When set, only this DID may spend the code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_did: Option<Did>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_at: Option<DateTime<Utc>>,
}

impl ClaimCode {
    pub fn is_spent(&self) -> bool {
        self.spent_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// Document id for a claim code in the system database.
pub fn claim_code_doc_id(name: &str) -> String {
    format!("claims/{name}")
}
