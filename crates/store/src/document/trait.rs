use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreError;

/// A revisioned JSON document.
///
/// `rev` is the optimistic-concurrency token: writes against an existing
/// document must carry the current revision or fail with
/// [`StoreError::Conflict`]. Body fields ride alongside `_id`/`_rev` via
/// serde flattening, matching the CouchDB wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(flatten)]
    pub body: JsonValue,
}

impl Document {
    pub fn new(id: impl Into<String>, body: JsonValue) -> Self {
        Self {
            id: id.into(),
            rev: None,
            body,
        }
    }

    pub fn with_rev(id: impl Into<String>, rev: impl Into<String>, body: JsonValue) -> Self {
        Self {
            id: id.into(),
            rev: Some(rev.into()),
            body,
        }
    }

    /// Field lookup in the body (None for non-object bodies).
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.body.as_object().and_then(|m| m.get(name))
    }
}

/// Successful single-document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOk {
    pub id: String,
    pub rev: String,
}

/// Per-entry outcome of a bulk write. Entries fail independently: a stale
/// revision in one entry never aborts its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkEntryResult {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkEntryResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Whether every entry of a batch succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkStatus {
    AllOk,
    Partial,
}

/// Aggregated bulk-write outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub status: BulkStatus,
    pub results: Vec<BulkEntryResult>,
}

impl BulkOutcome {
    pub fn from_results(results: Vec<BulkEntryResult>) -> Self {
        let status = if results.iter().all(BulkEntryResult::is_ok) {
            BulkStatus::AllOk
        } else {
            BulkStatus::Partial
        };
        Self { status, results }
    }
}

/// Storage-agnostic document CRUD with revision conflicts.
///
/// Selector semantics for `find` follow the Mango subset both backends
/// implement: top-level fields match by equality, and a field may instead map
/// to `{"$gte": a, "$lt": b}` for range scans (used for id-prefix reads).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the database if absent. Idempotent.
    async fn ensure_database(&self, db: &str) -> Result<(), StoreError>;

    async fn database_exists(&self, db: &str) -> Result<bool, StoreError>;

    /// Destroy the database and everything in it.
    async fn delete_database(&self, db: &str) -> Result<(), StoreError>;

    async fn get(&self, db: &str, id: &str) -> Result<Document, StoreError>;

    /// Create-or-update. Stale (or missing-on-update) revisions fail with
    /// `Conflict`.
    async fn put(&self, db: &str, doc: &Document) -> Result<WriteOk, StoreError>;

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<(), StoreError>;

    /// Bulk create-or-update with independent per-entry outcomes.
    async fn bulk_put(&self, db: &str, docs: &[Document])
        -> Result<Vec<BulkEntryResult>, StoreError>;

    async fn find(&self, db: &str, selector: &JsonValue) -> Result<Vec<Document>, StoreError>;
}
