use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::StoreError;

use super::r#trait::{BulkEntryResult, Document, DocumentStore, WriteOk};

#[derive(Debug, Clone)]
struct StoredDoc {
    rev: String,
    body: JsonValue,
}

/// In-memory document store.
///
/// Intended for tests/dev. Revisions follow the `N-…` CouchDB shape so
/// conflict semantics match the HTTP backend exactly.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    // BTreeMap per database: ordered ids make prefix range scans natural.
    databases: RwLock<HashMap<String, BTreeMap<String, StoredDoc>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_rev(current: Option<&str>) -> String {
        let generation = current
            .and_then(|r| r.split('-').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        format!("{}-{}", generation + 1, uuid::Uuid::now_v7().simple())
    }

    fn put_locked(
        docs: &mut BTreeMap<String, StoredDoc>,
        doc: &Document,
    ) -> Result<WriteOk, StoreError> {
        match (docs.get(&doc.id), doc.rev.as_deref()) {
            (Some(existing), Some(rev)) if existing.rev != rev => {
                return Err(StoreError::conflict(format!(
                    "stale revision for '{}'",
                    doc.id
                )));
            }
            (Some(_), None) => {
                return Err(StoreError::conflict(format!(
                    "document '{}' exists and no revision was supplied",
                    doc.id
                )));
            }
            // A rev for a document that is gone is stale, not a create.
            (None, Some(_)) => {
                return Err(StoreError::conflict(format!(
                    "stale revision for '{}'",
                    doc.id
                )));
            }
            _ => {}
        }

        let rev = Self::next_rev(doc.rev.as_deref());
        docs.insert(
            doc.id.clone(),
            StoredDoc {
                rev: rev.clone(),
                body: doc.body.clone(),
            },
        );
        Ok(WriteOk {
            id: doc.id.clone(),
            rev,
        })
    }

    fn matches(doc_id: &str, doc: &StoredDoc, selector: &JsonValue) -> bool {
        let Some(clauses) = selector.as_object() else {
            return true;
        };
        for (field, expected) in clauses {
            let actual = if field == "_id" {
                JsonValue::String(doc_id.to_string())
            } else {
                doc.body
                    .as_object()
                    .and_then(|m| m.get(field))
                    .cloned()
                    .unwrap_or(JsonValue::Null)
            };

            match expected.as_object() {
                // Range clause: {"$gte": a, "$lt": b} over string values.
                Some(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                    let Some(actual) = actual.as_str() else {
                        return false;
                    };
                    if let Some(lo) = ops.get("$gte").and_then(|v| v.as_str()) {
                        if actual < lo {
                            return false;
                        }
                    }
                    if let Some(hi) = ops.get("$lt").and_then(|v| v.as_str()) {
                        if actual >= hi {
                            return false;
                        }
                    }
                }
                _ => {
                    if actual != *expected {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_database(&self, db: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write().expect("lock poisoned");
        dbs.entry(db.to_string()).or_default();
        Ok(())
    }

    async fn database_exists(&self, db: &str) -> Result<bool, StoreError> {
        let dbs = self.databases.read().expect("lock poisoned");
        Ok(dbs.contains_key(db))
    }

    async fn delete_database(&self, db: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write().expect("lock poisoned");
        dbs.remove(db).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn get(&self, db: &str, id: &str) -> Result<Document, StoreError> {
        let dbs = self.databases.read().expect("lock poisoned");
        let docs = dbs.get(db).ok_or(StoreError::NotFound)?;
        let stored = docs.get(id).ok_or(StoreError::NotFound)?;
        Ok(Document::with_rev(id, stored.rev.clone(), stored.body.clone()))
    }

    async fn put(&self, db: &str, doc: &Document) -> Result<WriteOk, StoreError> {
        let mut dbs = self.databases.write().expect("lock poisoned");
        let docs = dbs.get_mut(db).ok_or(StoreError::NotFound)?;
        Self::put_locked(docs, doc)
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<(), StoreError> {
        let mut dbs = self.databases.write().expect("lock poisoned");
        let docs = dbs.get_mut(db).ok_or(StoreError::NotFound)?;
        match docs.get(id) {
            None => Err(StoreError::NotFound),
            Some(existing) if existing.rev != rev => Err(StoreError::conflict(format!(
                "stale revision for '{id}'"
            ))),
            Some(_) => {
                docs.remove(id);
                Ok(())
            }
        }
    }

    async fn bulk_put(
        &self,
        db: &str,
        batch: &[Document],
    ) -> Result<Vec<BulkEntryResult>, StoreError> {
        let mut dbs = self.databases.write().expect("lock poisoned");
        let docs = dbs.get_mut(db).ok_or(StoreError::NotFound)?;

        // Entries fail independently; a conflict is recorded, not propagated.
        let results = batch
            .iter()
            .map(|doc| match Self::put_locked(docs, doc) {
                Ok(ok) => BulkEntryResult {
                    id: ok.id,
                    rev: Some(ok.rev),
                    error: None,
                },
                Err(StoreError::Conflict(_)) => BulkEntryResult {
                    id: doc.id.clone(),
                    rev: None,
                    error: Some("conflict".to_string()),
                },
                Err(e) => BulkEntryResult {
                    id: doc.id.clone(),
                    rev: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();
        Ok(results)
    }

    async fn find(&self, db: &str, selector: &JsonValue) -> Result<Vec<Document>, StoreError> {
        let dbs = self.databases.read().expect("lock poisoned");
        let docs = dbs.get(db).ok_or(StoreError::NotFound)?;
        Ok(docs
            .iter()
            .filter(|(id, stored)| Self::matches(id, stored, selector))
            .map(|(id, stored)| Document::with_rev(id, stored.rev.clone(), stored.body.clone()))
            .collect())
    }
}
