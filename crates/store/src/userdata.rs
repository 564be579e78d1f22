//! Collection-scoped reads and writes inside a per-user database.
//!
//! Documents of a logical collection share the owner's physical database via
//! the id convention `<collection>/<docId>`.

use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};

use crate::document::{BulkOutcome, Document, DocumentStore, WriteOk};
use crate::error::StoreError;

/// Collection-aware data access for one request's resolved database.
#[derive(Clone)]
pub struct UserData {
    store: Arc<dyn DocumentStore>,
}

impl UserData {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read the documents of `collection` matching the field-equality
    /// `filter`, via an id-prefix range scan.
    pub async fn read(
        &self,
        db: &str,
        collection: &str,
        filter: &JsonValue,
    ) -> Result<Vec<Document>, StoreError> {
        let mut selector = Map::new();
        selector.insert(
            "_id".to_string(),
            json!({
                "$gte": format!("{collection}/"),
                // '0' is the successor of '/' in ASCII; this bounds the prefix.
                "$lt": format!("{collection}0"),
            }),
        );
        if let Some(fields) = filter.as_object() {
            for (k, v) in fields {
                selector.insert(k.clone(), v.clone());
            }
        }
        self.store.find(db, &JsonValue::Object(selector)).await
    }

    /// Create-or-update a single document. Stale revisions fail with
    /// `Conflict`; callers re-read and retry.
    pub async fn write_one(
        &self,
        db: &str,
        collection: &str,
        data: JsonValue,
    ) -> Result<WriteOk, StoreError> {
        let doc = Self::to_document(collection, data)?;
        self.store.put(db, &doc).await
    }

    /// Bulk create-or-update. Each entry succeeds or fails independently; the
    /// outcome is marked `Partial` when any entry failed.
    pub async fn write_bulk(
        &self,
        db: &str,
        collection: &str,
        items: Vec<JsonValue>,
    ) -> Result<BulkOutcome, StoreError> {
        let docs = items
            .into_iter()
            .map(|item| Self::to_document(collection, item))
            .collect::<Result<Vec<_>, _>>()?;
        let results = self.store.bulk_put(db, &docs).await?;
        Ok(BulkOutcome::from_results(results))
    }

    /// Map a raw JSON object onto a `Document`, prefixing the id with the
    /// collection and carrying `_rev` through when supplied.
    fn to_document(collection: &str, mut data: JsonValue) -> Result<Document, StoreError> {
        let Some(fields) = data.as_object_mut() else {
            return Err(StoreError::backend("document body must be a JSON object"));
        };

        let id = match fields.remove("_id") {
            Some(JsonValue::String(id)) if id.starts_with(&format!("{collection}/")) => id,
            Some(JsonValue::String(id)) => format!("{collection}/{id}"),
            Some(_) => return Err(StoreError::backend("_id must be a string")),
            None => format!("{collection}/{}", uuid::Uuid::now_v7()),
        };
        let rev = match fields.remove("_rev") {
            Some(JsonValue::String(rev)) => Some(rev),
            Some(_) => return Err(StoreError::backend("_rev must be a string")),
            None => None,
        };

        Ok(Document { id, rev, body: data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BulkStatus, InMemoryDocumentStore};
    use serde_json::json;

    async fn fixture() -> (UserData, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.ensure_database("db").await.unwrap();
        (UserData::new(store.clone()), store)
    }

    #[tokio::test]
    async fn write_one_prefixes_collection() {
        let (data, store) = fixture().await;
        let ok = data
            .write_one("db", "notes", json!({"_id": "n1", "text": "hi"}))
            .await
            .unwrap();
        assert_eq!(ok.id, "notes/n1");
        assert!(store.get("db", "notes/n1").await.is_ok());
    }

    #[tokio::test]
    async fn write_one_stale_rev_is_conflict() {
        let (data, _) = fixture().await;
        data.write_one("db", "notes", json!({"_id": "n1", "v": 1}))
            .await
            .unwrap();
        let err = data
            .write_one("db", "notes", json!({"_id": "n1", "_rev": "1-bogus", "v": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn bulk_stale_middle_entry_reports_partial_and_keeps_siblings() {
        let (data, store) = fixture().await;
        data.write_one("db", "notes", json!({"_id": "n2", "v": 0}))
            .await
            .unwrap();

        let outcome = data
            .write_bulk(
                "db",
                "notes",
                vec![
                    json!({"_id": "n1", "v": 1}),
                    json!({"_id": "n2", "_rev": "1-stale", "v": 9}),
                    json!({"_id": "n3", "v": 3}),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, BulkStatus::Partial);
        assert_eq!(outcome.results.len(), 3);
        let failed: Vec<_> = outcome.results.iter().filter(|r| !r.is_ok()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, "notes/n2");

        // Confirm by follow-up read: items 1 and 3 persisted, item 2 untouched.
        assert!(store.get("db", "notes/n1").await.is_ok());
        assert!(store.get("db", "notes/n3").await.is_ok());
        assert_eq!(
            store.get("db", "notes/n2").await.unwrap().field("v"),
            Some(&json!(0))
        );
    }

    #[tokio::test]
    async fn all_ok_batch_is_uniform_success() {
        let (data, _) = fixture().await;
        let outcome = data
            .write_bulk(
                "db",
                "notes",
                vec![json!({"_id": "a"}), json!({"_id": "b"})],
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, BulkStatus::AllOk);
    }

    #[tokio::test]
    async fn read_scopes_to_collection_and_filters() {
        let (data, _) = fixture().await;
        data.write_one("db", "notes", json!({"_id": "n1", "tag": "x"}))
            .await
            .unwrap();
        data.write_one("db", "notes", json!({"_id": "n2", "tag": "y"}))
            .await
            .unwrap();
        data.write_one("db", "tasks", json!({"_id": "t1", "tag": "x"}))
            .await
            .unwrap();

        let all = data.read("db", "notes", &json!({})).await.unwrap();
        assert_eq!(all.len(), 2);

        let tagged = data.read("db", "notes", &json!({"tag": "x"})).await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id, "notes/n1");
    }
}
