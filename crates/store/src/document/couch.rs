//! CouchDB-style HTTP backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::StoreError;

use super::r#trait::{BulkEntryResult, Document, DocumentStore, WriteOk};

/// Document store talking to a CouchDB-compatible server over HTTP.
pub struct CouchDocumentStore {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CouchWriteResponse {
    id: String,
    rev: String,
}

#[derive(Debug, Deserialize)]
struct CouchBulkEntry {
    id: String,
    rev: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CouchFindResponse {
    docs: Vec<Document>,
}

impl CouchDocumentStore {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn db_url(&self, db: &str) -> String {
        format!("{}/{}", self.base_url, db)
    }

    fn doc_url(&self, db: &str, id: &str) -> String {
        // Document ids contain '/' (collection convention, DID-keyed blobs);
        // they must travel as a single path segment.
        format!("{}/{}/{}", self.base_url, db, encode_doc_id(id))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        req.send()
            .await
            .map_err(|e| StoreError::backend(format!("document store unreachable: {e}")))
    }

    fn map_status(status: StatusCode, context: &str) -> StoreError {
        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound,
            StatusCode::CONFLICT => StoreError::conflict(context.to_string()),
            other => StoreError::backend(format!("{context}: unexpected status {other}")),
        }
    }
}

fn encode_doc_id(id: &str) -> String {
    id.replace('%', "%25").replace('/', "%2F")
}

#[async_trait]
impl DocumentStore for CouchDocumentStore {
    async fn ensure_database(&self, db: &str) -> Result<(), StoreError> {
        let resp = self
            .send(self.request(reqwest::Method::PUT, self.db_url(db)))
            .await?;
        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => {
                debug!(db, "database created");
                Ok(())
            }
            // Already exists.
            StatusCode::PRECONDITION_FAILED => Ok(()),
            other => Err(StoreError::backend(format!(
                "create database '{db}': unexpected status {other}"
            ))),
        }
    }

    async fn database_exists(&self, db: &str) -> Result<bool, StoreError> {
        let resp = self
            .send(self.request(reqwest::Method::HEAD, self.db_url(db)))
            .await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(StoreError::backend(format!(
                "head database '{db}': unexpected status {other}"
            ))),
        }
    }

    async fn delete_database(&self, db: &str) -> Result<(), StoreError> {
        let resp = self
            .send(self.request(reqwest::Method::DELETE, self.db_url(db)))
            .await?;
        match resp.status() {
            StatusCode::OK => Ok(()),
            other => Err(Self::map_status(other, &format!("delete database '{db}'"))),
        }
    }

    async fn get(&self, db: &str, id: &str) -> Result<Document, StoreError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, self.doc_url(db, id)))
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(Self::map_status(resp.status(), &format!("get '{id}'")));
        }
        resp.json::<Document>()
            .await
            .map_err(|e| StoreError::backend(format!("decode '{id}': {e}")))
    }

    async fn put(&self, db: &str, doc: &Document) -> Result<WriteOk, StoreError> {
        let resp = self
            .send(
                self.request(reqwest::Method::PUT, self.doc_url(db, &doc.id))
                    .json(doc),
            )
            .await?;
        match resp.status() {
            StatusCode::CREATED | StatusCode::OK | StatusCode::ACCEPTED => {
                let body: CouchWriteResponse = resp
                    .json()
                    .await
                    .map_err(|e| StoreError::backend(format!("decode write response: {e}")))?;
                Ok(WriteOk {
                    id: body.id,
                    rev: body.rev,
                })
            }
            other => Err(Self::map_status(
                other,
                &format!("stale revision for '{}'", doc.id),
            )),
        }
    }

    async fn delete(&self, db: &str, id: &str, rev: &str) -> Result<(), StoreError> {
        let url = format!("{}?rev={}", self.doc_url(db, id), rev);
        let resp = self.send(self.request(reqwest::Method::DELETE, url)).await?;
        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            other => Err(Self::map_status(other, &format!("delete '{id}'"))),
        }
    }

    async fn bulk_put(
        &self,
        db: &str,
        docs: &[Document],
    ) -> Result<Vec<BulkEntryResult>, StoreError> {
        let url = format!("{}/_bulk_docs", self.db_url(db));
        let resp = self
            .send(
                self.request(reqwest::Method::POST, url)
                    .json(&json!({ "docs": docs })),
            )
            .await?;
        if resp.status() != StatusCode::CREATED && resp.status() != StatusCode::OK {
            return Err(Self::map_status(resp.status(), "bulk write"));
        }
        let entries: Vec<CouchBulkEntry> = resp
            .json()
            .await
            .map_err(|e| StoreError::backend(format!("decode bulk response: {e}")))?;
        Ok(entries
            .into_iter()
            .map(|e| BulkEntryResult {
                id: e.id,
                rev: e.rev,
                error: e.error,
            })
            .collect())
    }

    async fn find(&self, db: &str, selector: &JsonValue) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/_find", self.db_url(db));
        let resp = self
            .send(
                self.request(reqwest::Method::POST, url)
                    .json(&json!({ "selector": selector })),
            )
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(Self::map_status(resp.status(), "find"));
        }
        let body: CouchFindResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::backend(format!("decode find response: {e}")))?;
        Ok(body.docs)
    }
}
