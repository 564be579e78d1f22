//! Per-(user, app, action) capability lookup.
//!
//! Grant documents are written by the external consent flow; this module only
//! enforces them. `ask` denies automated checks — prompting is not this
//! core's job.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use vibe_core::{AppId, Did, PermissionKey};
use vibe_store::{DocumentStore, StoreError, SYSTEM_DB};

/// Tri-state grant setting. Only `always` allows an automated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantSetting {
    Always,
    Ask,
    Never,
}

/// One grant document: the settings a user has chosen for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppGrant {
    pub user_did: Did,
    pub app_id: AppId,
    #[serde(default)]
    pub grants: HashMap<PermissionKey, GrantSetting>,
}

/// Document id of the grant record for `(user, app)`.
pub fn grant_doc_id(user: &Did, app: &AppId) -> String {
    format!("apps/{}/{}", user.as_str(), app.as_str())
}

/// Capability lookups against the system database.
///
/// Decisions are never cached across requests: grants mutate out-of-band, so
/// every check re-reads the store.
#[derive(Clone)]
pub struct CapabilityStore {
    store: Arc<dyn DocumentStore>,
}

impl CapabilityStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// True iff a grant document exists for `(user, app)` and maps `key` to
    /// `always`. Absent document, absent key, `ask`, and `never` all deny.
    pub async fn can_act(
        &self,
        user: &Did,
        app: &AppId,
        key: &PermissionKey,
    ) -> Result<bool, StoreError> {
        let doc = match self.store.get(SYSTEM_DB, &grant_doc_id(user, app)).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound) => {
                debug!(user = %user, app = %app, "no grant document; denying");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let grant: AppGrant = serde_json::from_value(doc.body)
            .map_err(|e| StoreError::backend(format!("malformed grant document: {e}")))?;

        Ok(grant.grants.get(key) == Some(&GrantSetting::Always))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vibe_store::{Document, InMemoryDocumentStore};

    fn user() -> Did {
        Did::from_encoded("did:vibe:zuser".to_string())
    }

    fn app() -> AppId {
        AppId::new("notes-app")
    }

    async fn store_with_grants(grants: serde_json::Value) -> CapabilityStore {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.ensure_database(SYSTEM_DB).await.unwrap();
        store
            .put(
                SYSTEM_DB,
                &Document::new(
                    grant_doc_id(&user(), &app()),
                    json!({
                        "userDid": user(),
                        "appId": app(),
                        "grants": grants,
                        "collection": "apps",
                    }),
                ),
            )
            .await
            .unwrap();
        CapabilityStore::new(store)
    }

    #[tokio::test]
    async fn missing_grant_document_denies() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.ensure_database(SYSTEM_DB).await.unwrap();
        let caps = CapabilityStore::new(store);
        assert!(!caps
            .can_act(&user(), &app(), &PermissionKey::read("notes"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn always_allows() {
        let caps = store_with_grants(json!({"read:notes": "always"})).await;
        assert!(caps
            .can_act(&user(), &app(), &PermissionKey::read("notes"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn ask_denies_automated_checks() {
        let caps = store_with_grants(json!({"read:notes": "ask"})).await;
        assert!(!caps
            .can_act(&user(), &app(), &PermissionKey::read("notes"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn never_and_absent_key_deny() {
        let caps = store_with_grants(json!({"write:notes": "never"})).await;
        assert!(!caps
            .can_act(&user(), &app(), &PermissionKey::write("notes"))
            .await
            .unwrap());
        assert!(!caps
            .can_act(&user(), &app(), &PermissionKey::read("tasks"))
            .await
            .unwrap());
    }
}
