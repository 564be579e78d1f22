//! Identity provisioning and cascading deletion.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use vibe_blob::BlobStore;
use vibe_core::Did;
use vibe_store::{DataIsolation, Document, DocumentStore, StoreError, SYSTEM_DB};

use crate::cascade::{CascadeReport, StepOutcome};
use crate::claim::{claim_code_doc_id, ClaimCode, INITIAL_ADMIN};
use crate::error::ProvisionError;

/// One user record per identity, in the system database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_did: Did,
    pub is_admin: bool,
    pub collection: String,
}

/// Document id of the user record for `did`.
pub fn user_doc_id(did: &Did) -> String {
    format!("users/{}", did.as_str())
}

/// Out-of-band lifecycle operations: admin bootstrap, identity creation,
/// cascading deletion. Calls the document store, the isolation scheme, and
/// the blob store; never the HTTP layer.
#[derive(Clone)]
pub struct ProvisioningService {
    store: Arc<dyn DocumentStore>,
    isolation: DataIsolation,
    blob: BlobStore,
}

impl ProvisioningService {
    pub fn new(store: Arc<dyn DocumentStore>, isolation: DataIsolation, blob: BlobStore) -> Self {
        Self {
            store,
            isolation,
            blob,
        }
    }

    /// Idempotent-create of the singleton bootstrap claim code.
    ///
    /// A no-op when the document already exists, even if the configured code
    /// value changed since bootstrap — reconciliation is a known gap, left
    /// unresolved rather than guessed at. Returns whether a code was seeded.
    pub async fn bootstrap_admin_claim_code(
        &self,
        configured_code: &str,
    ) -> Result<bool, ProvisionError> {
        let id = claim_code_doc_id(INITIAL_ADMIN);
        match self.store.get(SYSTEM_DB, &id).await {
            Ok(_) => {
                info!("admin claim code already bootstrapped; configured value ignored");
                return Ok(false);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let code = ClaimCode {
            code: configured_code.to_string(),
            expires_at: None,
            for_did: None,
            spent_at: None,
        };
        let mut body = serde_json::to_value(&code)
            .map_err(|e| StoreError::backend(format!("serialize claim code: {e}")))?;
        body["collection"] = json!("claims");

        match self.store.put(SYSTEM_DB, &Document::new(id, body)).await {
            Ok(_) => {
                info!("admin claim code bootstrapped");
                Ok(true)
            }
            // Lost a race with another bootstrap; same no-op as "exists".
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Spend the bootstrap code and create the first admin identity.
    ///
    /// The code is marked spent (revision-guarded, so concurrent spenders
    /// conflict) before the identity is created.
    pub async fn spend_claim_code(&self, code: &str, did: &Did) -> Result<(), ProvisionError> {
        let id = claim_code_doc_id(INITIAL_ADMIN);
        let doc = match self.store.get(SYSTEM_DB, &id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound) => {
                return Err(ProvisionError::invalid_claim("no claim code exists"))
            }
            Err(e) => return Err(e.into()),
        };

        let mut claim: ClaimCode = serde_json::from_value(doc.body.clone())
            .map_err(|e| StoreError::backend(format!("malformed claim code: {e}")))?;

        if claim.is_spent() {
            return Err(ProvisionError::invalid_claim("code already spent"));
        }
        if claim.is_expired(Utc::now()) {
            return Err(ProvisionError::invalid_claim("code expired"));
        }
        if claim.code != code {
            return Err(ProvisionError::invalid_claim("code mismatch"));
        }
        if let Some(for_did) = &claim.for_did {
            if for_did != did {
                return Err(ProvisionError::invalid_claim("code reserved for another identity"));
            }
        }

        claim.spent_at = Some(Utc::now());
        claim.for_did = Some(did.clone());
        let mut body = serde_json::to_value(&claim)
            .map_err(|e| StoreError::backend(format!("serialize claim code: {e}")))?;
        body["collection"] = json!("claims");

        let rev = doc
            .rev
            .ok_or_else(|| StoreError::backend("claim code document missing revision"))?;
        self.store
            .put(SYSTEM_DB, &Document::with_rev(doc.id, rev, body))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ProvisionError::invalid_claim("code already spent"),
                other => other.into(),
            })?;

        self.create_identity(did, true).await
    }

    /// Create the user record, then provision the per-user database.
    ///
    /// If the database step fails after the record landed, the system is
    /// recoverably inconsistent (record exists, database missing); there is
    /// no automatic rollback.
    pub async fn create_identity(&self, did: &Did, as_admin: bool) -> Result<(), ProvisionError> {
        let record = UserRecord {
            user_did: did.clone(),
            is_admin: as_admin,
            collection: "users".to_string(),
        };
        let body = serde_json::to_value(&record)
            .map_err(|e| StoreError::backend(format!("serialize user record: {e}")))?;

        match self
            .store
            .put(SYSTEM_DB, &Document::new(user_doc_id(did), body))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => return Err(ProvisionError::AlreadyExists),
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.isolation.ensure_user_database(did).await {
            error!(
                did = %did,
                error = %e,
                "user record created but database provisioning failed; \
                 identity left recoverably inconsistent"
            );
            return Err(ProvisionError::PartiallyProvisioned(e.to_string()));
        }

        info!(did = %did, admin = as_admin, "identity provisioned");
        Ok(())
    }

    /// Admin flag for `did`. A missing user record is `false`, not an error.
    pub async fn is_admin(&self, did: &Did) -> Result<bool, ProvisionError> {
        match self.store.get(SYSTEM_DB, &user_doc_id(did)).await {
            Ok(doc) => {
                let record: UserRecord = serde_json::from_value(doc.body)
                    .map_err(|e| StoreError::backend(format!("malformed user record: {e}")))?;
                Ok(record.is_admin)
            }
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Ordered, independently-logged, best-effort deletion cascade.
    ///
    /// Steps: user record → per-user database → app grants → blobs
    /// (object first, metadata only on success). A failing step is recorded
    /// and logged; the remaining steps still run. Not a transaction.
    pub async fn delete_identity(&self, did: &Did) -> CascadeReport {
        let mut report = CascadeReport::new(did.clone());

        report.record("delete_user_record", self.delete_user_record(did).await);
        report.record("destroy_user_database", self.destroy_database(did).await);
        report.record("delete_app_grants", self.delete_app_grants(did).await);
        report.record("delete_blobs", self.delete_blobs(did).await);

        if report.fully_completed() {
            info!(did = %did, "identity deletion cascade completed");
        } else {
            warn!(did = %did, report = ?report, "identity deletion cascade partially failed");
        }
        report
    }

    async fn delete_user_record(&self, did: &Did) -> StepOutcome {
        let id = user_doc_id(did);
        let doc = match self.store.get(SYSTEM_DB, &id).await {
            Ok(doc) => doc,
            Err(StoreError::NotFound) => {
                return StepOutcome::Skipped("user record already absent".to_string())
            }
            Err(e) => {
                warn!(did = %did, error = %e, "cascade: reading user record failed");
                return StepOutcome::Failed(e.to_string());
            }
        };
        let rev = doc.rev.unwrap_or_default();
        match self.store.delete(SYSTEM_DB, &id, &rev).await {
            Ok(()) => StepOutcome::Completed,
            Err(StoreError::NotFound) => {
                StepOutcome::Skipped("user record already absent".to_string())
            }
            Err(e) => {
                warn!(did = %did, error = %e, "cascade: deleting user record failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn destroy_database(&self, did: &Did) -> StepOutcome {
        match self.isolation.destroy_user_database(did).await {
            Ok(()) => StepOutcome::Completed,
            Err(StoreError::NotFound) => {
                StepOutcome::Skipped("database already absent".to_string())
            }
            Err(e) => {
                warn!(did = %did, error = %e, "cascade: destroying database failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn delete_app_grants(&self, did: &Did) -> StepOutcome {
        let prefix = format!("apps/{}/", did.as_str());
        let selector = json!({
            "_id": { "$gte": prefix, "$lt": format!("apps/{}0", did.as_str()) }
        });
        let docs = match self.store.find(SYSTEM_DB, &selector).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(did = %did, error = %e, "cascade: listing app grants failed");
                return StepOutcome::Failed(e.to_string());
            }
        };
        if docs.is_empty() {
            return StepOutcome::Skipped("no app grants".to_string());
        }

        let mut failed = 0usize;
        for doc in &docs {
            let rev = doc.rev.as_deref().unwrap_or_default();
            match self.store.delete(SYSTEM_DB, &doc.id, rev).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => {
                    warn!(grant = %doc.id, error = %e, "cascade: deleting app grant failed");
                    failed += 1;
                }
            }
        }
        if failed == 0 {
            StepOutcome::Completed
        } else {
            StepOutcome::Failed(format!("{failed} of {} grants not deleted", docs.len()))
        }
    }

    async fn delete_blobs(&self, did: &Did) -> StepOutcome {
        match self.blob.purge_owned(did).await {
            Ok(summary) if summary.failed == 0 => {
                if summary.deleted == 0 {
                    StepOutcome::Skipped("no blobs".to_string())
                } else {
                    StepOutcome::Completed
                }
            }
            Ok(summary) => StepOutcome::Failed(format!(
                "{} of {} blobs not deleted",
                summary.failed,
                summary.deleted + summary.failed
            )),
            Err(e) => {
                warn!(did = %did, error = %e, "cascade: blob purge failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}
