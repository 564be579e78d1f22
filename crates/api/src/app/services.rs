//! Infrastructure wiring: stores, capability engine, blob and provisioning
//! services. Built once at startup and injected via `Extension`.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::warn;

use vibe_auth::CapabilityStore;
use vibe_blob::{BlobStore, InMemoryObjectStore, ObjectStore, S3ObjectStore};
use vibe_provision::ProvisioningService;
use vibe_store::{
    CouchDocumentStore, DataIsolation, DocumentStore, InMemoryDocumentStore, UserData,
};

use crate::config::Config;

/// Data-plane connection info returned by `/api/v1/authdb`.
#[derive(Debug, Clone)]
pub struct AuthDbInfo {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Process-scoped service singletons shared by all requests.
#[derive(Clone)]
pub struct AppServices {
    pub documents: Arc<dyn DocumentStore>,
    pub capabilities: CapabilityStore,
    pub user_data: UserData,
    pub blob: BlobStore,
    pub provisioning: ProvisioningService,
    pub authdb: Option<AuthDbInfo>,
}

/// Wire the configured backends (in-memory fallbacks when unconfigured),
/// ensure the system database and blob bucket, and seed the bootstrap claim
/// code. Startup fails fast on any of these.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let documents: Arc<dyn DocumentStore> = match &config.couchdb {
        Some(couch) => Arc::new(CouchDocumentStore::new(
            &couch.url,
            &couch.username,
            &couch.password,
        )),
        None => {
            warn!("no document store configured; using in-memory store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let objects: Arc<dyn ObjectStore> = match &config.s3 {
        Some(s3) => {
            let store = S3ObjectStore::for_endpoint(
                &s3.endpoint,
                &s3.region,
                &s3.access_key,
                &s3.secret_key,
                &config.blob_bucket,
            );
            store.ensure_bucket().await.context("ensuring blob bucket")?;
            Arc::new(store)
        }
        None => {
            warn!("no object store configured; using in-memory store");
            Arc::new(InMemoryObjectStore::new())
        }
    };

    let isolation = DataIsolation::new(documents.clone());
    isolation
        .ensure_system_database()
        .await
        .context("ensuring system database")?;

    let capabilities = CapabilityStore::new(documents.clone());
    let user_data = UserData::new(documents.clone());
    let blob = BlobStore::new(objects, documents.clone(), &config.blob_bucket);
    let provisioning = ProvisioningService::new(documents.clone(), isolation, blob.clone());

    if let Some(code) = &config.claim_code {
        provisioning
            .bootstrap_admin_claim_code(code)
            .await
            .context("bootstrapping admin claim code")?;
    }

    let authdb = config.authdb.as_ref().map(|a| AuthDbInfo {
        url: a.url.clone(),
        username: a.username.clone(),
        password: a.password.clone(),
    });

    Ok(AppServices {
        documents,
        capabilities,
        user_data,
        blob,
        provisioning,
        authdb,
    })
}
