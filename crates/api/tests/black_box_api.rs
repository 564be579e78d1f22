use std::sync::Arc;

use chrono::Duration;
use reqwest::StatusCode;
use serde_json::json;

use vibe_api::app::services::{build_services, AppServices};
use vibe_api::app::build_router;
use vibe_api::config::{AuthDbConfig, Config};
use vibe_auth::{grant_doc_id, Hs256TokenCodec};
use vibe_core::{AppId, Did};
use vibe_store::{Document, SYSTEM_DB};

const JWT_SECRET: &str = "test-secret";
const ISSUER: &str = "vibe-cloud-test";
const APP: &str = "notes-app";

fn alice() -> Did {
    Did::from_encoded("did:vibe:zalice".to_string())
}

fn bob() -> Did {
    Did::from_encoded("did:vibe:zbob".to_string())
}

fn mint(did: &Did) -> String {
    Hs256TokenCodec::new(JWT_SECRET.as_bytes(), ISSUER)
        .mint(did, Duration::minutes(10))
        .unwrap()
}

fn test_config(instance: Option<Did>) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_issuer: ISSUER.to_string(),
        instance_did: instance,
        couchdb: None,
        s3: None,
        blob_bucket: "vibe-blobs".to_string(),
        authdb: Some(AuthDbConfig {
            url: "http://db.example.test".to_string(),
            username: "data-plane".to_string(),
            password: "data-plane-pw".to_string(),
        }),
        claim_code: None,
    }
}

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(config: Config) -> Self {
        let services = Arc::new(build_services(&config).await.unwrap());
        let app = build_router(&config, services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    /// Spawn an instance bound to alice with her identity provisioned and
    /// the given grants for the test app.
    async fn spawn_for_alice(grants: serde_json::Value) -> Self {
        let srv = Self::spawn(test_config(Some(alice()))).await;
        srv.services
            .provisioning
            .create_identity(&alice(), true)
            .await
            .unwrap();
        srv.services
            .documents
            .put(
                SYSTEM_DB,
                &Document::new(
                    grant_doc_id(&alice(), &AppId::new(APP)),
                    json!({
                        "userDid": alice(),
                        "appId": APP,
                        "grants": grants,
                        "collection": "apps",
                    }),
                ),
            )
            .await
            .unwrap();
        srv
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(test_config(Some(alice()))).await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_invalid_and_expired_tokens_are_unauthenticated() {
    let srv = TestServer::spawn(test_config(Some(alice()))).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/data/read", srv.base_url);

    let res = client.post(&url).json(&json!({"collection": "notes"})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(&url)
        .bearer_auth("not-a-jwt")
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Minted well past expiry (beyond the decoder's leeway).
    let expired = Hs256TokenCodec::new(JWT_SECRET.as_bytes(), ISSUER)
        .mint(&alice(), Duration::seconds(-120))
        .unwrap();
    let res = client
        .post(&url)
        .bearer_auth(expired)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Valid shape, wrong secret.
    let forged = Hs256TokenCodec::new(b"other-secret", ISSUER)
        .mint(&alice(), Duration::minutes(10))
        .unwrap();
    let res = client
        .post(&url)
        .bearer_auth(forged)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_identity_is_forbidden() {
    // Instance bound to alice; a valid token for bob must be rejected on
    // every data route.
    let srv = TestServer::spawn(test_config(Some(alice()))).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(mint(&bob()))
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unbound_instance_fails_closed() {
    let srv = TestServer::spawn(test_config(None)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(mint(&alice()))
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn app_id_header_is_required_on_data_routes_only() {
    let srv = TestServer::spawn_for_alice(json!({})).await;
    let client = reqwest::Client::new();
    let token = mint(&alice());

    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // /authdb is authenticated but app-agnostic.
    let res = client
        .get(format!("{}/api/v1/authdb", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn capability_denial_names_the_key() {
    let srv = TestServer::spawn_for_alice(json!({})).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/data/write", srv.base_url))
        .bearer_auth(mint(&alice()))
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": {"text": "hi"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("write:notes"));
}

#[tokio::test]
async fn ask_grant_denies_automated_requests() {
    let srv = TestServer::spawn_for_alice(json!({"read:notes": "ask"})).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(mint(&alice()))
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn data_write_then_read_roundtrip() {
    let srv = TestServer::spawn_for_alice(json!({
        "read:notes": "always",
        "write:notes": "always",
    }))
    .await;
    let client = reqwest::Client::new();
    let token = mint(&alice());

    let res = client
        .post(format!("{}/api/v1/data/write", srv.base_url))
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": {"_id": "n1", "text": "hello"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let written: serde_json::Value = res.json().await.unwrap();
    assert_eq!(written["id"], "notes/n1");
    assert_eq!(written["ok"], true);
    assert!(written["rev"].as_str().unwrap().starts_with('1'));

    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "filter": {"text": "hello"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let docs = body["docs"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["_id"], "notes/n1");
    assert_eq!(docs[0]["text"], "hello");
}

#[tokio::test]
async fn stale_single_write_conflicts() {
    let srv = TestServer::spawn_for_alice(json!({"write:notes": "always"})).await;
    let client = reqwest::Client::new();
    let token = mint(&alice());
    let url = format!("{}/api/v1/data/write", srv.base_url);

    let res = client
        .post(&url)
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": {"_id": "n1", "text": "v1"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Update without the current revision.
    let res = client
        .post(&url)
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": {"_id": "n1", "text": "v2"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bulk_write_with_one_stale_entry_is_partial() {
    let srv = TestServer::spawn_for_alice(json!({
        "read:notes": "always",
        "write:notes": "always",
    }))
    .await;
    let client = reqwest::Client::new();
    let token = mint(&alice());
    let write_url = format!("{}/api/v1/data/write", srv.base_url);

    // Seed three documents in one all-ok batch.
    let res = client
        .post(&write_url)
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": [
            {"_id": "a", "text": "1"},
            {"_id": "b", "text": "1"},
            {"_id": "c", "text": "1"},
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let seeded: serde_json::Value = res.json().await.unwrap();
    assert_eq!(seeded["status"], "all_ok");
    let revs: Vec<String> = seeded["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rev"].as_str().unwrap().to_string())
        .collect();

    // Update all three; the middle entry carries a stale revision.
    let res = client
        .post(&write_url)
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "data": [
            {"_id": "a", "_rev": revs[0], "text": "2"},
            {"_id": "b", "_rev": "1-bogus", "text": "2"},
            {"_id": "c", "_rev": revs[2], "text": "2"},
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "partial");
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let errored: Vec<&serde_json::Value> =
        results.iter().filter(|r| r.get("error").is_some()).collect();
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0]["id"], "notes/b");

    // Siblings persisted despite the stale middle entry.
    let res = client
        .post(format!("{}/api/v1/data/read", srv.base_url))
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .json(&json!({"collection": "notes", "filter": {"text": "2"}}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["docs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn blob_upload_then_download() {
    let srv = TestServer::spawn_for_alice(json!({
        "read:avatars": "always",
        "write:avatars": "always",
    }))
    .await;
    let client = reqwest::Client::new();
    let token = mint(&alice());

    let form = reqwest::multipart::Form::new()
        .text("collection", "avatars")
        .part(
            "file",
            reqwest::multipart::Part::bytes(vec![1u8, 2, 3])
                .file_name("me.png")
                .mime_str("image/png")
                .unwrap(),
        );
    let res = client
        .post(format!("{}/api/v1/blob/upload", srv.base_url))
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let uploaded: serde_json::Value = res.json().await.unwrap();
    assert_eq!(uploaded["filename"], "me.png");
    assert_eq!(uploaded["contentType"], "image/png");
    assert_eq!(uploaded["size"], 3);
    let object_id = uploaded["objectId"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/v1/blob/download/{object_id}", srv.base_url))
        .bearer_auth(&token)
        .header("X-Vibe-App-ID", APP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(!body["url"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn blob_download_of_unknown_object_is_not_found() {
    let srv = TestServer::spawn_for_alice(json!({"read:avatars": "always"})).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{}/api/v1/blob/download/{}",
            srv.base_url,
            uuid::Uuid::now_v7()
        ))
        .bearer_auth(mint(&alice()))
        .header("X-Vibe-App-ID", APP)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authdb_returns_data_plane_credentials() {
    let srv = TestServer::spawn_for_alice(json!({})).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/authdb", srv.base_url))
        .bearer_auth(mint(&alice()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "data-plane");
    assert_eq!(body["password"], "data-plane-pw");
    // The URL points at the caller's own database.
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("http://db.example.test/vibe-userdata-"));
}

#[tokio::test]
async fn authdb_without_data_plane_config_is_unavailable() {
    let mut config = test_config(Some(alice()));
    config.authdb = None;
    let srv = TestServer::spawn(config).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/v1/authdb", srv.base_url))
        .bearer_auth(mint(&alice()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn ws_handshake_enforces_token_and_app_id() {
    let srv = TestServer::spawn_for_alice(json!({})).await;
    let client = reqwest::Client::new();

    let ws_headers = |req: reqwest::RequestBuilder| {
        req.header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
    };

    // Missing token: rejected before upgrade.
    let res = ws_headers(client.get(format!("{}/ws?appId={APP}", srv.base_url)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Foreign identity: same contract as HTTP.
    let res = ws_headers(client.get(format!(
        "{}/ws?token={}&appId={APP}",
        srv.base_url,
        mint(&bob())
    )))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Valid token, missing appId.
    let res = ws_headers(client.get(format!(
        "{}/ws?token={}",
        srv.base_url,
        mint(&alice())
    )))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Fully valid handshake upgrades.
    let res = ws_headers(client.get(format!(
        "{}/ws?token={}&appId={APP}",
        srv.base_url,
        mint(&alice())
    )))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::SWITCHING_PROTOCOLS);
}
