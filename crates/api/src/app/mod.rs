//! HTTP application wiring (axum router + service singletons).
//!
//! - `services.rs`: infrastructure wiring (document/object stores, capability
//!   engine, provisioning)
//! - `routes/`: handlers, one file per surface area
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::config::Config;
use crate::middleware::{self, AuthState};

pub mod errors;
pub mod routes;
pub mod services;

/// Build router and services from configuration (entrypoint for `main.rs`).
pub async fn build_app(config: Config) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(&config).await?);
    Ok(build_router(&config, services))
}

/// Router over pre-built services. The black-box tests seed state through
/// the same services they then exercise over HTTP.
pub fn build_router(config: &Config, services: Arc<services::AppServices>) -> Router {
    let codec = Arc::new(vibe_auth::Hs256TokenCodec::new(
        config.jwt_secret.as_bytes(),
        config.jwt_issuer.clone(),
    ));
    let auth_state = AuthState {
        codec,
        instance_did: config.instance_did.clone(),
    };

    // Data/blob routes additionally require the app-id header; layering
    // keeps the funnel order (identity first, then app id).
    let data_blob = Router::new()
        .nest("/data", routes::data::router())
        .nest("/blob", routes::blob::router())
        .layer(axum::middleware::from_fn(middleware::app_id_middleware));

    let protected = Router::new()
        .merge(data_blob)
        .route("/authdb", get(routes::system::authdb))
        .layer(axum::middleware::from_fn_with_state(
            auth_state.clone(),
            middleware::identity_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/ws", get(routes::ws::upgrade))
        .nest("/api/v1", protected)
        .layer(Extension(services))
        .layer(Extension(auth_state))
}
