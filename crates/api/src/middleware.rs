//! Request authorization funnel, steps 1–3.
//!
//! Order is significant and reports the most specific applicable cause:
//! token signature+expiry (401), then instance binding (403, or 503 when no
//! identity is bound), then application-id presence on data/blob routes
//! (400). The capability check (step 4) lives in [`crate::authz`] because
//! the collection name rides in the request body.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use vibe_auth::{Hs256TokenCodec, TokenError};
use vibe_core::{AppId, Did};
use vibe_store::user_db_name;

use crate::app::errors::json_error;
use crate::context::{AppContext, IdentityContext};

/// Header carrying the calling application's id on data/blob routes.
pub const APP_ID_HEADER: &str = "x-vibe-app-id";

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<Hs256TokenCodec>,
    pub instance_did: Option<Did>,
}

pub async fn identity_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?;
    let identity = verify_identity(&state, token)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

pub async fn app_id_middleware(
    mut req: axum::http::Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let app = extract_app_id(req.headers())?;
    req.extensions_mut().insert(app);
    Ok(next.run(req).await)
}

/// Steps 1–2, shared between HTTP middleware and the WS handshake: verify
/// the token, then check it names the instance's bound identity.
pub fn verify_identity(state: &AuthState, token: &str) -> Result<IdentityContext, Response> {
    let claims = state.codec.verify(token).map_err(|e| match e {
        TokenError::Expired => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "token has expired",
        ),
        TokenError::Invalid(_) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "invalid token")
        }
    })?;

    let Some(bound) = &state.instance_did else {
        // Fail closed: an unbound instance serves nobody.
        return Err(json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "no_bound_identity",
            "this instance has no bound identity",
        ));
    };
    if claims.identity_did != *bound {
        return Err(json_error(
            StatusCode::FORBIDDEN,
            "identity_mismatch",
            "token identity does not match this instance",
        ));
    }

    let user_db = user_db_name(&claims.identity_did);
    Ok(IdentityContext::new(claims.identity_did, user_db))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let unauthenticated =
        || json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing or malformed bearer token");

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(unauthenticated)?;
    let header = header.to_str().map_err(|_| unauthenticated())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(unauthenticated)?.trim();
    if token.is_empty() {
        return Err(unauthenticated());
    }
    Ok(token)
}

fn extract_app_id(headers: &HeaderMap) -> Result<AppContext, Response> {
    let bad_request = || {
        json_error(
            StatusCode::BAD_REQUEST,
            "missing_app_id",
            format!("header '{APP_ID_HEADER}' is required on data and blob routes"),
        )
    };

    let header = headers.get(APP_ID_HEADER).ok_or_else(bad_request)?;
    let value = header.to_str().map_err(|_| bad_request())?.trim();
    if value.is_empty() {
        return Err(bad_request());
    }
    Ok(AppContext::new(AppId::new(value)))
}
