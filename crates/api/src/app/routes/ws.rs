//! Realtime endpoint: authorization handshake + upgrade.
//!
//! Browser WebSocket clients cannot set custom headers, so the token and
//! app id arrive as query parameters. The handshake runs the same
//! verification as HTTP (token, instance binding, app id). Authorization is
//! checked once, at handshake; a live connection is not re-checked when
//! grants change — reconnection is the revocation path.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query,
    },
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, info};

use vibe_core::AppId;

use crate::app::errors::json_error;
use crate::context::{AppContext, IdentityContext};
use crate::middleware::{self, AuthState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
    #[serde(rename = "appId")]
    app_id: Option<String>,
}

pub async fn upgrade(
    Extension(state): Extension<AuthState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing token query parameter",
        );
    };
    let identity = match middleware::verify_identity(&state, &token) {
        Ok(identity) => identity,
        Err(rejection) => return rejection,
    };
    let Some(app_id) = params.app_id.filter(|a| !a.is_empty()) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "missing_app_id",
            "missing appId query parameter",
        );
    };
    let app = AppContext::new(AppId::new(app_id));

    ws.on_upgrade(move |socket| session(socket, identity, app))
}

async fn session(mut socket: WebSocket, identity: IdentityContext, app: AppContext) {
    info!(did = %identity.did(), app = %app.app_id(), "realtime connection opened");

    let hello = serde_json::json!({
        "type": "connected",
        "identityDid": identity.did(),
        "appId": app.app_id(),
    });
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    // Message framing belongs to the realtime collaborator; this core only
    // keeps the authorized connection open.
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    debug!(did = %identity.did(), "realtime connection closed");
}
