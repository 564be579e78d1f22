//! Capability enforcement at the handler boundary (funnel step 4).
//!
//! Every data/blob handler calls [`require_capability`] with the permission
//! key derived from its verb and the request's collection, right before it
//! touches a store. Handlers never hand-roll authorization; denials are
//! produced here, naming the specific key.

use axum::http::StatusCode;
use axum::response::Response;
use tracing::error;

use vibe_auth::CapabilityStore;
use vibe_core::PermissionKey;

use crate::app::errors::json_error;
use crate::context::{AppContext, IdentityContext};

pub async fn require_capability(
    capabilities: &CapabilityStore,
    identity: &IdentityContext,
    app: &AppContext,
    key: PermissionKey,
) -> Result<(), Response> {
    match capabilities.can_act(identity.did(), app.app_id(), &key).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(json_error(
            StatusCode::FORBIDDEN,
            "capability_denied",
            format!("permission '{key}' is not granted to this application"),
        )),
        Err(e) => {
            error!(error = %e, key = %key, "capability lookup failed");
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "internal error",
            ))
        }
    }
}
