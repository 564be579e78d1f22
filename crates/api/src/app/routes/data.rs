use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use vibe_core::PermissionKey;
use vibe_store::BulkStatus;

use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::{AppContext, IdentityContext};

pub fn router() -> Router {
    Router::new()
        .route("/read", post(read))
        .route("/write", post(write))
}

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    collection: String,
    #[serde(default)]
    filter: JsonValue,
}

pub async fn read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Extension(app): Extension<AppContext>,
    Json(body): Json<ReadRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require_capability(
        &services.capabilities,
        &identity,
        &app,
        PermissionKey::read(&body.collection),
    )
    .await
    {
        return denied;
    }

    match services
        .user_data
        .read(identity.user_db(), &body.collection, &body.filter)
        .await
    {
        Ok(docs) => (StatusCode::OK, Json(serde_json::json!({ "docs": docs }))).into_response(),
        Err(e) => errors::core_error_to_response(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    collection: String,
    /// A single document (object) or a batch (array of objects).
    data: JsonValue,
}

pub async fn write(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Extension(app): Extension<AppContext>,
    Json(body): Json<WriteRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require_capability(
        &services.capabilities,
        &identity,
        &app,
        PermissionKey::write(&body.collection),
    )
    .await
    {
        return denied;
    }

    match body.data {
        JsonValue::Array(items) => {
            if items.iter().any(|item| !item.is_object()) {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    "every batch entry must be a JSON object",
                );
            }
            match services
                .user_data
                .write_bulk(identity.user_db(), &body.collection, items)
                .await
            {
                Ok(outcome) => {
                    // Batches with any failing entry report 207, not 200.
                    let status = match outcome.status {
                        BulkStatus::AllOk => StatusCode::OK,
                        BulkStatus::Partial => StatusCode::MULTI_STATUS,
                    };
                    (status, Json(outcome)).into_response()
                }
                Err(e) => errors::core_error_to_response(e.into()),
            }
        }
        data @ JsonValue::Object(_) => {
            match services
                .user_data
                .write_one(identity.user_db(), &body.collection, data)
                .await
            {
                Ok(ok) => (
                    StatusCode::OK,
                    Json(serde_json::json!({ "id": ok.id, "rev": ok.rev, "ok": true })),
                )
                    .into_response(),
                Err(e) => errors::core_error_to_response(e.into()),
            }
        }
        _ => errors::json_error(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "data must be a JSON object or an array of objects",
        ),
    }
}
