use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::{errors, services::AppServices};
use crate::context::IdentityContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Hand the authenticated owner direct data-plane credentials for their
/// database. 503 when the deployment carries no data-plane block.
pub async fn authdb(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
) -> axum::response::Response {
    let Some(info) = &services.authdb else {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "no data-plane credentials configured",
        );
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "url": format!("{}/{}", info.url.trim_end_matches('/'), identity.user_db()),
            "username": info.username,
            "password": info.password,
        })),
    )
        .into_response()
}
