use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use vibe_core::{ObjectId, PermissionKey};

use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::{AppContext, IdentityContext};

/// Download URLs are short-lived; clients fetch them per use.
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(300);

const DEFAULT_COLLECTION: &str = "files";

pub fn router() -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/download/:object_id", get(download))
}

pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Extension(app): Extension<AppContext>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut collection = DEFAULT_COLLECTION.to_string();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("malformed multipart body: {e}"),
                )
            }
        };

        if field.name() == Some("collection") {
            match field.text().await {
                Ok(value) if !value.trim().is_empty() => collection = value,
                Ok(_) => {}
                Err(e) => {
                    return errors::json_error(
                        StatusCode::BAD_REQUEST,
                        "bad_request",
                        format!("malformed collection field: {e}"),
                    )
                }
            }
            continue;
        }

        let filename = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        match field.bytes().await {
            Ok(bytes) => file = Some((filename, content_type, bytes.to_vec())),
            Err(e) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("malformed file field: {e}"),
                )
            }
        }
    }

    let Some((filename, content_type, bytes)) = file else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "multipart body carries no file",
        );
    };

    // The collection arrives inside the body, so the capability check runs
    // after parsing but before any store write.
    if let Err(denied) = authz::require_capability(
        &services.capabilities,
        &identity,
        &app,
        PermissionKey::write(&collection),
    )
    .await
    {
        return denied;
    }

    match services
        .blob
        .upload(identity.did(), &collection, &filename, &content_type, bytes)
        .await
    {
        Ok(up) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "objectId": up.object_id,
                "filename": up.filename,
                "contentType": up.content_type,
                "size": up.size,
            })),
        )
            .into_response(),
        Err(e) => errors::core_error_to_response(e.into()),
    }
}

pub async fn download(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Extension(app): Extension<AppContext>,
    Path(object_id): Path<String>,
) -> axum::response::Response {
    let object_id: ObjectId = match object_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "bad_request", "invalid object id")
        }
    };

    // Only the owner's metadata is scanned, so a foreign blob is
    // indistinguishable from an absent one.
    let (key, meta) = match services.blob.find_by_object_id(identity.did(), &object_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "blob not found")
        }
        Err(e) => return errors::core_error_to_response(e.into()),
    };

    if let Err(denied) = authz::require_capability(
        &services.capabilities,
        &identity,
        &app,
        PermissionKey::read(&meta.collection),
    )
    .await
    {
        return denied;
    }

    match services
        .blob
        .presigned_download(identity.did(), &key, DOWNLOAD_URL_TTL)
        .await
    {
        Ok(url) => (StatusCode::OK, Json(serde_json::json!({ "url": url }))).into_response(),
        Err(e) => errors::core_error_to_response(e.into()),
    }
}
