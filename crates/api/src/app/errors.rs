use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use vibe_core::CoreError;

/// Map the shared error taxonomy onto HTTP in exactly one place.
///
/// Internal failures are logged in full server-side and reported generically
/// to the caller.
pub fn core_error_to_response(err: CoreError) -> axum::response::Response {
    match err {
        CoreError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
        }
        CoreError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        CoreError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        CoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        CoreError::ServiceUnavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
