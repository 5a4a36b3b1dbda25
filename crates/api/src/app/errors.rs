use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tenantsync_core::PreconditionError;
use tenantsync_infra::RefreshOutcome;

pub fn precondition_to_response(err: PreconditionError) -> axum::response::Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::info!(status = status.as_u16(), code = err.code(), error = %err, "refresh request rejected");
    json_error(status, err.code(), err.to_string())
}

/// Job ran: 200 on success, 500 with the failure details otherwise.
pub fn outcome_to_response(outcome: RefreshOutcome) -> axum::response::Response {
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, axum::Json(outcome)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
            "code": code,
        })),
    )
        .into_response()
}
