use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto::WhoAmIResponse;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(WhoAmIResponse::from(&principal))
}
