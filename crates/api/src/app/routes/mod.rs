use axum::{routing::{get, post}, Router};

pub mod refresh;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/ingest", post(refresh::ingest_own))
        .route("/update", post(refresh::update_own))
        .route("/tenants/:user_id/ingest", post(refresh::ingest_for))
        .route("/tenants/:user_id/update", post(refresh::update_for))
}
