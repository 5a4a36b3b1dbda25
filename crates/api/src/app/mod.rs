//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: orchestrator wiring and tenant directory loading
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request parsing
//! - `errors.rs`: consistent error and result responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(jwt_secret: String, services: Arc<AppServices>) -> Router {
    let verifier = Arc::new(middleware::Hs256Verifier::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { verifier };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_log)))
}
