//! Content-refresh endpoints.
//!
//! Jobs run inside the request: the response is sent once the job finished
//! and the serving process was restarted (or the wait timed out).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    response::Response,
};

use tenantsync_core::JobKind;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub async fn ingest_own(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<PrincipalContext>,
    body: Bytes,
) -> Response {
    refresh(&services, &caller, None, JobKind::Ingestion, &body).await
}

pub async fn update_own(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<PrincipalContext>,
    body: Bytes,
) -> Response {
    refresh(&services, &caller, None, JobKind::Update, &body).await
}

pub async fn ingest_for(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Response {
    refresh(&services, &caller, Some(&user_id), JobKind::Ingestion, &body).await
}

pub async fn update_for(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Response {
    refresh(&services, &caller, Some(&user_id), JobKind::Update, &body).await
}

async fn refresh(
    services: &AppServices,
    caller: &PrincipalContext,
    path_user: Option<&str>,
    kind: JobKind,
    body: &Bytes,
) -> Response {
    let target = match authz::resolve_target(caller, path_user) {
        Ok(target) => target,
        Err(e) => return errors::precondition_to_response(e),
    };
    let request = match dto::parse_refresh_request(body) {
        Ok(request) => request,
        Err(e) => return errors::precondition_to_response(e),
    };

    let orchestrator = &services.orchestrator;
    let result = match kind {
        JobKind::Ingestion => {
            orchestrator
                .run_ingestion(caller.principal(), &target, &request)
                .await
        }
        JobKind::Update => {
            orchestrator
                .run_update(caller.principal(), &target, &request)
                .await
        }
    };

    match result {
        Ok(outcome) => errors::outcome_to_response(outcome),
        Err(e) => errors::precondition_to_response(e),
    }
}
