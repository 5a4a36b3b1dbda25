//! API-side tenant guard.
//!
//! Rejects cross-tenant requests at the HTTP boundary, before any work is
//! scheduled. The orchestrator repeats the same check on its own.

use tenantsync_auth::authorize_tenant_access;
use tenantsync_core::{PreconditionError, UserId};

use crate::context::PrincipalContext;

/// Tenant targeted by a request: the path user when given, else the caller.
pub fn resolve_target(
    caller: &PrincipalContext,
    path_user: Option<&str>,
) -> Result<UserId, PreconditionError> {
    let target = match path_user.map(str::trim) {
        Some("") => return Err(PreconditionError::invalid_request("user id must not be empty")),
        Some(user) => UserId::new(user),
        None => caller.user_id().clone(),
    };

    authorize_tenant_access(caller.principal(), &target)?;
    Ok(target)
}
