use thiserror::Error;

use tenantsync_core::{PreconditionError, UserId};

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch: '{caller}' may not operate on tenant of '{target}'")]
    TenantMismatch { caller: UserId, target: UserId },
}

impl From<AuthzError> for PreconditionError {
    fn from(err: AuthzError) -> Self {
        PreconditionError::Forbidden(err.to_string())
    }
}

/// Check that `principal` may operate on the tenant owned by `target`.
///
/// - No IO
/// - No panics
/// - Privileged roles may target any tenant; everyone else only their own.
pub fn authorize_tenant_access(principal: &Principal, target: &UserId) -> Result<(), AuthzError> {
    if principal.role.is_privileged() || principal.user_id == *target {
        return Ok(());
    }

    Err(AuthzError::TenantMismatch {
        caller: principal.user_id.clone(),
        target: target.clone(),
    })
}
