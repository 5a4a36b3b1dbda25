use serde::{Deserialize, Serialize};

use tenantsync_core::UserId;

use crate::Role;

/// An authenticated caller.
///
/// Construction is left to the transport layer (token validation, sessions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::USER)
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::ADMIN)
    }
}
