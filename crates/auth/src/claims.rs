use serde::{Deserialize, Serialize};

use tenantsync_core::UserId;

use crate::{Principal, Role};

/// Bearer-token claims (transport-agnostic).
///
/// Signature verification and expiry checks happen wherever the token is
/// decoded; this is the shape the orchestrator expects afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the caller's user id.
    pub sub: UserId,

    /// Role granted to the caller. Missing roles default to `user`.
    #[serde(default = "default_role")]
    pub role: Role,

    /// Expiration (seconds since the Unix epoch).
    pub exp: u64,
}

fn default_role() -> Role {
    Role::USER
}

impl TokenClaims {
    pub fn into_principal(self) -> Principal {
        Principal::new(self.sub, self.role)
    }
}
