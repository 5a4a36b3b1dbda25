use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier attached to a principal.
///
/// Roles are opaque strings; only the privileged set below is interpreted
/// by the tenant-ownership policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

const PRIVILEGED: &[&str] = &["admin", "superadmin"];

impl Role {
    pub const USER: Role = Role(Cow::Borrowed("user"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Privileged roles may operate on any tenant.
    pub fn is_privileged(&self) -> bool {
        PRIVILEGED
            .iter()
            .any(|p| p.eq_ignore_ascii_case(self.as_str()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
