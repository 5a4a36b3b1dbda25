use serde::{Deserialize, Serialize};

use crate::error::{PreconditionError, PreconditionResult};
use crate::id::{ResourceId, UserId};

/// Resolved resource handles of one tenant.
///
/// Read-only to the orchestrator: the tenant directory owns and mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub user_id: UserId,
    pub resource_id: ResourceId,
    /// Storage path of the tenant's derived index (exclusively owned).
    pub vector_store_path: String,
    /// Connection string of the tenant database, if provisioned.
    pub database_uri: Option<String>,
}

impl TenantContext {
    pub fn new(
        user_id: impl Into<UserId>,
        resource_id: impl Into<ResourceId>,
        vector_store_path: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            vector_store_path: vector_store_path.into(),
            database_uri: None,
        }
    }

    pub fn with_database_uri(mut self, uri: impl Into<String>) -> Self {
        self.database_uri = Some(uri.into());
        self
    }

    /// Check that the tenant may have a job launched against it.
    ///
    /// Both the resource id and the vector store path must be non-empty.
    pub fn ensure_provisioned(&self) -> PreconditionResult<()> {
        let mut missing = Vec::new();
        if self.resource_id.is_blank() {
            missing.push("resource_id");
        }
        if self.vector_store_path.trim().is_empty() {
            missing.push("vector_store_path");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PreconditionError::not_provisioned(format!(
                "user '{}' is missing {}",
                self.user_id,
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioned_tenant_passes() {
        let t = TenantContext::new("u1", "t1", "/data/t1");
        assert!(t.ensure_provisioned().is_ok());
    }

    #[test]
    fn empty_vector_store_path_is_rejected() {
        let t = TenantContext::new("u1", "t1", "");
        let err = t.ensure_provisioned().unwrap_err();
        assert!(matches!(err, PreconditionError::TenantNotProvisioned(ref m) if m.contains("vector_store_path")));
    }

    #[test]
    fn both_missing_handles_are_reported() {
        let t = TenantContext::new("u1", " ", "  ");
        let err = t.ensure_provisioned().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("resource_id"));
        assert!(msg.contains("vector_store_path"));
    }

    #[test]
    fn database_uri_is_optional_in_json() {
        let t: TenantContext = serde_json::from_str(
            r#"{"user_id": "u1", "resource_id": "t1", "vector_store_path": "/data/t1"}"#,
        )
        .unwrap();
        assert_eq!(t, TenantContext::new("u1", "t1", "/data/t1"));
    }
}
