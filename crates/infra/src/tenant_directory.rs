//! Tenant context resolution.
//!
//! The directory owns the mapping from user identity to tenant resource
//! handles. The orchestrator only reads from it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use tenantsync_core::{PreconditionError, TenantContext, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenantDirectoryError {
    #[error("no tenant registered for user '{0}'")]
    NotFound(UserId),

    #[error("resource id '{0}' is already owned by another tenant")]
    DuplicateResourceId(String),

    #[error("vector store path '{0}' is already owned by another tenant")]
    DuplicateVectorStorePath(String),

    #[error("tenant directory unavailable: {0}")]
    Unavailable(String),
}

impl From<TenantDirectoryError> for PreconditionError {
    fn from(value: TenantDirectoryError) -> Self {
        match value {
            TenantDirectoryError::NotFound(user) => PreconditionError::TenantNotFound(user.to_string()),
            other => PreconditionError::not_provisioned(other.to_string()),
        }
    }
}

/// Read access to tenant contexts.
#[async_trait]
pub trait TenantDirectory: Send + Sync + 'static {
    async fn resolve(&self, user_id: &UserId) -> Result<TenantContext, TenantDirectoryError>;
}

#[async_trait]
impl<D> TenantDirectory for Arc<D>
where
    D: TenantDirectory + ?Sized,
{
    async fn resolve(&self, user_id: &UserId) -> Result<TenantContext, TenantDirectoryError> {
        (**self).resolve(user_id).await
    }
}

/// In-memory directory for tests/dev.
///
/// Resource ids and vector store paths are exclusive: two users can never
/// point at the same tenant data.
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    inner: RwLock<HashMap<UserId, TenantContext>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the context of `tenant.user_id`.
    pub fn register(&self, tenant: TenantContext) -> Result<(), TenantDirectoryError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| TenantDirectoryError::Unavailable("lock poisoned".to_string()))?;

        for other in map.values().filter(|t| t.user_id != tenant.user_id) {
            if !tenant.resource_id.is_blank() && other.resource_id == tenant.resource_id {
                return Err(TenantDirectoryError::DuplicateResourceId(
                    tenant.resource_id.to_string(),
                ));
            }
            if !tenant.vector_store_path.trim().is_empty()
                && other.vector_store_path == tenant.vector_store_path
            {
                return Err(TenantDirectoryError::DuplicateVectorStorePath(
                    tenant.vector_store_path.clone(),
                ));
            }
        }

        map.insert(tenant.user_id.clone(), tenant);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn resolve(&self, user_id: &UserId) -> Result<TenantContext, TenantDirectoryError> {
        let map = self
            .inner
            .read()
            .map_err(|_| TenantDirectoryError::Unavailable("lock poisoned".to_string()))?;
        map.get(user_id)
            .cloned()
            .ok_or_else(|| TenantDirectoryError::NotFound(user_id.clone()))
    }
}
