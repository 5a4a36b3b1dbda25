//! Per-tenant advisory job lock.
//!
//! At most one job may write a tenant's derived index at a time. A second
//! request for the same resource id is rejected rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tenantsync_core::ResourceId;

#[derive(Debug, Clone, Default)]
pub struct TenantJobLocks {
    held: Arc<Mutex<HashSet<ResourceId>>>,
}

impl TenantJobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `resource_id`, or `None` if a job already holds it.
    pub fn try_acquire(&self, resource_id: &ResourceId) -> Option<TenantJobGuard> {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        if !held.insert(resource_id.clone()) {
            return None;
        }
        Some(TenantJobGuard {
            held: self.held.clone(),
            resource_id: resource_id.clone(),
        })
    }

    pub fn is_held(&self, resource_id: &ResourceId) -> bool {
        self.held
            .lock()
            .map(|h| h.contains(resource_id))
            .unwrap_or(false)
    }
}

/// Releases the tenant lock on drop.
#[derive(Debug)]
pub struct TenantJobGuard {
    held: Arc<Mutex<HashSet<ResourceId>>>,
    resource_id: ResourceId,
}

impl Drop for TenantJobGuard {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        held.remove(&self.resource_id);
    }
}
