use std::sync::Arc;

use thiserror::Error;

use tenantsync_core::TenantContext;
use tenantsync_infra::{
    HttpServingProcess, InMemoryTenantDirectory, OrchestratorConfig, RefreshOrchestrator,
    ServingProcess, TenantDirectory, TenantDirectoryError,
    jobs::{JobRunner, ProcessJobRunner},
};

/// Orchestrator behind trait objects so tests can swap any seam.
pub type Orchestrator =
    RefreshOrchestrator<Arc<dyn TenantDirectory>, Arc<dyn JobRunner>, Arc<dyn ServingProcess>>;

pub struct AppServices {
    pub orchestrator: Orchestrator,
}

impl AppServices {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Production services: child-process jobs and the HTTP serving-process client.
pub fn build_services(config: OrchestratorConfig, directory: Arc<dyn TenantDirectory>) -> AppServices {
    let runner: Arc<dyn JobRunner> = Arc::new(ProcessJobRunner::new(
        config.interpreter.clone(),
        config.max_capture_bytes,
    ));
    let serving: Arc<dyn ServingProcess> = Arc::new(HttpServingProcess::from_config(&config));
    AppServices::new(RefreshOrchestrator::new(config, directory, runner, serving))
}

#[derive(Debug, Error)]
pub enum TenantLoadError {
    #[error("tenants file is not a JSON array of tenant contexts: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Conflict(#[from] TenantDirectoryError),
}

/// Build a directory from a JSON array of tenant contexts.
pub fn load_tenants(raw: &str) -> Result<InMemoryTenantDirectory, TenantLoadError> {
    let tenants: Vec<TenantContext> = serde_json::from_str(raw)?;
    let directory = InMemoryTenantDirectory::new();
    for tenant in tenants {
        directory.register(tenant)?;
    }
    Ok(directory)
}
