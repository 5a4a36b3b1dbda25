//! Infrastructure layer: process supervision, serving-process client, tenant
//! directory, configuration and the refresh orchestrator.

pub mod config;
pub mod jobs;
pub mod orchestrator;
pub mod restart;
pub mod supervisor;
pub mod tenant_directory;
pub mod tenant_lock;

mod integration_tests;
#[cfg(test)]
mod test_support;

pub use config::{ConfigError, OrchestratorConfig, RestartPolicy};
pub use orchestrator::{RefreshFailure, RefreshOrchestrator, RefreshOutcome, RefreshSuccess};
pub use restart::{HttpServingProcess, RestartOutcome, RestartSignal, ServingProcess};
pub use tenant_directory::{InMemoryTenantDirectory, TenantDirectory, TenantDirectoryError};
pub use tenant_lock::{TenantJobGuard, TenantJobLocks};
pub use supervisor::{StopReason, Supervisor, SupervisorConfig, SupervisorReport};
