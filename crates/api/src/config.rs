//! Server configuration, resolved once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use tenantsync_infra::{ConfigError, OrchestratorConfig};

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Orchestrator(#[from] ConfigError),

    #[error("invalid BIND_ADDR '{value}': {reason}")]
    BindAddr { value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// HS256 secret for bearer tokens; `None` means the insecure dev default.
    pub jwt_secret: Option<String>,
    /// JSON array of tenant contexts loaded into the tenant directory.
    pub tenants_file: Option<PathBuf>,
    pub orchestrator: OrchestratorConfig,
}

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_addr = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|e| ServerConfigError::BindAddr {
                value: raw_addr.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            bind_addr,
            jwt_secret: non_empty("JWT_SECRET"),
            tenants_file: non_empty("TENANTS_FILE").map(PathBuf::from),
            orchestrator: OrchestratorConfig::from_lookup(&get)?,
        })
    }
}
