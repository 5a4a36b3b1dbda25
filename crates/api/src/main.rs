use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use tenantsync_api::app::{build_app, services};
use tenantsync_api::config::ServerConfig;
use tenantsync_infra::InMemoryTenantDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantsync_observability::init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let jwt_secret = config.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    if config.orchestrator.service_secret.is_none() {
        tracing::warn!("BOT_SERVICE_SECRET not set; the serving process will not be restarted after jobs");
    }

    let directory = load_directory(config.tenants_file.as_deref())?;
    let services = Arc::new(services::build_services(
        config.orchestrator.clone(),
        Arc::new(directory),
    ));
    let app = build_app(jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        bot_base_url = %config.orchestrator.bot_base_url,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn load_directory(path: Option<&Path>) -> anyhow::Result<InMemoryTenantDirectory> {
    let Some(path) = path else {
        tracing::warn!("TENANTS_FILE not set; tenant directory is empty");
        return Ok(InMemoryTenantDirectory::new());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tenants file {}", path.display()))?;
    let directory = services::load_tenants(&raw)
        .with_context(|| format!("failed to load tenants from {}", path.display()))?;

    tracing::info!(tenants = directory.len(), "tenant directory loaded");
    Ok(directory)
}
