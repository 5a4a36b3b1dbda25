//! Keeps the serving process running across requested restarts.

use anyhow::Context;

use tenantsync_infra::{StopReason, Supervisor, SupervisorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tenantsync_observability::init();

    let config = SupervisorConfig::from_env().context("invalid supervisor configuration")?;
    tracing::info!(
        program = %config.program,
        args = ?config.args,
        working_dir = %config.working_dir.display(),
        "supervising serving process; press Ctrl-C to stop"
    );

    let report = Supervisor::new(config).run().await;
    tracing::info!(
        runs = report.runs,
        restarts = report.restarts,
        last_exit_code = ?report.last_exit_code,
        stop_reason = ?report.stop_reason,
        "supervisor stopped"
    );

    match report.stop_reason {
        StopReason::RestartLimit => anyhow::bail!("serving process restart limit reached"),
        StopReason::CleanExit | StopReason::Shutdown => Ok(()),
    }
}
