//! Serving-process supervisor.
//!
//! Keeps the serving process alive across requested restarts: the process
//! exits with status 1 when asked to reload, and the supervisor starts it
//! again. Status 0 is a clean shutdown and ends supervision.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::time::sleep;

use crate::config::ConfigError;

/// Environment flag telling the serving process it runs under supervision.
pub const AUTO_RESTART_ENV: &str = "BOT_AUTO_RESTART";

/// Exit status the serving process uses for a requested restart.
pub const REQUESTED_RESTART_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Pause before every restart.
    pub restart_pause: Duration,
    /// Additional pause after an unexpected exit.
    pub crash_pause: Duration,
    /// Pause after the process could not be started or awaited.
    pub spawn_retry: Duration,
    /// Stop after this many restarts (`None` = forever).
    pub max_restarts: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["bot/app.py".to_string()],
            working_dir: PathBuf::from("."),
            restart_pause: Duration::from_secs(2),
            crash_pause: Duration::from_secs(3),
            spawn_retry: Duration::from_secs(10),
            max_restarts: None,
        }
    }
}

impl SupervisorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `BOT_COMMAND`, `BOT_ARGS` (whitespace separated), `BOT_WORKDIR`,
    /// `SUPERVISOR_MAX_RESTARTS`.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let trimmed = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(program) = trimmed("BOT_COMMAND") {
            cfg.program = program;
        }
        if let Some(args) = get("BOT_ARGS") {
            cfg.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = trimmed("BOT_WORKDIR") {
            cfg.working_dir = PathBuf::from(dir);
        }
        if let Some(raw) = trimmed("SUPERVISOR_MAX_RESTARTS") {
            let n = raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "SUPERVISOR_MAX_RESTARTS",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            cfg.max_restarts = Some(n);
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The process exited with status 0.
    CleanExit,
    /// A shutdown signal was received; the child was killed.
    Shutdown,
    RestartLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorReport {
    /// Processes successfully started.
    pub runs: u32,
    pub restarts: u32,
    pub last_exit_code: Option<i32>,
    pub stop_reason: StopReason,
}

pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Supervise until clean exit, restart limit or Ctrl-C.
    pub async fn run(&self) -> SupervisorReport {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c; supervising without it");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Supervise until clean exit, restart limit or `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> SupervisorReport
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let cfg = &self.config;
        let mut runs = 0u32;
        let mut restarts = 0u32;
        let mut last_exit_code = None;

        let report = |runs, restarts, last_exit_code, stop_reason| SupervisorReport {
            runs,
            restarts,
            last_exit_code,
            stop_reason,
        };

        loop {
            if runs > 0 || restarts > 0 {
                tracing::info!(restart = restarts, "restarting serving process");
                if interrupted(cfg.restart_pause, shutdown.as_mut()).await {
                    return report(runs, restarts, last_exit_code, StopReason::Shutdown);
                }
            }

            let mut child = match self.command().spawn() {
                Ok(child) => child,
                Err(e) => {
                    tracing::error!(
                        program = %cfg.program,
                        error = %e,
                        retry_in_ms = cfg.spawn_retry.as_millis() as u64,
                        "failed to start serving process"
                    );
                    if self.limit_reached(restarts) {
                        return report(runs, restarts, last_exit_code, StopReason::RestartLimit);
                    }
                    restarts += 1;
                    if interrupted(cfg.spawn_retry, shutdown.as_mut()).await {
                        return report(runs, restarts, last_exit_code, StopReason::Shutdown);
                    }
                    continue;
                }
            };
            runs += 1;
            tracing::info!(program = %cfg.program, pid = ?child.id(), run = runs, "serving process started");

            let status = tokio::select! {
                status = child.wait() => status,
                _ = shutdown.as_mut() => {
                    tracing::info!("shutdown requested; stopping serving process");
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill serving process");
                    }
                    return report(runs, restarts, last_exit_code, StopReason::Shutdown);
                }
            };

            let crashed = match status {
                Ok(status) => {
                    last_exit_code = status.code();
                    if status.success() {
                        tracing::info!("serving process exited cleanly; supervision finished");
                        return report(runs, restarts, last_exit_code, StopReason::CleanExit);
                    }
                    let requested = status.code() == Some(REQUESTED_RESTART_CODE);
                    tracing::info!(exit_code = ?status.code(), requested, "serving process exited");
                    !requested
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed waiting on serving process");
                    if interrupted(cfg.spawn_retry, shutdown.as_mut()).await {
                        return report(runs, restarts, last_exit_code, StopReason::Shutdown);
                    }
                    false
                }
            };

            if self.limit_reached(restarts) {
                tracing::warn!(restarts, "restart limit reached; supervision finished");
                return report(runs, restarts, last_exit_code, StopReason::RestartLimit);
            }
            restarts += 1;

            if crashed && interrupted(cfg.crash_pause, shutdown.as_mut()).await {
                return report(runs, restarts, last_exit_code, StopReason::Shutdown);
            }
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .current_dir(&self.config.working_dir)
            .env(AUTO_RESTART_ENV, "1")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    fn limit_reached(&self, restarts: u32) -> bool {
        self.config.max_restarts.is_some_and(|max| restarts >= max)
    }
}

/// Sleep for `pause`; `true` if `shutdown` fired first.
async fn interrupted<F>(pause: Duration, shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = sleep(pause) => false,
        _ = shutdown => true,
    }
}
