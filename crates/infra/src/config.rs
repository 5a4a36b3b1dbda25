//! Configuration loading and representation.
//!
//! Resolved once at process start and injected into the orchestrator; nothing
//! below the binaries reads the environment directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use tenantsync_core::JobKind;
use tenantsync_jobs::DEFAULT_LOG_LIMIT;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Timing of the restart signal + health-poll protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Request timeout of the restart call.
    pub signal_timeout: Duration,
    /// Pause before the first health poll, so the old process is not observed.
    pub grace_period: Duration,
    /// Pause between failed health polls.
    pub poll_interval: Duration,
    /// Request timeout of a single health poll.
    pub health_timeout: Duration,
    /// Total budget of the wait, measured from its start.
    pub max_wait: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            signal_timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(3),
            poll_interval: Duration::from_secs(2),
            health_timeout: Duration::from_secs(2),
            max_wait: Duration::from_secs(30),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Base URL of the serving process (no trailing slash).
    pub bot_base_url: String,
    /// Shared secret for the restart endpoint; restart is skipped when unset.
    pub service_secret: Option<String>,
    pub ingest_script: PathBuf,
    pub update_script: PathBuf,
    /// Working directory of job processes.
    pub working_dir: PathBuf,
    /// Program used to run the scripts; `None` runs the script directly.
    pub interpreter: Option<String>,
    /// Per-stream in-memory capture cap.
    pub max_capture_bytes: usize,
    /// Characters of stdout/stderr returned to callers.
    pub log_limit: usize,
    pub restart: RestartPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bot_base_url: "http://127.0.0.1:8000".to_string(),
            service_secret: None,
            ingest_script: PathBuf::from("scripts/scrape.py"),
            update_script: PathBuf::from("scripts/update.py"),
            working_dir: PathBuf::from("."),
            interpreter: Some("python3".to_string()),
            max_capture_bytes: 1024 * 1024,
            log_limit: DEFAULT_LOG_LIMIT,
            restart: RestartPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (defaults for missing keys).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = non_empty(get("BOT_BASE_URL")) {
            cfg.bot_base_url = url.trim_end_matches('/').to_string();
        }
        cfg.service_secret = non_empty(get("BOT_SERVICE_SECRET"));
        if let Some(p) = non_empty(get("INGEST_SCRIPT")) {
            cfg.ingest_script = PathBuf::from(p);
        }
        if let Some(p) = non_empty(get("UPDATE_SCRIPT")) {
            cfg.update_script = PathBuf::from(p);
        }
        if let Some(p) = non_empty(get("JOB_WORKDIR")) {
            cfg.working_dir = PathBuf::from(p);
        }
        // Present but empty means "run the script directly".
        if let Some(raw) = get("JOB_INTERPRETER") {
            cfg.interpreter = non_empty(Some(raw));
        }
        if let Some(raw) = non_empty(get("JOB_MAX_CAPTURE_BYTES")) {
            cfg.max_capture_bytes = parse_number("JOB_MAX_CAPTURE_BYTES", &raw)?;
        }
        if let Some(raw) = non_empty(get("RESTART_MAX_WAIT_MS")) {
            let ms: u64 = parse_number("RESTART_MAX_WAIT_MS", &raw)?;
            cfg.restart.max_wait = Duration::from_millis(ms);
        }

        Ok(cfg)
    }

    pub fn script_for(&self, kind: JobKind) -> &Path {
        match kind {
            JobKind::Ingestion => &self.ingest_script,
            JobKind::Update => &self.update_script,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let cfg = OrchestratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, OrchestratorConfig::default());
        assert!(cfg.service_secret.is_none());
        assert_eq!(cfg.restart.max_wait, Duration::from_secs(30));
    }

    #[test]
    fn values_are_read_and_normalized() {
        let cfg = OrchestratorConfig::from_lookup(lookup(&[
            ("BOT_BASE_URL", "http://bot:9000/"),
            ("BOT_SERVICE_SECRET", "s3cret"),
            ("UPDATE_SCRIPT", "/opt/jobs/update.py"),
            ("JOB_INTERPRETER", ""),
            ("RESTART_MAX_WAIT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(cfg.bot_base_url, "http://bot:9000");
        assert_eq!(cfg.service_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.script_for(JobKind::Update), Path::new("/opt/jobs/update.py"));
        assert_eq!(cfg.interpreter, None);
        assert_eq!(cfg.restart.max_wait, Duration::from_millis(1500));
    }

    #[test]
    fn blank_secret_disables_restart() {
        let cfg = OrchestratorConfig::from_lookup(lookup(&[("BOT_SERVICE_SECRET", "  ")])).unwrap();
        assert!(cfg.service_secret.is_none());
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = OrchestratorConfig::from_lookup(lookup(&[("JOB_MAX_CAPTURE_BYTES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JOB_MAX_CAPTURE_BYTES", .. }));
    }
}
