//! Serving-process restart protocol.
//!
//! Reloading tenant data is done by restarting the serving process: a restart
//! signal makes it terminate (a supervisor respawns it), then the health
//! endpoint is polled until it serves again. Neither step can fail an
//! orchestration; both resolve to plain values.

mod classify;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use tenantsync_core::ResourceId;

pub use http::{HttpServingProcess, SERVICE_SECRET_HEADER};

/// How a restart signal was received.
///
/// An abrupt disconnect is the expected result of a successful restart, so
/// transport-level resets count as `Confirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RestartSignal {
    Confirmed,
    /// No shared secret configured; nothing was sent.
    Skipped,
    NotConfirmed(String),
}

impl RestartSignal {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, RestartSignal::Confirmed)
    }

    /// Whether a request was actually attempted.
    pub fn was_attempted(&self) -> bool {
        !matches!(self, RestartSignal::Skipped)
    }
}

/// Result of waiting for the serving process to come back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Health requests issued.
    pub attempts: u32,
    pub waited_ms: u64,
}

impl RestartOutcome {
    pub fn healthy(attempts: u32, waited: Duration) -> Self {
        Self {
            success: true,
            message: Some("serving process is healthy".to_string()),
            error: None,
            attempts,
            waited_ms: waited.as_millis() as u64,
        }
    }

    pub fn timeout(attempts: u32, waited: Duration) -> Self {
        Self {
            success: false,
            message: None,
            error: Some("timeout".to_string()),
            attempts,
            waited_ms: waited.as_millis() as u64,
        }
    }
}

/// Client of the (process-wide) serving process.
#[async_trait]
pub trait ServingProcess: Send + Sync + 'static {
    /// Best-effort restart request. Never fails.
    async fn signal_restart(&self, resource_id: &ResourceId) -> RestartSignal;

    /// Poll health until it succeeds or `max_wait` elapses. Never fails.
    async fn wait_for_restart(&self, max_wait: Duration) -> RestartOutcome;
}

#[async_trait]
impl<S> ServingProcess for Arc<S>
where
    S: ServingProcess + ?Sized,
{
    async fn signal_restart(&self, resource_id: &ResourceId) -> RestartSignal {
        (**self).signal_restart(resource_id).await
    }

    async fn wait_for_restart(&self, max_wait: Duration) -> RestartOutcome {
        (**self).wait_for_restart(max_wait).await
    }
}
