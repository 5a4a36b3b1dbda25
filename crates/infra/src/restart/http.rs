//! HTTP client of the serving process (`/system/restart`, `/health`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use tenantsync_core::ResourceId;

use super::classify::classify_restart_result;
use super::{RestartOutcome, RestartSignal, ServingProcess};
use crate::config::{OrchestratorConfig, RestartPolicy};

/// Header carrying the shared restart secret.
pub const SERVICE_SECRET_HEADER: &str = "x-service-secret";

#[derive(Debug, Clone)]
pub struct HttpServingProcess {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
    policy: RestartPolicy,
}

impl HttpServingProcess {
    pub fn new(base_url: impl Into<String>, secret: Option<String>, policy: RestartPolicy) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            policy,
        }
    }

    pub fn from_config(cfg: &OrchestratorConfig) -> Self {
        Self::new(
            cfg.bot_base_url.clone(),
            cfg.service_secret.clone(),
            cfg.restart.clone(),
        )
    }

    async fn probe_health(&self, url: &str, timeout: Duration) -> bool {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => true,
            Ok(resp) => {
                debug!(status = %resp.status(), "serving process not healthy yet");
                false
            }
            Err(e) => {
                debug!(error = %e, "serving process unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl ServingProcess for HttpServingProcess {
    async fn signal_restart(&self, resource_id: &ResourceId) -> RestartSignal {
        let Some(secret) = self.secret.as_deref() else {
            warn!(
                resource_id = %resource_id,
                "service secret not configured; skipping serving-process restart"
            );
            return RestartSignal::Skipped;
        };

        let url = format!("{}/system/restart", self.base_url);
        info!(resource_id = %resource_id, url = %url, "signalling serving-process restart");

        let result = self
            .client
            .post(&url)
            .header(SERVICE_SECRET_HEADER, secret)
            .timeout(self.policy.signal_timeout)
            .send()
            .await;

        let signal = classify_restart_result(result);
        match &signal {
            RestartSignal::Confirmed => {
                info!(resource_id = %resource_id, "serving-process restart confirmed")
            }
            RestartSignal::NotConfirmed(reason) => warn!(
                resource_id = %resource_id,
                reason = %reason,
                "restart signal not confirmed"
            ),
            RestartSignal::Skipped => {}
        }
        signal
    }

    async fn wait_for_restart(&self, max_wait: Duration) -> RestartOutcome {
        let started = Instant::now();
        let deadline = started + max_wait;
        let url = format!("{}/health", self.base_url);

        // Polling right away would hit the old process before it goes down.
        sleep(self.policy.grace_period.min(max_wait)).await;

        let mut attempts = 0u32;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            attempts += 1;
            if self
                .probe_health(&url, self.policy.health_timeout.min(remaining))
                .await
            {
                let waited = started.elapsed();
                info!(attempts, waited_ms = waited.as_millis() as u64, "serving process is back");
                return RestartOutcome::healthy(attempts, waited);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sleep(self.policy.poll_interval.min(remaining)).await;
        }

        let waited = started.elapsed();
        warn!(
            attempts,
            waited_ms = waited.as_millis() as u64,
            "serving process did not become healthy in time"
        );
        RestartOutcome::timeout(attempts, waited)
    }
}
