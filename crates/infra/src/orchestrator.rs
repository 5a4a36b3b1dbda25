//! Content-refresh orchestration.
//!
//! One invocation walks a fixed pipeline:
//!
//! ```text
//! request
//!   ↓
//! 1. Authorize caller against the target tenant
//!   ↓
//! 2. Resolve tenant context and check it is provisioned
//!   ↓
//! 3. Build job options and arguments
//!   ↓
//! 4. Take the per-tenant job lock
//!   ↓
//! 5. Run the external job (no timeout)
//!   ↓
//! 6. On success only: signal the serving process, then wait for its health
//! ```
//!
//! Steps 5 and 6 run on their own task that holds the tenant lock, so they
//! finish even if the caller stops waiting.
//!
//! Steps 1-4 can reject the request (`PreconditionError`). A failing job is a
//! regular outcome (`RefreshOutcome::Failed`) carrying truncated logs. Restart
//! problems never fail an invocation; they only show up as `botRestarted: false`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;

use tenantsync_auth::{Principal, authorize_tenant_access};
use tenantsync_core::{JobId, JobKind, PreconditionError, PreconditionResult, ResourceId, UserId};
use tenantsync_jobs::{JobExecutionError, JobOptions, JobOutput, RefreshRequest, build_args, truncate_log};

use crate::config::OrchestratorConfig;
use crate::jobs::{JobRunner, ProcessJobRunner};
use crate::restart::{HttpServingProcess, RestartOutcome, RestartSignal, ServingProcess};
use crate::tenant_directory::TenantDirectory;
use crate::tenant_lock::{TenantJobGuard, TenantJobLocks};

/// Result of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSuccess {
    pub success: bool,
    pub job_id: JobId,
    pub resource_id: ResourceId,
    pub summary: JsonValue,
    pub stdout: String,
    pub stderr: String,
    /// Whether the serving process came back healthy after the restart.
    pub bot_restarted: bool,
    pub restart_signal: RestartSignal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartOutcome>,
    pub duration_ms: i64,
}

/// Result of a job that was launched and did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub success: bool,
    pub job_id: JobId,
    pub resource_id: ResourceId,
    pub error: String,
    pub code: &'static str,
    pub summary: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RefreshOutcome {
    Succeeded(RefreshSuccess),
    Failed(RefreshFailure),
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Succeeded(_))
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            RefreshOutcome::Succeeded(s) => &s.job_id,
            RefreshOutcome::Failed(f) => &f.job_id,
        }
    }
}

/// Composes tenant resolution, job execution and the serving-process restart.
///
/// Generic over its three seams so tests can substitute in-memory fakes.
pub struct RefreshOrchestrator<D, R, S> {
    config: Arc<OrchestratorConfig>,
    directory: D,
    runner: Arc<R>,
    serving: Arc<S>,
    locks: TenantJobLocks,
}

impl<D> RefreshOrchestrator<D, ProcessJobRunner, HttpServingProcess>
where
    D: TenantDirectory,
{
    /// Production wiring: child-process runner and HTTP serving-process client.
    pub fn from_config(config: OrchestratorConfig, directory: D) -> Self {
        let runner = ProcessJobRunner::new(config.interpreter.clone(), config.max_capture_bytes);
        let serving = HttpServingProcess::from_config(&config);
        Self::new(config, directory, runner, serving)
    }
}

impl<D, R, S> RefreshOrchestrator<D, R, S>
where
    D: TenantDirectory,
    R: JobRunner,
    S: ServingProcess,
{
    pub fn new(config: OrchestratorConfig, directory: D, runner: R, serving: S) -> Self {
        Self {
            config: Arc::new(config),
            directory,
            runner: Arc::new(runner),
            serving: Arc::new(serving),
            locks: TenantJobLocks::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn locks(&self) -> &TenantJobLocks {
        &self.locks
    }

    /// Fresh crawl and index build for `target`'s tenant.
    pub async fn run_ingestion(
        &self,
        principal: &Principal,
        target: &UserId,
        request: &RefreshRequest,
    ) -> PreconditionResult<RefreshOutcome> {
        self.run(JobKind::Ingestion, principal, target, request).await
    }

    /// Incremental refresh of `target`'s existing index.
    ///
    /// `request.mongo_uri`, when set, replaces the tenant database for this call.
    pub async fn run_update(
        &self,
        principal: &Principal,
        target: &UserId,
        request: &RefreshRequest,
    ) -> PreconditionResult<RefreshOutcome> {
        self.run(JobKind::Update, principal, target, request).await
    }

    async fn run(
        &self,
        kind: JobKind,
        principal: &Principal,
        target: &UserId,
        request: &RefreshRequest,
    ) -> PreconditionResult<RefreshOutcome> {
        // 1) Authorization re-check, independent of the transport layer.
        authorize_tenant_access(principal, target)?;

        // 2) Tenant context
        let tenant = self.directory.resolve(target).await?;
        tenant.ensure_provisioned()?;
        if request.primary_start_url().is_none() {
            return Err(PreconditionError::invalid_request("startUrl is required"));
        }

        // 3) Options and arguments
        let job_id = JobId::generate(kind, Some(&tenant.resource_id));
        let mut options = JobOptions::for_tenant(&tenant, job_id.clone()).with_request(request);
        if kind == JobKind::Update {
            options = options.with_database_override(request.mongo_uri.as_deref());
        }
        let args = build_args(&options);

        // 4) Per-tenant exclusion
        let guard = self
            .locks
            .try_acquire(&tenant.resource_id)
            .ok_or_else(|| PreconditionError::JobInProgress(tenant.resource_id.to_string()))?;

        tracing::info!(
            job_id = %job_id,
            resource_id = %tenant.resource_id,
            user_id = %tenant.user_id,
            kind = %kind,
            caller = %principal.user_id,
            "starting refresh job"
        );

        // 5) + 6) run detached from the caller: a dropped request must not
        // release the lock or skip the restart while the job is still running.
        let task = RefreshTask {
            config: Arc::clone(&self.config),
            runner: Arc::clone(&self.runner),
            serving: Arc::clone(&self.serving),
            guard,
            script: self.config.script_for(kind).to_path_buf(),
            args,
            job_id: job_id.clone(),
            resource_id: tenant.resource_id.clone(),
        };

        match tokio::spawn(task.execute()).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                tracing::error!(job_id = %job_id, error = %err, "refresh task cancelled");
                Ok(RefreshOutcome::Failed(RefreshFailure {
                    success: false,
                    job_id,
                    resource_id: tenant.resource_id,
                    error: "refresh task was cancelled".to_string(),
                    code: "job_cancelled",
                    summary: JsonValue::Null,
                    exit_code: None,
                    stdout: None,
                    stderr: None,
                }))
            }
        }
    }
}

/// The part of a refresh that runs to completion once the job is launched.
struct RefreshTask<R, S> {
    config: Arc<OrchestratorConfig>,
    runner: Arc<R>,
    serving: Arc<S>,
    guard: TenantJobGuard,
    script: PathBuf,
    args: Vec<String>,
    job_id: JobId,
    resource_id: ResourceId,
}

impl<R, S> RefreshTask<R, S>
where
    R: JobRunner,
    S: ServingProcess,
{
    async fn execute(self) -> RefreshOutcome {
        let result = self
            .runner
            .run(&self.script, &self.args, &self.config.working_dir, self.job_id.as_str())
            .await;
        drop(self.guard);

        let limit = self.config.log_limit;
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(
                    job_id = %self.job_id,
                    resource_id = %self.resource_id,
                    code = err.code(),
                    exit_code = ?err.exit_code(),
                    error = %err,
                    "refresh job failed; serving process left untouched"
                );
                return RefreshOutcome::Failed(failure(limit, self.job_id, self.resource_id, &err));
            }
        };

        // 6) Restart and wait
        let (restart_signal, restart) =
            restart_serving_process(self.serving.as_ref(), &self.resource_id, self.config.restart.max_wait)
                .await;

        tracing::info!(
            job_id = %self.job_id,
            resource_id = %self.resource_id,
            duration_ms = output.duration_ms(),
            bot_restarted = restart.as_ref().is_some_and(|r| r.success),
            "refresh job completed"
        );

        RefreshOutcome::Succeeded(success(
            limit,
            self.job_id,
            self.resource_id,
            output,
            restart_signal,
            restart,
        ))
    }
}

async fn restart_serving_process<S>(
    serving: &S,
    resource_id: &ResourceId,
    max_wait: Duration,
) -> (RestartSignal, Option<RestartOutcome>)
where
    S: ServingProcess,
{
    let signal = serving.signal_restart(resource_id).await;
    if !signal.was_attempted() {
        return (signal, None);
    }
    let outcome = serving.wait_for_restart(max_wait).await;
    (signal, Some(outcome))
}

fn success(
    limit: usize,
    job_id: JobId,
    resource_id: ResourceId,
    output: JobOutput,
    restart_signal: RestartSignal,
    restart: Option<RestartOutcome>,
) -> RefreshSuccess {
    RefreshSuccess {
        success: true,
        job_id,
        resource_id,
        duration_ms: output.duration_ms(),
        summary: output.summary,
        stdout: truncate_log(&output.stdout, limit),
        stderr: truncate_log(&output.stderr, limit),
        bot_restarted: restart.as_ref().is_some_and(|r| r.success),
        restart_signal,
        restart,
    }
}

fn failure(limit: usize, job_id: JobId, resource_id: ResourceId, err: &JobExecutionError) -> RefreshFailure {
    let logs = err.logs();
    RefreshFailure {
        success: false,
        job_id,
        resource_id,
        error: err.to_string(),
        code: err.code(),
        summary: err.summary(),
        exit_code: err.exit_code(),
        stdout: logs.map(|(out, _)| truncate_log(out, limit)),
        stderr: logs.map(|(_, e)| truncate_log(e, limit)),
    }
}
