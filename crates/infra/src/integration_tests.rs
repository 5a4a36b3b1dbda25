//! Integration tests for the full refresh pipeline.
//!
//! Tests: request → tenant directory → job process → restart signal → health wait
//!
//! Uses real child processes (`sh` scripts) and a local fake serving process.

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::json;

    use tenantsync_auth::Principal;
    use tenantsync_core::{TenantContext, UserId};
    use tenantsync_jobs::RefreshRequest;

    use crate::config::OrchestratorConfig;
    use crate::orchestrator::{RefreshOrchestrator, RefreshOutcome};
    use crate::restart::HttpServingProcess;
    use crate::tenant_directory::InMemoryTenantDirectory;
    use crate::jobs::ProcessJobRunner;
    use crate::test_support::{MockBot, RestartBehavior, fast_policy, write_script};

    const SECRET: &str = "integration-secret";

    type Orchestrator =
        RefreshOrchestrator<Arc<InMemoryTenantDirectory>, ProcessJobRunner, HttpServingProcess>;

    fn orchestrator(bot: &MockBot, work: &Path, ingest: &Path, update: &Path) -> Orchestrator {
        let config = OrchestratorConfig {
            bot_base_url: bot.base_url.clone(),
            service_secret: Some(SECRET.to_string()),
            ingest_script: ingest.to_path_buf(),
            update_script: update.to_path_buf(),
            working_dir: work.to_path_buf(),
            interpreter: Some("sh".to_string()),
            restart: fast_policy(),
            ..OrchestratorConfig::default()
        };

        let directory = InMemoryTenantDirectory::new();
        directory
            .register(TenantContext::new("u1", "t1", "/data/t1"))
            .unwrap();

        RefreshOrchestrator::from_config(config, Arc::new(directory))
    }

    fn request() -> RefreshRequest {
        serde_json::from_value(json!({"startUrl": "https://ex.com", "maxDepth": 2})).unwrap()
    }

    #[tokio::test]
    async fn successful_job_with_reset_restart_reports_bot_restarted() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the arguments so the test can check what the job received.
        let ingest = write_script(
            dir.path(),
            "scrape.sh",
            "echo \"args: $*\"\necho 'SUMMARY_JSON: {\"pages\": 4}'\nexit 0\n",
        );
        let update = write_script(dir.path(), "update.sh", "exit 0\n");
        let bot = MockBot::spawn(RestartBehavior::Drop, Some(1), SECRET).await;
        let orch = orchestrator(&bot, dir.path(), &ingest, &update);

        let outcome = orch
            .run_ingestion(&Principal::user("u1"), &UserId::new("u1"), &request())
            .await
            .unwrap();

        let RefreshOutcome::Succeeded(ok) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert!(ok.success);
        assert_eq!(ok.resource_id.as_str(), "t1");
        assert!(ok.bot_restarted);
        assert!(ok.restart_signal.is_confirmed());
        assert_eq!(ok.summary, json!({"pages": 4}));
        assert!(ok.stdout.contains("--start-url https://ex.com"));
        assert!(ok.stdout.contains("--max-depth 2"));
        assert!(ok.stdout.contains("--vector-store-path /data/t1"));
        assert!(!ok.stdout.contains("respect-robots"));
        assert_eq!(bot.restart_calls(), 1);
        assert_eq!(bot.health_calls(), 1);
    }

    #[tokio::test]
    async fn failing_job_never_calls_restart_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ingest = write_script(dir.path(), "scrape.sh", "echo 'fetch failed' >&2\nexit 1\n");
        let update = write_script(dir.path(), "update.sh", "exit 0\n");
        let bot = MockBot::spawn(RestartBehavior::Accept, Some(1), SECRET).await;
        let orch = orchestrator(&bot, dir.path(), &ingest, &update);

        let outcome = orch
            .run_ingestion(&Principal::user("u1"), &UserId::new("u1"), &request())
            .await
            .unwrap();

        let RefreshOutcome::Failed(fail) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(!fail.success);
        assert_eq!(fail.error, "fetch failed");
        assert_eq!(fail.exit_code, Some(1));
        assert_eq!(bot.restart_calls(), 0);
        assert_eq!(bot.health_calls(), 0);
    }

    #[tokio::test]
    async fn update_runs_update_script_with_update_job_id() {
        let dir = tempfile::tempdir().unwrap();
        let ingest = write_script(dir.path(), "scrape.sh", "exit 9\n");
        let update = write_script(dir.path(), "update.sh", "echo \"$*\"\n");
        let bot = MockBot::spawn(RestartBehavior::Accept, Some(2), SECRET).await;
        let orch = orchestrator(&bot, dir.path(), &ingest, &update);

        let outcome = orch
            .run_update(&Principal::user("u1"), &UserId::new("u1"), &request())
            .await
            .unwrap();

        let RefreshOutcome::Succeeded(ok) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert!(ok.job_id.as_str().starts_with("update_t1_"));
        assert!(ok.stdout.contains(&format!("--job-id {}", ok.job_id)));
        assert!(ok.bot_restarted);
        assert_eq!(bot.health_calls(), 2);
    }

    #[tokio::test]
    async fn rejected_restart_still_waits_and_reports_health() {
        let dir = tempfile::tempdir().unwrap();
        let ingest = write_script(dir.path(), "scrape.sh", "exit 0\n");
        let update = write_script(dir.path(), "update.sh", "exit 0\n");
        let bot = MockBot::spawn(RestartBehavior::Accept, Some(1), "some-other-secret").await;
        let orch = orchestrator(&bot, dir.path(), &ingest, &update);

        let outcome = orch
            .run_ingestion(&Principal::user("u1"), &UserId::new("u1"), &request())
            .await
            .unwrap();

        let RefreshOutcome::Succeeded(ok) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert!(!ok.restart_signal.is_confirmed());
        assert!(ok.success);
        assert_eq!(bot.restart_calls(), 1);
    }
}
