use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Prefix of the stdout line carrying the job's structured summary.
pub const SUMMARY_MARKER: &str = "SUMMARY_JSON:";

/// Maximum characters of stdout/stderr returned to callers.
pub const DEFAULT_LOG_LIMIT: usize = 8192;

/// Outcome of a job process that exited successfully.
///
/// Created when the process exits and consumed immediately by the
/// orchestrator; never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutput {
    /// Job-defined summary, `Null` when the job printed no marker.
    pub summary: JsonValue,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Bytes discarded by the capture cap (stdout + stderr).
    pub dropped_bytes: usize,
}

impl JobOutput {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Debug, Error)]
pub enum JobExecutionError {
    /// The process could not be started at all.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully (or was killed by a signal).
    #[error("{}", failure_message(.label, .exit_code, .stderr))]
    Failed {
        label: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        summary: JsonValue,
    },

    /// Waiting on the process or reading its pipes failed.
    #[error("io error while supervising {label}: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

fn failure_message(label: &str, exit_code: &Option<i32>, stderr: &str) -> String {
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    match exit_code {
        Some(code) => format!("{label} exited with status {code}"),
        None => format!("{label} was terminated by a signal"),
    }
}

impl JobExecutionError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            JobExecutionError::Spawn { .. } => "job_spawn_failed",
            JobExecutionError::Failed { .. } => "job_failed",
            JobExecutionError::Io { .. } => "job_io_error",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            JobExecutionError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Captured `(stdout, stderr)` when the process actually ran.
    pub fn logs(&self) -> Option<(&str, &str)> {
        match self {
            JobExecutionError::Failed { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }

    pub fn summary(&self) -> JsonValue {
        match self {
            JobExecutionError::Failed { summary, .. } => summary.clone(),
            _ => JsonValue::Null,
        }
    }
}

/// Parse a summary marker line; `None` if the line is not a valid marker.
pub fn parse_summary_line(line: &str) -> Option<JsonValue> {
    let rest = line.trim_start().strip_prefix(SUMMARY_MARKER)?;
    serde_json::from_str(rest.trim()).ok()
}

/// Truncate `text` to `limit` characters, appending how many were omitted.
pub fn truncate_log(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{kept}\n...[truncated {} characters]", total - limit)
}
