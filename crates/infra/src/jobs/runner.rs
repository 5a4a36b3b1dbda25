//! Child-process job runner.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use tenantsync_jobs::{BoundedCapture, JobExecutionError, JobOutput, SUMMARY_MARKER, parse_summary_line};

/// Runs one external job to completion.
///
/// Implementations must not impose a wall-clock timeout: ingestion jobs are
/// expected to run for minutes.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(
        &self,
        script: &Path,
        args: &[String],
        working_dir: &Path,
        label: &str,
    ) -> Result<JobOutput, JobExecutionError>;
}

#[async_trait]
impl<R> JobRunner for Arc<R>
where
    R: JobRunner + ?Sized,
{
    async fn run(
        &self,
        script: &Path,
        args: &[String],
        working_dir: &Path,
        label: &str,
    ) -> Result<JobOutput, JobExecutionError> {
        (**self).run(script, args, working_dir, label).await
    }
}

/// Spawns jobs as child processes (`interpreter script args...`).
#[derive(Debug, Clone)]
pub struct ProcessJobRunner {
    interpreter: Option<String>,
    max_capture_bytes: usize,
}

impl ProcessJobRunner {
    pub fn new(interpreter: Option<String>, max_capture_bytes: usize) -> Self {
        Self {
            interpreter,
            max_capture_bytes,
        }
    }

    fn command(&self, script: &Path) -> (String, Command) {
        match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(script);
                (interpreter.clone(), cmd)
            }
            None => (script.display().to_string(), Command::new(script)),
        }
    }
}

#[async_trait]
impl JobRunner for ProcessJobRunner {
    async fn run(
        &self,
        script: &Path,
        args: &[String],
        working_dir: &Path,
        label: &str,
    ) -> Result<JobOutput, JobExecutionError> {
        let (program, mut cmd) = self.command(script);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!(
            label,
            program = %program,
            script = %script.display(),
            arg_count = args.len(),
            "starting job process"
        );

        let started_at = Utc::now();
        let mut child = cmd
            .spawn()
            .map_err(|source| JobExecutionError::Spawn { program, source })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes must be drained while waiting, or a chatty job blocks on a full pipe.
        let (status, out, err) = tokio::join!(
            child.wait(),
            drain_stream(stdout, label, "stdout", self.max_capture_bytes),
            drain_stream(stderr, label, "stderr", self.max_capture_bytes),
        );

        let io_err = |source: std::io::Error| JobExecutionError::Io {
            label: label.to_string(),
            source,
        };
        let status = status.map_err(io_err)?;
        let out = out.map_err(io_err)?;
        let err = err.map_err(io_err)?;
        let finished_at = Utc::now();

        let summary = out.summary.unwrap_or(JsonValue::Null);
        let dropped_bytes = out.dropped + err.dropped;
        if dropped_bytes > 0 {
            warn!(label, dropped_bytes, "job output exceeded capture cap; kept most recent output");
        }

        if status.success() {
            info!(
                label,
                duration_ms = (finished_at - started_at).num_milliseconds(),
                has_summary = !summary.is_null(),
                "job process completed"
            );
            Ok(JobOutput {
                summary,
                stdout: out.text,
                stderr: err.text,
                exit_code: status.code(),
                started_at,
                finished_at,
                dropped_bytes,
            })
        } else {
            warn!(label, exit_code = ?status.code(), "job process failed");
            Err(JobExecutionError::Failed {
                label: label.to_string(),
                exit_code: status.code(),
                stdout: out.text,
                stderr: err.text,
                summary,
            })
        }
    }
}

/// Bytes requested per pipe read.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Longest line still inspected for a summary marker. Longer lines are
/// captured in pieces and never parsed.
const MAX_SUMMARY_LINE_BYTES: usize = 256 * 1024;

#[derive(Debug, Default)]
struct StreamCapture {
    text: String,
    dropped: usize,
    summary: Option<JsonValue>,
}

async fn drain_stream<R>(
    reader: Option<R>,
    label: &str,
    stream: &'static str,
    max_bytes: usize,
) -> std::io::Result<StreamCapture>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(StreamCapture::default());
    };

    let mut lines = LineCollector::new(label, stream, max_bytes);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        lines.feed(&chunk[..n]);
    }
    Ok(lines.finish())
}

/// Splits a byte stream into lines on `\n`, `\r` or `\r\n`.
///
/// A pending line never grows past `pending_limit`; once it does, it is
/// spilled into the capture as-is and the remainder of that line follows.
struct LineCollector<'a> {
    label: &'a str,
    stream: &'static str,
    capture: BoundedCapture,
    summary: Option<JsonValue>,
    pending: Vec<u8>,
    pending_limit: usize,
    spilled: bool,
    after_cr: bool,
}

impl<'a> LineCollector<'a> {
    fn new(label: &'a str, stream: &'static str, max_bytes: usize) -> Self {
        Self {
            label,
            stream,
            capture: BoundedCapture::new(max_bytes),
            summary: None,
            pending: Vec::new(),
            pending_limit: max_bytes.max(MAX_SUMMARY_LINE_BYTES),
            spilled: false,
            after_cr: false,
        }
    }

    fn feed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.after_cr {
                self.after_cr = false;
                if bytes[0] == b'\n' {
                    bytes = &bytes[1..];
                    continue;
                }
            }
            match bytes.iter().position(|b| matches!(b, b'\n' | b'\r')) {
                Some(pos) => {
                    self.extend(&bytes[..pos]);
                    self.after_cr = bytes[pos] == b'\r';
                    self.end_line();
                    bytes = &bytes[pos + 1..];
                }
                None => {
                    self.extend(bytes);
                    break;
                }
            }
        }
    }

    fn extend(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let take = (self.pending_limit - self.pending.len()).min(bytes.len());
            self.pending.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.pending.len() >= self.pending_limit {
                self.spill();
            }
        }
    }

    fn spill(&mut self) {
        if !self.spilled {
            debug!(label = self.label, stream = self.stream, "job emitted an overlong line");
        }
        self.spilled = true;
        {
            let text = String::from_utf8_lossy(&self.pending);
            self.capture.push(&text);
        }
        self.pending.clear();
    }

    fn end_line(&mut self) {
        {
            let raw = String::from_utf8_lossy(&self.pending);
            if self.spilled {
                self.capture.push_line(&raw);
            } else {
                let line: &str = &raw;
                debug!(label = self.label, stream = self.stream, "{line}");

                if self.stream == "stdout" && line.trim_start().starts_with(SUMMARY_MARKER) {
                    match parse_summary_line(line) {
                        Some(v) => self.summary = Some(v),
                        None => warn!(label = self.label, "ignoring malformed job summary line"),
                    }
                }
                self.capture.push_line(line);
            }
        }
        self.pending.clear();
        self.spilled = false;
    }

    fn finish(mut self) -> StreamCapture {
        if !self.pending.is_empty() || self.spilled {
            self.end_line();
        }
        let (text, dropped) = self.capture.finish();
        StreamCapture {
            text,
            dropped,
            summary: self.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::test_support::write_script;

    fn sh() -> ProcessJobRunner {
        ProcessJobRunner::new(Some("sh".to_string()), 64 * 1024)
    }

    #[tokio::test]
    async fn successful_job_returns_output_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "ok.sh",
            r#"echo "crawling $2"
echo 'SUMMARY_JSON: {"pages": 3}'
echo "warming up" >&2
exit 0
"#,
        );

        let out = sh()
            .run(&script, &["--start-url".to_string(), "https://ex.com".to_string()], dir.path(), "test")
            .await
            .unwrap();

        assert_eq!(out.summary, json!({"pages": 3}));
        assert!(out.stdout.contains("crawling https://ex.com"));
        assert!(out.stderr.contains("warming up"));
        assert_eq!(out.exit_code, Some(0));
        assert!(out.finished_at >= out.started_at);
    }

    #[tokio::test]
    async fn missing_summary_is_null_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "plain.sh", "echo done\n");

        let out = sh().run(&script, &[], dir.path(), "test").await.unwrap();
        assert!(out.summary.is_null());
    }

    #[tokio::test]
    async fn non_zero_exit_carries_logs_and_code() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fail.sh",
            "echo partial\necho 'fetch failed' >&2\nexit 3\n",
        );

        let err = sh().run(&script, &[], dir.path(), "test").await.unwrap_err();
        assert_eq!(err.code(), "job_failed");
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.to_string(), "fetch failed");
        let (stdout, _) = err.logs().unwrap();
        assert!(stdout.contains("partial"));
    }

    #[tokio::test]
    async fn job_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "pwd.sh", "pwd\n");
        let work = tempfile::tempdir().unwrap();

        let out = sh().run(&script, &[], work.path(), "test").await.unwrap();
        let expected = work.path().canonicalize().unwrap();
        let reported = std::path::PathBuf::from(out.stdout.trim()).canonicalize().unwrap();
        assert_eq!(reported, expected);
    }

    #[tokio::test]
    async fn unknown_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessJobRunner::new(Some("definitely-not-a-real-interpreter".into()), 1024);

        let err = runner
            .run(Path::new("job.py"), &[], dir.path(), "test")
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Spawn { .. }));
        assert!(err.logs().is_none());
    }

    #[tokio::test]
    async fn output_is_capped_but_summary_survives() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "chatty.sh",
            r#"echo 'SUMMARY_JSON: {"early": true}'
i=0
while [ $i -lt 500 ]; do echo "line $i"; i=$((i+1)); done
"#,
        );
        let runner = ProcessJobRunner::new(Some("sh".into()), 256);

        let out = runner.run(&script, &[], dir.path(), "test").await.unwrap();
        assert!(out.stdout.len() <= 256);
        assert!(out.stdout.ends_with("line 499\n"));
        assert!(out.dropped_bytes > 0);
        assert_eq!(out.summary, json!({"early": true}));
    }

    #[tokio::test]
    async fn output_without_newlines_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "bar.sh",
            "head -c 5000000 /dev/zero | tr '\\0' 'a' >&2\n",
        );
        let runner = ProcessJobRunner::new(Some("sh".into()), 1024);

        let out = runner.run(&script, &[], dir.path(), "test").await.unwrap();
        assert!(out.stderr.len() <= 1024);
        assert!(out.stderr.bytes().all(|b| b == b'a' || b == b'\n'));
        assert_eq!(out.dropped_bytes + out.stderr.len(), 5_000_000 + 1);
    }

    #[tokio::test]
    async fn carriage_returns_split_progress_lines() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "progress.sh",
            "printf 'step 1\\rstep 2\\r\\ndone\\n'\n",
        );

        let out = sh().run(&script, &[], dir.path(), "test").await.unwrap();
        assert_eq!(out.stdout, "step 1\nstep 2\ndone\n");
    }

    #[tokio::test]
    async fn last_valid_summary_wins() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "many.sh",
            r#"echo 'SUMMARY_JSON: {"n": 1}'
echo 'SUMMARY_JSON: {"n": 2}'
echo 'SUMMARY_JSON: {not json'
"#,
        );

        let out = sh().run(&script, &[], dir.path(), "test").await.unwrap();
        assert_eq!(out.summary, json!({"n": 2}));
    }

    #[test]
    fn pending_line_never_exceeds_its_limit() {
        let mut lines = LineCollector::new("test", "stdout", 1024);
        let chunk = vec![b'x'; READ_CHUNK_BYTES];
        for _ in 0..200 {
            lines.feed(&chunk);
            assert!(lines.pending.len() < lines.pending_limit);
        }
        let capture = lines.finish();
        assert_eq!(capture.text.len(), 1024);
        assert!(capture.summary.is_none());
    }

    #[test]
    fn crlf_split_across_reads_is_one_terminator() {
        let mut lines = LineCollector::new("test", "stdout", 1024);
        lines.feed(b"one\r");
        lines.feed(b"\ntwo");
        let capture = lines.finish();
        assert_eq!(capture.text, "one\ntwo\n");
    }
}
