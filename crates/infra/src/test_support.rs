//! Shared fixtures for infra tests: job scripts and a fake serving process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::RestartPolicy;

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("failed to write test script");
    path
}

/// Millisecond-scale restart timings.
pub fn fast_policy() -> RestartPolicy {
    RestartPolicy {
        signal_timeout: Duration::from_millis(500),
        grace_period: Duration::from_millis(50),
        poll_interval: Duration::from_millis(40),
        health_timeout: Duration::from_millis(200),
        max_wait: Duration::from_secs(2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartBehavior {
    /// Answer 200 when the secret matches, 401 otherwise.
    Accept,
    /// Read the request and close the socket without answering.
    Drop,
    /// Read the request and keep the socket open without answering.
    Stall,
}

struct MockState {
    restart: RestartBehavior,
    healthy_from_poll: Option<usize>,
    secret: &'static str,
    restart_hits: AtomicUsize,
    health_hits: AtomicUsize,
}

/// Minimal HTTP/1.1 stand-in for the serving process.
///
/// Hand-rolled on a raw socket so it can hang up mid-request like a
/// restarting server does.
pub struct MockBot {
    pub base_url: String,
    state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBot {
    /// `healthy_from_poll`: 1-based health request from which 200 is returned
    /// (`None` = never healthy).
    pub async fn spawn(
        restart: RestartBehavior,
        healthy_from_poll: Option<usize>,
        secret: &'static str,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState {
            restart,
            healthy_from_poll,
            secret,
            restart_hits: AtomicUsize::new(0),
            health_hits: AtomicUsize::new(0),
        });

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                tokio::spawn(handle_connection(sock, accept_state.clone()));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn restart_calls(&self) -> usize {
        self.state.restart_hits.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.state.health_hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockBot {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(mut sock: TcpStream, state: Arc<MockState>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let path = request_line.next().unwrap_or_default();
    let secret_ok = lines.any(|l| {
        let mut parts = l.splitn(2, ':');
        let name = parts.next().unwrap_or_default().trim();
        let value = parts.next().unwrap_or_default().trim();
        name.eq_ignore_ascii_case("x-service-secret") && value == state.secret
    });

    let status = match (method, path) {
        ("POST", "/system/restart") => {
            state.restart_hits.fetch_add(1, Ordering::SeqCst);
            match state.restart {
                RestartBehavior::Drop => return,
                RestartBehavior::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    return;
                }
                RestartBehavior::Accept if secret_ok => 200,
                RestartBehavior::Accept => 401,
            }
        }
        ("GET", "/health") => {
            let n = state.health_hits.fetch_add(1, Ordering::SeqCst) + 1;
            match state.healthy_from_poll {
                Some(k) if n >= k => 200,
                _ => 503,
            }
        }
        _ => 404,
    };

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        503 => "Service Unavailable",
        _ => "Not Found",
    };
    let resp = format!("HTTP/1.1 {status} {reason}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    let _ = sock.write_all(resp.as_bytes()).await;
    let _ = sock.shutdown().await;
}
