//! Classification of restart-call results.

use std::error::Error as StdError;
use std::io::ErrorKind;

use reqwest::StatusCode;

use super::RestartSignal;

/// Map the raw result of the restart request onto a [`RestartSignal`].
///
/// - any response except 401/403 ⇒ confirmed
/// - timeouts, resets, aborted connections, "socket hang up" ⇒ confirmed
/// - DNS failures, refused connections, client-side errors ⇒ not confirmed
pub(crate) fn classify_restart_result(
    result: Result<reqwest::Response, reqwest::Error>,
) -> RestartSignal {
    match result {
        Ok(resp) => classify_status(resp.status()),
        Err(err) => classify_transport_error(&err),
    }
}

fn classify_status(status: StatusCode) -> RestartSignal {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        RestartSignal::NotConfirmed(format!("rejected: {status}"))
    } else {
        RestartSignal::Confirmed
    }
}

fn classify_transport_error(err: &reqwest::Error) -> RestartSignal {
    if err.is_timeout() {
        return RestartSignal::Confirmed;
    }

    match io_error_kind(err) {
        Some(
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof,
        ) => return RestartSignal::Confirmed,
        Some(ErrorKind::ConnectionRefused) => {
            return RestartSignal::NotConfirmed("connection refused".to_string());
        }
        _ => {}
    }

    let chain = error_chain(err);
    let lower = chain.to_ascii_lowercase();
    if lower.contains("dns error") || lower.contains("failed to lookup address") {
        return RestartSignal::NotConfirmed(format!("dns failure: {chain}"));
    }
    if lower.contains("connection closed before message completed")
        || lower.contains("connection reset")
    {
        return RestartSignal::Confirmed;
    }
    if err.is_connect() {
        return RestartSignal::NotConfirmed(format!("connect failed: {chain}"));
    }
    if err.is_request() || err.is_body() {
        return RestartSignal::Confirmed;
    }

    RestartSignal::NotConfirmed(chain)
}

fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = e.source();
    }
    None
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
