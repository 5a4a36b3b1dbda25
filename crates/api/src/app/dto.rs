use axum::body::Bytes;
use serde::Serialize;

use tenantsync_core::PreconditionError;
use tenantsync_jobs::RefreshRequest;

use crate::context::PrincipalContext;

// -------------------------
// Request DTOs
// -------------------------

/// Parse a refresh body; an empty body is an empty request.
///
/// Field-level leniency lives in [`RefreshRequest`]; only malformed JSON is
/// rejected here.
pub fn parse_refresh_request(body: &Bytes) -> Result<RefreshRequest, PreconditionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefreshRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| PreconditionError::invalid_request(format!("malformed JSON body: {e}")))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub user_id: String,
    pub role: String,
    pub privileged: bool,
}

impl From<&PrincipalContext> for WhoAmIResponse {
    fn from(ctx: &PrincipalContext) -> Self {
        Self {
            user_id: ctx.user_id().to_string(),
            role: ctx.role().to_string(),
            privileged: ctx.role().is_privileged(),
        }
    }
}
