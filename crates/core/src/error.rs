//! Precondition error model.

use thiserror::Error;

/// Result type used for checks that must pass before a job is launched.
pub type PreconditionResult<T> = Result<T, PreconditionError>;

/// A failure detected before any external job is launched.
///
/// Keep this focused on deterministic rejections (authorization, provisioning,
/// malformed requests, concurrent runs). Job failures belong to the jobs crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The caller may not operate on the target tenant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No tenant is known for the requested user.
    #[error("tenant not found for user '{0}'")]
    TenantNotFound(String),

    /// The tenant exists but its resources are not fully provisioned.
    #[error("tenant resources not provisioned: {0}")]
    TenantNotProvisioned(String),

    /// The invocation options are unusable (e.g. no start URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another job is already running against the same tenant resources.
    #[error("a job is already running for resource '{0}'")]
    JobInProgress(String),
}

impl PreconditionError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_provisioned(msg: impl Into<String>) -> Self {
        Self::TenantNotProvisioned(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::TenantNotFound(_) => "tenant_not_found",
            Self::TenantNotProvisioned(_) => "tenant_not_provisioned",
            Self::InvalidRequest(_) => "invalid_request",
            Self::JobInProgress(_) => "job_in_progress",
        }
    }

    /// HTTP-equivalent status for the rejection.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::TenantNotFound(_) => 404,
            Self::TenantNotProvisioned(_) => 503,
            Self::InvalidRequest(_) => 400,
            Self::JobInProgress(_) => 409,
        }
    }
}
