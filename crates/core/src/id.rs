//! Strongly-typed identifiers used across the orchestrator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a user (one user owns one tenant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Opaque identifier of a tenant's derived-data namespace.
///
/// Assigned once by the tenant directory and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

macro_rules! impl_string_newtype {
    ($t:ty) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_newtype!(UserId);
impl_string_newtype!(ResourceId);

/// Which refresh operation an invocation performs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fresh crawl + index build.
    Ingestion,
    /// Incremental refresh of an existing index.
    Update,
}

impl JobKind {
    /// Prefix used in generated job ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            JobKind::Ingestion => "scrape",
            JobKind::Update => "update",
        }
    }
}

impl core::fmt::Display for JobKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Correlation id of a single job invocation.
///
/// Format: `{prefix}_{resourceId-or-"tenant"}_{token}`. Two invocations never
/// share an id; the id is not used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

const JOB_TOKEN_LEN: usize = 12;

impl JobId {
    /// Generate a fresh id for `kind`, tagged with the tenant resource when known.
    pub fn generate(kind: JobKind, resource_id: Option<&ResourceId>) -> Self {
        let scope = resource_id
            .filter(|r| !r.is_blank())
            .map(|r| r.as_str().trim())
            .unwrap_or("tenant");

        // UUIDv7 keeps its random bits at the tail.
        let hex = Uuid::now_v7().simple().to_string();
        let token = &hex[hex.len() - JOB_TOKEN_LEN..];

        Self(format!("{}_{}_{}", kind.prefix(), scope, token))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_carries_prefix_and_resource() {
        let id = JobId::generate(JobKind::Ingestion, Some(&ResourceId::new("t1")));
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts[0], "scrape");
        assert_eq!(parts[1], "t1");
        assert_eq!(parts[2].len(), JOB_TOKEN_LEN);
    }

    #[test]
    fn job_id_falls_back_to_tenant_scope() {
        let id = JobId::generate(JobKind::Update, None);
        assert!(id.as_str().starts_with("update_tenant_"));

        let blank = JobId::generate(JobKind::Update, Some(&ResourceId::new("  ")));
        assert!(blank.as_str().starts_with("update_tenant_"));
    }

    #[test]
    fn job_ids_are_unique_per_invocation() {
        let r = ResourceId::new("t1");
        let a = JobId::generate(JobKind::Ingestion, Some(&r));
        let b = JobId::generate(JobKind::Ingestion, Some(&r));
        assert_ne!(a, b);
    }
}
