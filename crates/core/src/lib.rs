//! `tenantsync-core` — shared building blocks for the content-refresh orchestrator.
//!
//! This crate contains **pure** primitives (no IO, no runtime): identifiers,
//! the resolved tenant context and the precondition error model.

pub mod error;
pub mod id;
pub mod tenant;

pub use error::{PreconditionError, PreconditionResult};
pub use id::{JobId, JobKind, ResourceId, UserId};
pub use tenant::TenantContext;
