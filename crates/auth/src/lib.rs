//! `tenantsync-auth` — caller identity and tenant-ownership policy.
//!
//! This crate is intentionally decoupled from HTTP and token formats: callers
//! hand it an already-authenticated principal.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;

pub use authorize::{authorize_tenant_access, AuthzError};
pub use claims::TokenClaims;
pub use principal::Principal;
pub use roles::Role;
