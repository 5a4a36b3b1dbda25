//! `tenantsync-jobs`
//!
//! **Responsibility:** the pure side of external ingestion jobs.
//!
//! - Invocation options and their lenient wire parsing (`options`)
//! - The options → command-line mapping (`args`)
//! - Bounded output capture, summary markers and log truncation (`output`, `capture`)
//!
//! Nothing here spawns processes or touches the network; that lives in
//! `tenantsync-infra`.

pub mod args;
pub mod capture;
pub mod options;
pub mod output;

pub use args::build_args;
pub use capture::BoundedCapture;
pub use options::{JobOptions, RefreshRequest, parse_toggle};
pub use output::{
    DEFAULT_LOG_LIMIT, JobExecutionError, JobOutput, SUMMARY_MARKER, parse_summary_line,
    truncate_log,
};
