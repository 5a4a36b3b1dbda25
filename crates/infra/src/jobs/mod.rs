//! External job execution.
//!
//! ## Components
//!
//! - `JobRunner`: async seam the orchestrator runs jobs through
//! - `ProcessJobRunner`: spawns the job as a child process and captures its output

pub mod runner;

pub use runner::{JobRunner, ProcessJobRunner};
