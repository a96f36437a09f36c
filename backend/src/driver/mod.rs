//! Run driver
//!
//! - **config**: request validation into a [`RunConfig`]
//! - **engine**: the run state machine and its report

pub mod config;
pub mod engine;

pub use config::{RunConfig, RunError, RunRequest, DEFAULT_SEED};
pub use engine::{
    AbortCause, CancellationToken, RunDriver, RunOutcome, RunPhase, RunReport, RunState,
};
