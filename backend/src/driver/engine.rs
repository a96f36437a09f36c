//! Run driver engine
//!
//! Drives one generator through a complete run:
//!
//! ```text
//! Idle ──create + configure──▶ Configured ──▶ Running ──┬─▶ Completed
//!                                                        ├─▶ Aborted
//!                                                        └─▶ Interrupted
//!                          (every terminal state) ──finalize once──▶ Finalized
//! ```
//!
//! For each iteration:
//! 1. Check the cancellation token
//! 2. Generate one event (no retry on failure)
//! 3. Fetch the canonical record
//! 4. Apply the filter level
//! 5. Hand the filtered record to the writer
//!
//! Errors before the handle exists are returned as [`RunError`]. Once the
//! handle exists every failure ends in a [`RunReport`] with an aborted
//! outcome, and the handle is finalized exactly once.

use super::config::{RunConfig, RunError};
use crate::adapter::{AdapterError, GeneratorHandle};
use crate::event::{filter_record, EventWriter, FilterLevel, RunHeader};
use crate::registry::Registry;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative stop request, observed only between iterations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; safe to call from a signal handler thread
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Run state and outcome
// ============================================================================

/// Driver phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Configured,
    Running,
    Completed,
    Aborted,
    Interrupted,
    Finalized,
}

/// Counters mutated only by the driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub seed: u64,
    pub requested: u64,
    pub generated: u64,
    pub failed: u64,
    pub filter_level: u8,
    pub cancelled: bool,
}

impl RunState {
    fn new(config: &RunConfig) -> Self {
        Self {
            seed: config.seed,
            requested: config.num_events,
            generated: 0,
            failed: 0,
            filter_level: config.filter.level(),
            cancelled: false,
        }
    }
}

/// Why a run stopped early with a failure
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AbortCause {
    #[error("configuration rejected: {0}")]
    Configuration(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("native fault: {0}")]
    NativeFault(String),

    #[error("output failed: {0}")]
    Output(String),

    #[error("finalize failed: {0}")]
    Finalize(String),
}

impl AbortCause {
    fn from_adapter(err: AdapterError) -> Self {
        match err {
            AdapterError::NativeFault { .. } => AbortCause::NativeFault(err.to_string()),
            AdapterError::Generation(_) => AbortCause::Generation(err.to_string()),
            AdapterError::InvalidBeam(_)
            | AdapterError::UnknownParameter { .. }
            | AdapterError::InvalidValue { .. } => AbortCause::Configuration(err.to_string()),
            other => AbortCause::Generation(other.to_string()),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every requested event was produced
    Completed,

    /// Stopped by the cancellation token; produced events are valid
    Interrupted { produced: u64, requested: u64 },

    /// Stopped by a failure; events written before it are retained
    Aborted { cause: AbortCause },
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generator: String,
    pub outcome: RunOutcome,
    pub state: RunState,

    /// SHA-256 of the resolved configuration
    pub config_fingerprint: String,
}

impl RunReport {
    /// Process exit status: 0 completed or interrupted, 3 aborted
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Completed | RunOutcome::Interrupted { .. } => 0,
            RunOutcome::Aborted { .. } => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Runs one configuration against a registry
pub struct RunDriver<'r> {
    registry: &'r Registry,
    cancel: CancellationToken,
    phase: RunPhase,
}

impl<'r> RunDriver<'r> {
    pub fn new(registry: &'r Registry, cancel: CancellationToken) -> Self {
        Self {
            registry,
            cancel,
            phase: RunPhase::Idle,
        }
    }

    /// Current phase (Finalized after a run returns a report)
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Execute a run
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Registry`] when the generator cannot be created.
    /// Every later failure is reported through [`RunOutcome::Aborted`].
    pub fn run(&mut self, config: &RunConfig, writer: &mut dyn EventWriter) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4().to_string();
        let mut state = RunState::new(config);
        self.phase = RunPhase::Idle;

        let mut handle = self.registry.create(&config.generator)?;
        tracing::info!(
            %run_id,
            generator = %config.generator,
            beam_a = %config.beam_a,
            beam_b = %config.beam_b,
            seed = config.seed,
            events = config.num_events,
            "run started"
        );

        let mut outcome = match configure(&mut handle, config) {
            Ok(()) => {
                self.transition(RunPhase::Configured);
                let header = RunHeader {
                    run_id: run_id.clone(),
                    generator: config.generator.clone(),
                    beam_a: config.beam_a,
                    beam_b: config.beam_b,
                    seed: config.seed,
                    filter_level: config.filter.level(),
                };
                match writer.write_header(&header) {
                    Ok(()) => self.event_loop(&mut handle, config.filter, writer, &mut state),
                    Err(e) => RunOutcome::Aborted {
                        cause: AbortCause::Output(e.to_string()),
                    },
                }
            }
            Err(err) => RunOutcome::Aborted {
                cause: AbortCause::from_adapter(err),
            },
        };

        // Flush whatever was produced, even after a failure
        if let Err(e) = writer.finish() {
            if !matches!(outcome, RunOutcome::Aborted { .. }) {
                outcome = RunOutcome::Aborted {
                    cause: AbortCause::Output(e.to_string()),
                };
            }
        }

        self.transition(match outcome {
            RunOutcome::Completed => RunPhase::Completed,
            RunOutcome::Interrupted { .. } => RunPhase::Interrupted,
            RunOutcome::Aborted { .. } => RunPhase::Aborted,
        });

        if let Err(err) = handle.finalize() {
            tracing::error!(error = %err, "finalize failed");
            if !matches!(outcome, RunOutcome::Aborted { .. }) {
                outcome = RunOutcome::Aborted {
                    cause: AbortCause::Finalize(err.to_string()),
                };
            }
        }
        self.transition(RunPhase::Finalized);

        match &outcome {
            RunOutcome::Completed => {
                tracing::info!(generated = state.generated, "run completed")
            }
            RunOutcome::Interrupted { produced, requested } => {
                tracing::warn!(produced, requested, "run interrupted; fewer events than requested")
            }
            RunOutcome::Aborted { cause } => {
                tracing::error!(generated = state.generated, %cause, "run aborted")
            }
        }

        Ok(RunReport {
            run_id,
            generator: config.generator.clone(),
            outcome,
            state,
            config_fingerprint: config.fingerprint(),
        })
    }

    fn event_loop(
        &mut self,
        handle: &mut GeneratorHandle,
        filter: FilterLevel,
        writer: &mut dyn EventWriter,
        state: &mut RunState,
    ) -> RunOutcome {
        self.transition(RunPhase::Running);

        for _ in 0..state.requested {
            if self.cancel.is_cancelled() {
                state.cancelled = true;
                return RunOutcome::Interrupted {
                    produced: state.generated,
                    requested: state.requested,
                };
            }

            if let Err(err) = handle.generate_event() {
                state.failed += 1;
                return RunOutcome::Aborted {
                    cause: AbortCause::from_adapter(err),
                };
            }

            let record = match handle.event_record() {
                Ok(record) => record,
                Err(err) => {
                    state.failed += 1;
                    return RunOutcome::Aborted {
                        cause: AbortCause::from_adapter(err),
                    };
                }
            };
            let filtered = filter_record(&record, filter);

            if let Err(e) = writer.write_event(&filtered) {
                return RunOutcome::Aborted {
                    cause: AbortCause::Output(e.to_string()),
                };
            }
            state.generated += 1;
            tracing::debug!(
                event = record.event_number,
                particles = record.len(),
                kept = filtered.len(),
                "event written"
            );
        }

        RunOutcome::Completed
    }

    fn transition(&mut self, next: RunPhase) {
        tracing::debug!(from = ?self.phase, to = ?next, "run phase");
        self.phase = next;
    }
}

/// Push beams, seed, and engine parameters, in that order
fn configure(handle: &mut GeneratorHandle, config: &RunConfig) -> Result<(), AdapterError> {
    handle.set_initial_state(&config.beam_a, &config.beam_b)?;
    handle.set_seed(config.seed)?;
    for (key, value) in config.params.iter() {
        handle.set_param(key, value)?;
        tracing::debug!(key, value, "parameter forwarded");
    }
    Ok(())
}
