//! Generator adapter interface
//!
//! Every engine family binds to the run driver through [`GeneratorAdapter`].
//! The driver never holds an adapter directly: the registry wraps it in a
//! [`GeneratorHandle`], which enforces call ordering and runs every call
//! behind a protected boundary.
//!
//! # Call Order
//!
//! ```text
//! set_initial_state ─┐
//! set_seed          ─┼─ any order, before the first generate_event
//! set_param  (×N)   ─┘
//! generate_event / event_record (×N)
//! finalize (exactly once)
//! ```
//!
//! # Protected Boundary
//!
//! Native engines abort on unrecoverable errors. The reference engines model
//! that abort as a panic; the handle catches it with `catch_unwind`, reports
//! [`AdapterError::NativeFault`], and marks itself faulted. A faulted handle
//! refuses further native calls, and its `finalize` only releases the native
//! slot without touching native state.

use crate::beams::BeamSpec;
use crate::event::{BuildError, EventRecord};
use crate::registry::NativeSlot;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Errors reported by adapters and by the handle around them
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("invalid beams: {0}")]
    InvalidBeam(String),

    #[error("invalid call order: {0}")]
    State(String),

    #[error("unknown parameter '{key}'")]
    UnknownParameter { key: String },

    #[error("invalid value '{value}' for parameter '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("event generation failed: {0}")]
    Generation(String),

    #[error("no event available")]
    NoEventAvailable,

    #[error("native fault during {operation}: {message}")]
    NativeFault {
        operation: &'static str,
        message: String,
    },

    #[error("generator already finalized")]
    AlreadyFinalized,

    #[error("event record translation failed: {0}")]
    Build(#[from] BuildError),
}

/// Contract implemented by every engine binding
///
/// Implementations translate between the canonical types and their native
/// engine. They may assume single-threaded use and at most one live
/// instance per process; the registry guarantees both.
pub trait GeneratorAdapter {
    /// Generator name as registered
    fn name(&self) -> &str;

    /// Configure collision kinematics
    ///
    /// Fails with [`AdapterError::InvalidBeam`] for unsupported particle
    /// combinations.
    fn set_initial_state(&mut self, beam_a: &BeamSpec, beam_b: &BeamSpec) -> Result<(), AdapterError>;

    /// Seed the native random-number generator
    fn set_seed(&mut self, seed: u64) -> Result<(), AdapterError>;

    /// Forward one configuration value into native state
    ///
    /// Fails with [`AdapterError::UnknownParameter`] or
    /// [`AdapterError::InvalidValue`]. Meta-parameters never reach adapters.
    fn set_param(&mut self, key: &str, value: &str) -> Result<(), AdapterError>;

    /// Advance the engine by exactly one event
    ///
    /// A reported failure ([`AdapterError::Generation`]) leaves the engine
    /// finalizable.
    fn generate_event(&mut self) -> Result<(), AdapterError>;

    /// Canonical record of the most recent event
    fn event_record(&self) -> Result<EventRecord, AdapterError>;

    /// Release native resources and flush native output
    fn finalize(&mut self) -> Result<(), AdapterError>;
}

/// Lifecycle of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlePhase {
    /// Created, accepting configuration
    Configuring,

    /// At least one generation call made
    Generating,

    /// A native fault was caught; only `finalize` is allowed
    Faulted,

    /// Finalized; the native slot is free again
    Finalized,
}

/// Exclusively owned live generator instance
///
/// Created only by [`Registry::create`](crate::registry::Registry::create).
/// Dropping a handle without calling [`finalize`](Self::finalize) leaves the
/// native slot occupied for the rest of the process.
pub struct GeneratorHandle {
    name: String,
    adapter: Box<dyn GeneratorAdapter>,
    slot: Option<NativeSlot>,
    phase: HandlePhase,
    beams_set: bool,
    has_event: bool,
    attempts: u64,
}

impl std::fmt::Debug for GeneratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorHandle")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl GeneratorHandle {
    pub(crate) fn new(name: String, adapter: Box<dyn GeneratorAdapter>, slot: NativeSlot) -> Self {
        Self {
            name,
            adapter,
            slot: Some(slot),
            phase: HandlePhase::Configuring,
            beams_set: false,
            has_event: false,
            attempts: 0,
        }
    }

    /// Registered generator name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> HandlePhase {
        self.phase
    }

    /// Number of `generate_event` calls made so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Configure collision kinematics (before the first event only)
    pub fn set_initial_state(&mut self, beam_a: &BeamSpec, beam_b: &BeamSpec) -> Result<(), AdapterError> {
        self.require_configuring("set_initial_state")?;
        for beam in [beam_a, beam_b] {
            if !(beam.momentum.is_finite() && beam.momentum > 0.0) {
                return Err(AdapterError::InvalidBeam(format!(
                    "beam momentum must be positive, got {}",
                    beam.momentum
                )));
            }
        }
        self.protected("set_initial_state", |a| a.set_initial_state(beam_a, beam_b))?;
        self.beams_set = true;
        Ok(())
    }

    /// Seed the native RNG (before the first event only)
    pub fn set_seed(&mut self, seed: u64) -> Result<(), AdapterError> {
        self.require_configuring("set_seed")?;
        self.protected("set_seed", |a| a.set_seed(seed))
    }

    /// Forward one parameter (before the first event only)
    pub fn set_param(&mut self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.require_configuring("set_param")?;
        self.protected("set_param", |a| a.set_param(key, value))
    }

    /// Generate one event
    pub fn generate_event(&mut self) -> Result<(), AdapterError> {
        match self.phase {
            HandlePhase::Configuring | HandlePhase::Generating => {}
            HandlePhase::Faulted => {
                return Err(AdapterError::State(
                    "generator faulted; only finalize is allowed".to_string(),
                ))
            }
            HandlePhase::Finalized => return Err(AdapterError::AlreadyFinalized),
        }
        if !self.beams_set {
            return Err(AdapterError::State(
                "set_initial_state must be called before generating".to_string(),
            ));
        }

        self.phase = HandlePhase::Generating;
        self.attempts += 1;
        self.has_event = false;
        self.protected("generate_event", |a| a.generate_event())?;
        self.has_event = true;
        Ok(())
    }

    /// Canonical record of the most recent successful event
    pub fn event_record(&mut self) -> Result<EventRecord, AdapterError> {
        match self.phase {
            HandlePhase::Finalized => return Err(AdapterError::AlreadyFinalized),
            HandlePhase::Faulted => {
                return Err(AdapterError::State(
                    "generator faulted; only finalize is allowed".to_string(),
                ))
            }
            _ if !self.has_event => return Err(AdapterError::NoEventAvailable),
            _ => {}
        }
        self.protected("event_record", |a| a.event_record())
    }

    /// Release the engine; must be called exactly once
    ///
    /// A second call returns [`AdapterError::AlreadyFinalized`]. On a faulted
    /// handle native finalization is skipped and only the slot is released.
    pub fn finalize(&mut self) -> Result<(), AdapterError> {
        let result = match self.phase {
            HandlePhase::Finalized => return Err(AdapterError::AlreadyFinalized),
            HandlePhase::Faulted => {
                tracing::warn!(generator = %self.name, "skipping native finalize after fault");
                Ok(())
            }
            _ => self.protected("finalize", |a| a.finalize()),
        };

        self.phase = HandlePhase::Finalized;
        if let Some(slot) = self.slot.take() {
            slot.release();
        }
        tracing::debug!(generator = %self.name, "generator finalized");
        result
    }

    fn require_configuring(&self, operation: &str) -> Result<(), AdapterError> {
        match self.phase {
            HandlePhase::Configuring => Ok(()),
            HandlePhase::Finalized => Err(AdapterError::AlreadyFinalized),
            phase => Err(AdapterError::State(format!(
                "{} is only allowed before the first event (handle is {:?})",
                operation, phase
            ))),
        }
    }

    /// Run one adapter call, converting a panic into `NativeFault`
    fn protected<T>(
        &mut self,
        operation: &'static str,
        call: impl FnOnce(&mut dyn GeneratorAdapter) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let adapter = &mut *self.adapter;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(adapter)));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(AdapterError::NativeFault {
                operation,
                message: panic_message(payload.as_ref()),
            }),
        };

        if let Err(AdapterError::NativeFault { message, .. }) = &result {
            tracing::error!(generator = %self.name, operation, %message, "native fault");
            self.phase = HandlePhase::Faulted;
            self.has_event = false;
        }
        result
    }
}

impl Drop for GeneratorHandle {
    fn drop(&mut self) {
        if self.phase != HandlePhase::Finalized {
            tracing::error!(
                generator = %self.name,
                "generator handle dropped without finalize; native slot stays occupied"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown native abort".to_string()
    }
}
