//! Event Generator Core
//!
//! Uniform control over stateful, single-instance event-generation engines.
//!
//! # Architecture
//!
//! - **params**: ordered parameter dictionary and parameter files
//! - **search**: generator and parameter-file search path
//! - **beams**: beam specification strings
//! - **event**: canonical event record, builder, filter, writers
//! - **adapter**: generator contract and the protected handle around it
//! - **engines**: in-tree reference engines (`p1`, `h1`, `p1me`)
//! - **registry**: name → binding table, single-instance slot
//! - **driver**: run configuration and the run state machine
//! - **rng**: xorshift generator used by the engines
//!
//! # Critical Invariants
//!
//! 1. At most one live generator handle per process
//! 2. Every handle is finalized exactly once by its owner
//! 3. Event records never contain dangling parent or child links
//! 4. Momenta are GeV in every canonical record

// Module declarations
pub mod adapter;
pub mod beams;
pub mod driver;
pub mod engines;
pub mod event;
pub mod params;
pub mod registry;
pub mod rng;
pub mod search;

// Re-exports for convenience
pub use adapter::{AdapterError, GeneratorAdapter, GeneratorHandle, HandlePhase};
pub use beams::{parse_beam_spec, BeamError, BeamSpec, ParticleKind};
pub use driver::{
    CancellationToken, RunConfig, RunDriver, RunError, RunOutcome, RunReport, RunRequest,
};
pub use event::{
    filter_record, EventRecord, EventWriter, FilterLevel, FourMomentum, OutputFormat, Particle,
    ParticleStatus, Precision,
};
pub use params::{load_parameter_file, ParamError, ParamFileError, ParameterDictionary};
pub use registry::{BindingDescriptor, Linkage, Registry, RegistryError};
pub use search::SearchPath;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn evgen_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::runner::PyRunner>()?;
    Ok(())
}
