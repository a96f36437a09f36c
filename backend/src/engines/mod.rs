//! Reference native engines
//!
//! In-tree stand-ins for the legacy generator libraries, one module per
//! engine family. Each keeps its "native" state in a process-global
//! `static Mutex`, follows an init/event/end call sequence, reports
//! per-event failure through an integer return code, and panics where the
//! real library would abort the process.
//!
//! # Families
//!
//! | Name   | Record style              | Units | Parameters                        |
//! |--------|---------------------------|-------|-----------------------------------|
//! | `p1`   | mother/daughter ranges    | GeV   | `MSTP(n)`, `MSTU(n)`, `PARP(n)`   |
//! | `h1`   | explicit parent pairs     | MeV   | `IPROC`, `PTMIN`, `NRN(n)`, `MAXER` |
//! | `p1me` | as `p1`                   | GeV   | `p1` plus `ME:NEVENTS`, `ME:VETO` |
//!
//! Adapters are only reachable through the [`Registry`](crate::registry::Registry),
//! which guarantees a single live instance per process.

pub(crate) mod cascade;
pub mod h1;
pub mod p1;
pub mod p1me;

use crate::adapter::{AdapterError, GeneratorAdapter};
use crate::registry::BindingDescriptor;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Descriptors for every in-tree engine
pub fn builtin_bindings() -> Vec<BindingDescriptor> {
    vec![
        BindingDescriptor::new(
            p1::NAME,
            "p1",
            "string-fragmentation engine, HEPEVT-style record",
            Box::new(|| Ok(Box::new(p1::P1Adapter::new(p1::NAME)) as Box<dyn GeneratorAdapter>)),
        ),
        BindingDescriptor::new(
            h1::NAME,
            "h1",
            "cluster-style engine, MeV record with parent pairs",
            Box::new(|| Ok(Box::new(h1::H1Adapter::new()) as Box<dyn GeneratorAdapter>)),
        ),
        BindingDescriptor::new(
            p1me::NAME,
            "p1",
            "p1 fed by an external matrix-element event supply",
            Box::new(|| Ok(Box::new(p1me::P1MeAdapter::new()) as Box<dyn GeneratorAdapter>)),
        ),
    ]
}

/// Lock native state, recovering it after an earlier native abort
pub(crate) fn lock_native<T>(state: &'static Mutex<T>) -> MutexGuard<'static, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Split a common-block key `NAME(i)` into its upper-cased name and index
pub(crate) fn parse_indexed(key: &str) -> Option<(String, usize)> {
    let key = key.trim();
    let open = key.find('(')?;
    let inner = key[open + 1..].strip_suffix(')')?;
    let index = inner.trim().parse().ok()?;
    let name = key[..open].trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_uppercase(), index))
}

/// Coerce a value to a native integer
pub(crate) fn parse_int(key: &str, value: &str) -> Result<i64, AdapterError> {
    value.trim().parse().map_err(|_| AdapterError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: "integer",
    })
}

/// Coerce a value to a native real; Fortran `D` exponents are accepted
pub(crate) fn parse_real(key: &str, value: &str) -> Result<f64, AdapterError> {
    let normalized = value.trim().replace(['d', 'D'], "e");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AdapterError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "real number",
        })
}
