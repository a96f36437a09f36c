//! `p1me`: `p1` showering events from an external matrix-element supply
//!
//! The supply is a second native library with its own global state. Each
//! `generate_event` draws hard-process events from it until one passes the
//! matching veto, then hands that event to `p1`.
//!
//! Accepts every `p1` parameter plus:
//!
//! - `ME:NEVENTS`: number of events in the supply (default unlimited)
//! - `ME:VETO`: matching veto probability in `[0, 1)` (default 0)
//!
//! Running out of supply is a generation failure.

use super::p1::{self, P1Adapter};
use super::{lock_native, parse_int, parse_real};
use crate::adapter::{AdapterError, GeneratorAdapter};
use crate::beams::BeamSpec;
use crate::event::EventRecord;
use crate::rng::EngineRng;
use std::sync::Mutex;

/// Registered generator name
pub const NAME: &str = "p1me";

/// Mixed into the seed so the veto stream differs from the shower stream
const VETO_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

struct MeSupply {
    remaining: Option<u64>,
    veto: f64,
    rng: EngineRng,
    drawn: u64,
    vetoed: u64,
}

static ME_SUPPLY: Mutex<Option<MeSupply>> = Mutex::new(None);

fn with_supply<R>(f: impl FnOnce(&mut MeSupply) -> R) -> R {
    let mut guard = lock_native(&ME_SUPPLY);
    match guard.as_mut() {
        Some(supply) => f(supply),
        None => panic!("p1me: matrix-element supply not open"),
    }
}

/// Draw until an event survives the veto; `None` once the supply is empty
fn next_accepted() -> Option<u64> {
    with_supply(|me| loop {
        match me.remaining {
            Some(0) => return None,
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        me.drawn += 1;
        if !me.rng.chance(me.veto) {
            return Some(me.drawn);
        }
        me.vetoed += 1;
    })
}

/// Adapter combining `p1` with the matrix-element supply
pub struct P1MeAdapter {
    shower: P1Adapter,
}

impl P1MeAdapter {
    pub(crate) fn new() -> Self {
        *lock_native(&ME_SUPPLY) = Some(MeSupply {
            remaining: None,
            veto: 0.0,
            rng: EngineRng::new(p1::SEED_LIMIT ^ VETO_STREAM),
            drawn: 0,
            vetoed: 0,
        });
        Self {
            shower: P1Adapter::new(NAME),
        }
    }
}

impl GeneratorAdapter for P1MeAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn set_initial_state(&mut self, beam_a: &BeamSpec, beam_b: &BeamSpec) -> Result<(), AdapterError> {
        self.shower.set_initial_state(beam_a, beam_b)
    }

    fn set_seed(&mut self, seed: u64) -> Result<(), AdapterError> {
        with_supply(|me| me.rng = EngineRng::new(seed ^ VETO_STREAM));
        self.shower.set_seed(seed)
    }

    fn set_param(&mut self, key: &str, value: &str) -> Result<(), AdapterError> {
        match key.trim().to_ascii_uppercase().as_str() {
            "ME:NEVENTS" => {
                let n = parse_int(key, value)?;
                let n = u64::try_from(n).map_err(|_| AdapterError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "non-negative integer",
                })?;
                with_supply(|me| me.remaining = Some(n));
                Ok(())
            }
            "ME:VETO" => {
                let p = parse_real(key, value)?;
                if !(0.0..1.0).contains(&p) {
                    return Err(AdapterError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "probability in [0, 1)",
                    });
                }
                with_supply(|me| me.veto = p);
                Ok(())
            }
            _ => self.shower.set_param(key, value),
        }
    }

    fn generate_event(&mut self) -> Result<(), AdapterError> {
        let Some(drawn) = next_accepted() else {
            return Err(AdapterError::Generation(
                "matrix-element event supply exhausted".to_string(),
            ));
        };
        tracing::trace!(drawn, "matrix-element event accepted");
        self.shower.generate_event()
    }

    fn event_record(&self) -> Result<EventRecord, AdapterError> {
        self.shower.event_record()
    }

    fn finalize(&mut self) -> Result<(), AdapterError> {
        let (drawn, vetoed) = with_supply(|me| (me.drawn, me.vetoed));
        *lock_native(&ME_SUPPLY) = None;
        tracing::debug!(generator = NAME, drawn, vetoed, "matrix-element supply closed");
        self.shower.finalize()
    }
}
