//! `h1`: cluster-style engine
//!
//! # Native Conventions
//!
//! - Momenta in MeV
//! - Each entry stores up to two explicit parents (`JMOHEP`), `0` = none;
//!   daughters are not stored
//! - Status codes: 1 stable, 2 decayed, 3 remnant, 101/102 beams,
//!   120 hard-process documentation, 141–144 shower intermediates,
//!   197 decayed intermediate
//!
//! # Parameters
//!
//! | Key      | Default | Meaning                                          |
//! |----------|---------|--------------------------------------------------|
//! | `IPROC`  | 1500    | process code, reported as the event process id   |
//! | `PTMIN`  | 10.0    | minimum hard transverse momentum (GeV)           |
//! | `NRN(1)` | 17673   | first random seed word                           |
//! | `NRN(2)` | 63565   | second random seed word                          |
//! | `MAXER`  | 10      | failed events tolerated before the engine aborts |
//!
//! Only pp, pp̄ and e⁺e⁻ collisions are supported. When `2 × PTMIN`
//! exceeds the centre-of-mass energy no event can pass the cut and every
//! generation call fails.

use super::cascade::{self, CascadeParams, Role};
use super::{lock_native, parse_indexed, parse_int, parse_real};
use crate::adapter::{AdapterError, GeneratorAdapter};
use crate::beams::{sqrt_s, BeamSpec, ParticleKind};
use crate::event::{build_record, Convention, EventRecord, NativeParticle, ParticleStatus};
use crate::rng::EngineRng;
use std::sync::Mutex;

/// Registered generator name
pub const NAME: &str = "h1";

const MEV_PER_GEV: f64 = 1000.0;

/// Native → canonical translation
pub const CONVENTION: Convention = Convention {
    family: "h1",
    momentum_to_gev: 1e-3,
    status_map: &[
        (1, ParticleStatus::Stable),
        (2, ParticleStatus::Decayed),
        (3, ParticleStatus::BeamRemnant),
        (101, ParticleStatus::Beam),
        (102, ParticleStatus::Beam),
        (120, ParticleStatus::Documentation),
        (141, ParticleStatus::Intermediate),
        (142, ParticleStatus::Intermediate),
        (143, ParticleStatus::Intermediate),
        (144, ParticleStatus::Intermediate),
        (197, ParticleStatus::Intermediate),
    ],
};

#[derive(Debug, Clone)]
struct HwEntry {
    isthep: i32,
    idhep: i32,
    jmohep: [usize; 2],
    phep_mev: [f64; 4],
}

struct HwState {
    iproc: i64,
    ptmin: f64,
    nrn: [i64; 2],
    maxer: i64,
    beams: Option<(BeamSpec, BeamSpec)>,
    rng: Option<EngineRng>,
    record: Vec<HwEntry>,
    errors: i64,
    generated: u64,
}

impl HwState {
    fn new() -> Self {
        Self {
            iproc: 1500,
            ptmin: 10.0,
            nrn: [17673, 63565],
            maxer: 10,
            beams: None,
            rng: None,
            record: Vec::new(),
            errors: 0,
            generated: 0,
        }
    }

    fn seed(&self) -> u64 {
        let hi = (self.nrn[0] as u64) & 0xFFFF_FFFF;
        let lo = (self.nrn[1] as u64) & 0xFFFF_FFFF;
        (hi << 32) | lo
    }
}

static HWEVNT: Mutex<Option<HwState>> = Mutex::new(None);

fn with_native<R>(f: impl FnOnce(&mut HwState) -> R) -> R {
    let mut guard = lock_native(&HWEVNT);
    match guard.as_mut() {
        Some(state) => f(state),
        None => panic!("h1: engine used before HWIGIN"),
    }
}

/// One event; 0 = accepted, 1 = failed the `PTMIN` cut
fn hwevnt() -> i32 {
    with_native(|s| {
        let Some((a, b)) = s.beams else {
            panic!("h1: HWEVNT called before beams were set");
        };

        if 2.0 * s.ptmin > sqrt_s(&a, &b) {
            s.errors += 1;
            if s.errors > s.maxer {
                panic!("h1: HWWARN, more than MAXER = {} event errors", s.maxer);
            }
            return 1;
        }

        let seed = s.seed();
        let rng = s.rng.get_or_insert_with(|| EngineRng::new(seed));
        let event = cascade::generate(rng, &a, &b, &CascadeParams::default());

        let mut showers = 0;
        s.record = event
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let isthep = match p.role {
                    Role::Beam => 101 + i as i32,
                    Role::Incoming | Role::Outgoing => 120,
                    Role::Remnant => 3,
                    Role::Shower => {
                        showers += 1;
                        140 + showers.min(4)
                    }
                    Role::Decayed => 2,
                    Role::Final => 1,
                };
                let mut jmohep = [0; 2];
                for (slot, parent) in jmohep.iter_mut().zip(&p.parents) {
                    *slot = parent + 1;
                }
                let m = p.momentum.scaled(MEV_PER_GEV);
                HwEntry {
                    isthep,
                    idhep: p.pdg_id,
                    jmohep,
                    phep_mev: [m.px, m.py, m.pz, m.e],
                }
            })
            .collect();
        s.generated += 1;
        0
    })
}

fn supported(a: ParticleKind, b: ParticleKind) -> bool {
    use ParticleKind::*;
    matches!(
        (a, b),
        (Proton, Proton)
            | (Proton, Antiproton)
            | (Antiproton, Proton)
            | (Electron, Positron)
            | (Positron, Electron)
    )
}

/// Adapter for the `h1` family
pub struct H1Adapter {
    event_number: u64,
}

impl H1Adapter {
    pub(crate) fn new() -> Self {
        *lock_native(&HWEVNT) = Some(HwState::new());
        Self { event_number: 0 }
    }
}

impl GeneratorAdapter for H1Adapter {
    fn name(&self) -> &str {
        NAME
    }

    fn set_initial_state(&mut self, beam_a: &BeamSpec, beam_b: &BeamSpec) -> Result<(), AdapterError> {
        if !supported(beam_a.kind, beam_b.kind) {
            return Err(AdapterError::InvalidBeam(format!(
                "h1 supports pp, p pbar and e+e- collisions, not {} on {}",
                beam_a.kind, beam_b.kind
            )));
        }
        with_native(|s| s.beams = Some((*beam_a, *beam_b)));
        Ok(())
    }

    fn set_seed(&mut self, seed: u64) -> Result<(), AdapterError> {
        let words = [(seed >> 32) as i64, (seed & 0xFFFF_FFFF) as i64];
        with_native(|s| s.nrn = words);
        Ok(())
    }

    fn set_param(&mut self, key: &str, value: &str) -> Result<(), AdapterError> {
        let upper = key.trim().to_ascii_uppercase();
        match upper.as_str() {
            "IPROC" => {
                let v = parse_int(key, value)?;
                if v <= 0 {
                    return Err(AdapterError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "positive process code",
                    });
                }
                with_native(|s| s.iproc = v);
            }
            "PTMIN" => {
                let v = parse_real(key, value)?;
                if v < 0.0 {
                    return Err(AdapterError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "non-negative transverse momentum",
                    });
                }
                with_native(|s| s.ptmin = v);
            }
            "MAXER" => {
                let v = parse_int(key, value)?;
                with_native(|s| s.maxer = v);
            }
            _ => match parse_indexed(key) {
                Some((name, index @ 1..=2)) if name == "NRN" => {
                    let v = parse_int(key, value)?;
                    with_native(|s| s.nrn[index - 1] = v);
                }
                _ => {
                    return Err(AdapterError::UnknownParameter {
                        key: key.to_string(),
                    })
                }
            },
        }
        tracing::debug!(generator = NAME, key, value, "parameter set");
        Ok(())
    }

    fn generate_event(&mut self) -> Result<(), AdapterError> {
        match hwevnt() {
            0 => {
                self.event_number += 1;
                Ok(())
            }
            _ => {
                let (ptmin, errors) = with_native(|s| (s.ptmin, s.errors));
                Err(AdapterError::Generation(format!(
                    "h1 rejected event: PTMIN = {} GeV is above the kinematic limit ({} errors so far)",
                    ptmin, errors
                )))
            }
        }
    }

    fn event_record(&self) -> Result<EventRecord, AdapterError> {
        let (entries, iproc) = with_native(|s| (s.record.clone(), s.iproc));
        if entries.is_empty() {
            return Err(AdapterError::NoEventAvailable);
        }

        let particles: Vec<NativeParticle> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| NativeParticle {
                index: i + 1,
                pdg_id: e.idhep,
                status: e.isthep,
                momentum: e.phep_mev,
                parents: e.jmohep.iter().copied().filter(|&m| m != 0).collect(),
                children: Vec::new(),
            })
            .collect();

        let process_id = i32::try_from(iproc).unwrap_or(i32::MAX);
        Ok(build_record(&particles, &CONVENTION, self.event_number, 1.0, process_id)?)
    }

    fn finalize(&mut self) -> Result<(), AdapterError> {
        let (generated, errors) = with_native(|s| (s.generated, s.errors));
        *lock_native(&HWEVNT) = None;
        tracing::debug!(generator = NAME, generated, errors, "h1 statistics");
        Ok(())
    }
}
