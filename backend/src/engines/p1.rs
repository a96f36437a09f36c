//! `p1`: string-fragmentation engine
//!
//! # Native Conventions
//!
//! - HEPEVT-style record, momenta in GeV
//! - Mothers and daughters stored as 1-based index *ranges* `(first, last)`,
//!   `0` meaning none. A daughter range is only filled when the daughters
//!   are contiguous; the mother range is always reliable.
//! - Status codes: 1 stable, 2 decayed, 3 documentation, 4 beam,
//!   11 remnant, 12 intermediate
//!
//! # Parameters
//!
//! Common-block assignments `MSTP(i)`, `MSTU(i)` (integers) and `PARP(i)`
//! (reals) for `i` in `1..=200`. Every slot is accepted; these are read:
//!
//! | Key        | Default | Meaning                                    |
//! |------------|---------|--------------------------------------------|
//! | `MSTU(4)`  | 4000    | record capacity; overflow aborts the engine |
//! | `MSTP(41)` | 1       | decay unstable hadrons (0 = off)            |
//! | `PARP(2)`  | 10.0    | lowest centre-of-mass energy (GeV)         |
//! | `PARP(90)` | 1.0     | hadron multiplicity scale                   |
//! | `PARP(91)` | 0.4     | hadron transverse kick width (GeV)          |
//!
//! Seeds above the native limit are reduced modulo 900 000 000.

use super::cascade::{self, CascadeParams, Role};
use super::{lock_native, parse_indexed, parse_int, parse_real};
use crate::adapter::{AdapterError, GeneratorAdapter};
use crate::beams::BeamSpec;
use crate::event::{build_record, Convention, EventRecord, NativeParticle, ParticleStatus};

/// Registered generator name
pub const NAME: &str = "p1";

/// Largest seed the native generator accepts (exclusive)
pub const SEED_LIMIT: u64 = 900_000_000;

/// Native → canonical translation
pub const CONVENTION: Convention = Convention {
    family: "p1",
    momentum_to_gev: 1.0,
    status_map: &[
        (1, ParticleStatus::Stable),
        (2, ParticleStatus::Decayed),
        (3, ParticleStatus::Documentation),
        (4, ParticleStatus::Beam),
        (11, ParticleStatus::BeamRemnant),
        (12, ParticleStatus::Intermediate),
    ],
};

mod native {
    use super::*;
    use crate::beams::sqrt_s;
    use crate::rng::EngineRng;
    use std::sync::Mutex;

    pub const BLOCK_SIZE: usize = 200;
    const DEFAULT_SEED: u64 = 19_780_503;

    /// One HEPEVT line
    #[derive(Debug, Clone)]
    pub struct HepEntry {
        pub isthep: i32,
        pub idhep: i32,
        pub jmohep: [usize; 2],
        pub jdahep: [usize; 2],
        pub phep: [f64; 5],
    }

    /// Common blocks plus event buffer
    pub struct Pydat {
        pub mstp: [i64; BLOCK_SIZE],
        pub mstu: [i64; BLOCK_SIZE],
        pub parp: [f64; BLOCK_SIZE],
        pub seed: u64,
        pub beams: Option<(BeamSpec, BeamSpec)>,
        pub rng: Option<EngineRng>,
        pub record: Vec<HepEntry>,
        pub process_id: i32,
        pub generated: u64,
        pub failed: u64,
    }

    impl Pydat {
        fn new() -> Self {
            let mut mstp = [0; BLOCK_SIZE];
            let mut mstu = [0; BLOCK_SIZE];
            let mut parp = [0.0; BLOCK_SIZE];
            mstu[4 - 1] = 4000;
            mstp[41 - 1] = 1;
            parp[2 - 1] = 10.0;
            parp[90 - 1] = 1.0;
            parp[91 - 1] = 0.4;
            Self {
                mstp,
                mstu,
                parp,
                seed: DEFAULT_SEED,
                beams: None,
                rng: None,
                record: Vec::new(),
                process_id: 0,
                generated: 0,
                failed: 0,
            }
        }
    }

    static PYDAT: Mutex<Option<Pydat>> = Mutex::new(None);

    /// Fresh common blocks
    pub fn reset() {
        *lock_native(&PYDAT) = Some(Pydat::new());
    }

    /// Run `f` against the common blocks
    ///
    /// # Panics
    /// Panics (native abort) if the engine is not initialised.
    pub fn with<R>(f: impl FnOnce(&mut Pydat) -> R) -> R {
        let mut guard = lock_native(&PYDAT);
        match guard.as_mut() {
            Some(state) => f(state),
            None => panic!("p1: common blocks used before initialisation"),
        }
    }

    /// Generate one event; returns 0 on success
    pub fn pyevnt() -> i32 {
        with(|s| {
            let Some((a, b)) = s.beams else {
                panic!("p1: PYEVNT called before PYINIT");
            };
            let ecm = sqrt_s(&a, &b);
            if ecm < s.parp[2 - 1] {
                s.failed += 1;
                return 1;
            }

            let seed = s.seed;
            let rng = s.rng.get_or_insert_with(|| {
                tracing::info!(ecm, seed, "p1 initialised");
                EngineRng::new(seed)
            });
            let params = CascadeParams {
                multiplicity_scale: s.parp[90 - 1],
                kt_width: s.parp[91 - 1],
                decays: s.mstp[41 - 1] != 0,
            };
            let event = cascade::generate(rng, &a, &b, &params);

            let capacity = usize::try_from(s.mstu[4 - 1]).unwrap_or(0);
            if event.len() > capacity {
                panic!(
                    "p1: HEPEVT overflow, {} entries exceed MSTU(4) = {}",
                    event.len(),
                    capacity
                );
            }

            s.record = encode(&event);
            s.process_id = match (a.kind.is_lepton(), b.kind.is_lepton()) {
                (true, true) => 1,
                (true, false) | (false, true) => 10,
                (false, false) => 11,
            };
            s.generated += 1;
            0
        })
    }

    /// Close the engine and drop its state
    pub fn pystat_and_end() -> (u64, u64) {
        let stats = with(|s| (s.generated, s.failed));
        *lock_native(&PYDAT) = None;
        stats
    }

    fn encode(event: &[cascade::ToyParticle]) -> Vec<HepEntry> {
        let children = cascade::children(event);
        event
            .iter()
            .zip(children)
            .map(|(p, kids)| HepEntry {
                isthep: match p.role {
                    Role::Final => 1,
                    Role::Decayed => 2,
                    Role::Incoming | Role::Outgoing => 3,
                    Role::Beam => 4,
                    Role::Remnant => 11,
                    Role::Shower => 12,
                },
                idhep: p.pdg_id,
                jmohep: one_based_range(&p.parents),
                jdahep: one_based_range(&kids),
                phep: [
                    p.momentum.px,
                    p.momentum.py,
                    p.momentum.pz,
                    p.momentum.e,
                    p.momentum.mass(),
                ],
            })
            .collect()
    }

    /// `(first, last)` for a contiguous run of 0-based positions, else `(0, 0)`
    fn one_based_range(positions: &[usize]) -> [usize; 2] {
        match (positions.first(), positions.last()) {
            (Some(&first), Some(&last)) if last - first + 1 == positions.len() => {
                [first + 1, last + 1]
            }
            _ => [0, 0],
        }
    }
}

/// Reduce a seed to the native range
pub fn native_seed(seed: u64) -> u64 {
    seed % SEED_LIMIT
}

fn expand_range([first, last]: [usize; 2]) -> Vec<usize> {
    if first == 0 {
        Vec::new()
    } else {
        (first..=last).collect()
    }
}

/// Adapter for the `p1` family
///
/// Also used by [`p1me`](super::p1me), which reports its own name.
pub struct P1Adapter {
    name: &'static str,
    event_number: u64,
}

impl P1Adapter {
    pub(crate) fn new(name: &'static str) -> Self {
        native::reset();
        Self {
            name,
            event_number: 0,
        }
    }
}

impl GeneratorAdapter for P1Adapter {
    fn name(&self) -> &str {
        self.name
    }

    fn set_initial_state(&mut self, beam_a: &BeamSpec, beam_b: &BeamSpec) -> Result<(), AdapterError> {
        native::with(|s| s.beams = Some((*beam_a, *beam_b)));
        Ok(())
    }

    fn set_seed(&mut self, seed: u64) -> Result<(), AdapterError> {
        let reduced = native_seed(seed);
        if reduced != seed {
            tracing::warn!(seed, reduced, "seed exceeds native limit; reduced");
        }
        native::with(|s| s.seed = reduced);
        Ok(())
    }

    fn set_param(&mut self, key: &str, value: &str) -> Result<(), AdapterError> {
        let unknown = || AdapterError::UnknownParameter {
            key: key.to_string(),
        };
        let (block, index) = parse_indexed(key).ok_or_else(unknown)?;
        if !(1..=native::BLOCK_SIZE).contains(&index) {
            return Err(unknown());
        }
        let slot = index - 1;

        match block.as_str() {
            "MSTP" => {
                let v = parse_int(key, value)?;
                native::with(|s| s.mstp[slot] = v);
            }
            "MSTU" => {
                let v = parse_int(key, value)?;
                if index == 4 && v < 1 {
                    return Err(AdapterError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "positive integer",
                    });
                }
                native::with(|s| s.mstu[slot] = v);
            }
            "PARP" => {
                let v = parse_real(key, value)?;
                native::with(|s| s.parp[slot] = v);
            }
            _ => return Err(unknown()),
        }
        tracing::debug!(generator = self.name, key, value, "common block set");
        Ok(())
    }

    fn generate_event(&mut self) -> Result<(), AdapterError> {
        match native::pyevnt() {
            0 => {
                self.event_number += 1;
                Ok(())
            }
            code => Err(AdapterError::Generation(format!(
                "p1 event routine returned {} (centre-of-mass energy below PARP(2))",
                code
            ))),
        }
    }

    fn event_record(&self) -> Result<EventRecord, AdapterError> {
        let (entries, process_id) = native::with(|s| (s.record.clone(), s.process_id));
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
                momentum: [e.phep[0], e.phep[1], e.phep[2], e.phep[3]],
                parents: expand_range(e.jmohep),
                children: expand_range(e.jdahep),
            })
            .collect();

        Ok(build_record(&particles, &CONVENTION, self.event_number, 1.0, process_id)?)
    }

    fn finalize(&mut self) -> Result<(), AdapterError> {
        let (generated, failed) = native::pystat_and_end();
        tracing::debug!(generator = self.name, generated, failed, "p1 statistics");
        Ok(())
    }
}
