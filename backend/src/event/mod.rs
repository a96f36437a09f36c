//! Canonical event record
//!
//! One simulated collision as a directed acyclic graph of particles,
//! independent of the engine that produced it.
//!
//! # Invariants
//!
//! - Particle ids are unique and strictly increasing in `particles`
//! - Every parent and child id refers to a particle in the same record
//! - Links are symmetric: `c` lists `p` as parent iff `p` lists `c` as child
//! - Momenta are in GeV
//!
//! A particle may have several parents (string fragments, shared
//! intermediate states), so the structure is a DAG rather than a tree.
//!
//! # Submodules
//!
//! - **builder**: native particle list → `EventRecord`
//! - **filter**: retention levels
//! - **writer**: output formats

pub mod builder;
pub mod filter;
pub mod writer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use builder::{build_record, BuildError, Convention, NativeParticle};
pub use filter::{filter_record, FilterLevel};
pub use writer::{AsciiWriter, EventWriter, JsonLinesWriter, OutputFormat, Precision, RunHeader};

/// Four-momentum `(px, py, pz, E)` in GeV
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FourMomentum {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl FourMomentum {
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self { px, py, pz, e }
    }

    /// Multiply every component by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.px * factor,
            self.py * factor,
            self.pz * factor,
            self.e * factor,
        )
    }

    /// Invariant mass (GeV); negative mass-squared clamps to zero
    pub fn mass(&self) -> f64 {
        let m2 = self.e * self.e - self.px * self.px - self.py * self.py - self.pz * self.pz;
        m2.max(0.0).sqrt()
    }

    /// Transverse momentum (GeV)
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }
}

impl std::ops::Add for FourMomentum {
    type Output = FourMomentum;

    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(
            self.px + rhs.px,
            self.py + rhs.py,
            self.pz + rhs.pz,
            self.e + rhs.e,
        )
    }
}

/// Canonical particle status
///
/// Every engine family maps its native status codes onto this enumeration
/// through its [`Convention`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleStatus {
    /// Stable final-state particle
    Stable,

    /// Physical particle that decayed inside the generator
    Decayed,

    /// Incoming beam particle (documentation)
    Beam,

    /// Hard-process documentation entry
    Documentation,

    /// Shower or string intermediate
    Intermediate,

    /// Beam remnant
    BeamRemnant,

    /// Native code with no canonical meaning, kept verbatim
    Other(i32),
}

impl ParticleStatus {
    /// Output status code
    ///
    /// 1 stable, 2 decayed, 3 documentation, 4 beam, 11 beam remnant,
    /// 12 intermediate; unmapped native codes pass through unchanged.
    pub fn code(self) -> i32 {
        match self {
            ParticleStatus::Stable => 1,
            ParticleStatus::Decayed => 2,
            ParticleStatus::Documentation => 3,
            ParticleStatus::Beam => 4,
            ParticleStatus::BeamRemnant => 11,
            ParticleStatus::Intermediate => 12,
            ParticleStatus::Other(code) => code,
        }
    }
}

/// One particle of an event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Local identity, unique within the record
    pub id: usize,

    /// PDG particle code
    pub pdg_id: i32,

    /// Four-momentum in GeV
    pub momentum: FourMomentum,

    pub status: ParticleStatus,

    /// Parent ids, ascending
    pub parents: Vec<usize>,

    /// Child ids, ascending
    pub children: Vec<usize>,
}

/// One generated event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based event number within the run
    pub event_number: u64,

    /// Event weight (1.0 for unweighted engines)
    pub weight: f64,

    /// Native process identifier
    pub process_id: i32,

    /// Particles ordered by id
    pub particles: Vec<Particle>,
}

/// Structural defect found by [`EventRecord::validate`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("particle ids not strictly increasing at position {0}")]
    UnorderedIds(usize),

    #[error("particle {particle} references missing particle {missing}")]
    Dangling { particle: usize, missing: usize },

    #[error("link {parent} -> {child} recorded on one side only")]
    AsymmetricLink { parent: usize, child: usize },
}

impl EventRecord {
    /// Look up a particle by id
    pub fn particle(&self, id: usize) -> Option<&Particle> {
        self.particles
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|pos| &self.particles[pos])
    }

    /// Number of particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if the record holds no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Set of particle ids
    pub fn ids(&self) -> BTreeSet<usize> {
        self.particles.iter().map(|p| p.id).collect()
    }

    /// Particles with no parents
    pub fn roots(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.parents.is_empty())
    }

    /// Check the structural invariants listed in the module docs
    pub fn validate(&self) -> Result<(), RecordError> {
        for (pos, pair) in self.particles.windows(2).enumerate() {
            if pair[0].id >= pair[1].id {
                return Err(RecordError::UnorderedIds(pos + 1));
            }
        }

        for particle in &self.particles {
            for &child in &particle.children {
                let target = self.particle(child).ok_or(RecordError::Dangling {
                    particle: particle.id,
                    missing: child,
                })?;
                if !target.parents.contains(&particle.id) {
                    return Err(RecordError::AsymmetricLink {
                        parent: particle.id,
                        child,
                    });
                }
            }
            for &parent in &particle.parents {
                let source = self.particle(parent).ok_or(RecordError::Dangling {
                    particle: particle.id,
                    missing: parent,
                })?;
                if !source.children.contains(&particle.id) {
                    return Err(RecordError::AsymmetricLink {
                        parent,
                        child: particle.id,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(id: usize, parents: Vec<usize>, children: Vec<usize>) -> Particle {
        Particle {
            id,
            pdg_id: 21,
            momentum: FourMomentum::new(0.0, 0.0, 1.0, 1.0),
            status: ParticleStatus::Intermediate,
            parents,
            children,
        }
    }

    #[test]
    fn test_validate_accepts_multi_parent_dag() {
        let record = EventRecord {
            event_number: 1,
            weight: 1.0,
            process_id: 0,
            particles: vec![
                particle(1, vec![], vec![3]),
                particle(2, vec![], vec![3]),
                particle(3, vec![1, 2], vec![]),
            ],
        };
        assert_eq!(record.validate(), Ok(()));
        assert_eq!(record.roots().count(), 2);
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let record = EventRecord {
            event_number: 1,
            weight: 1.0,
            process_id: 0,
            particles: vec![particle(1, vec![], vec![9])],
        };
        assert_eq!(
            record.validate(),
            Err(RecordError::Dangling {
                particle: 1,
                missing: 9
            })
        );
    }

    #[test]
    fn test_mass_and_pt() {
        let p = FourMomentum::new(3.0, 4.0, 0.0, 13.0);
        assert_eq!(p.pt(), 5.0);
        assert_eq!(p.mass(), 12.0);
    }
}
