//! Event record builder
//!
//! Translates an engine's native particle list into the canonical
//! [`EventRecord`]. Each engine family supplies a [`Convention`]: the factor
//! that converts its momentum unit to GeV and its status-code table.
//!
//! Parent/child links are taken from both directions of the native record
//! (engines often fill only one side reliably) and merged into one edge set.
//! No edge is invented or dropped; a link to a missing index is an error.
//!
//! Momenta are stored at full precision. Rounding to the configured number
//! of significant digits happens in the writers, at emission time.

use super::{EventRecord, FourMomentum, Particle, ParticleStatus};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// One entry of a native particle list, before translation
#[derive(Debug, Clone, PartialEq)]
pub struct NativeParticle {
    /// Native index (engine numbering, usually 1-based)
    pub index: usize,

    pub pdg_id: i32,

    /// Native status code
    pub status: i32,

    /// `(px, py, pz, E)` in the engine's momentum unit
    pub momentum: [f64; 4],

    /// Native parent indices
    pub parents: Vec<usize>,

    /// Native child indices
    pub children: Vec<usize>,
}

/// Per-family translation table
#[derive(Debug, Clone, Copy)]
pub struct Convention {
    /// Engine family name (for diagnostics)
    pub family: &'static str,

    /// Multiply native momenta by this to obtain GeV
    pub momentum_to_gev: f64,

    /// Native status code → canonical status
    pub status_map: &'static [(i32, ParticleStatus)],
}

impl Convention {
    /// Canonical status for a native code; unmapped codes are kept verbatim
    pub fn status(&self, native: i32) -> ParticleStatus {
        self.status_map
            .iter()
            .find(|(code, _)| *code == native)
            .map(|(_, status)| *status)
            .unwrap_or(ParticleStatus::Other(native))
    }
}

/// Errors translating a native record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("{family}: duplicate native index {index}")]
    DuplicateIndex { family: &'static str, index: usize },

    #[error("{family}: particle {particle} links to missing index {missing}")]
    DanglingLink {
        family: &'static str,
        particle: usize,
        missing: usize,
    },

    #[error("{family}: parent/child links form a cycle through particle {particle}")]
    Cycle { family: &'static str, particle: usize },
}

/// Build a canonical record from a native particle list
///
/// # Example
/// ```
/// use evgen_core::event::{build_record, Convention, NativeParticle, ParticleStatus};
///
/// const MEV: Convention = Convention {
///     family: "demo",
///     momentum_to_gev: 1e-3,
///     status_map: &[(1, ParticleStatus::Stable), (2, ParticleStatus::Decayed)],
/// };
///
/// let native = vec![
///     NativeParticle { index: 1, pdg_id: 111, status: 2, momentum: [0.0, 0.0, 0.0, 135.0], parents: vec![], children: vec![2, 3] },
///     NativeParticle { index: 2, pdg_id: 22, status: 1, momentum: [0.0, 0.0, 67.5, 67.5], parents: vec![1], children: vec![] },
///     NativeParticle { index: 3, pdg_id: 22, status: 1, momentum: [0.0, 0.0, -67.5, 67.5], parents: vec![], children: vec![] },
/// ];
///
/// let record = build_record(&native, &MEV, 1, 1.0, 0).unwrap();
/// assert!((record.particles[0].momentum.e - 0.135).abs() < 1e-12);
/// assert_eq!(record.particles[2].parents, vec![1]); // filled from the child list of 1
/// ```
pub fn build_record(
    native: &[NativeParticle],
    convention: &Convention,
    event_number: u64,
    weight: f64,
    process_id: i32,
) -> Result<EventRecord, BuildError> {
    let family = convention.family;

    let mut by_index: BTreeMap<usize, &NativeParticle> = BTreeMap::new();
    for particle in native {
        if by_index.insert(particle.index, particle).is_some() {
            return Err(BuildError::DuplicateIndex {
                family,
                index: particle.index,
            });
        }
    }

    // Merge both link directions into one edge set
    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for particle in native {
        for &parent in &particle.parents {
            edges.insert((parent, particle.index));
        }
        for &child in &particle.children {
            edges.insert((particle.index, child));
        }
    }

    for &(parent, child) in &edges {
        for (owner, other) in [(child, parent), (parent, child)] {
            if !by_index.contains_key(&other) {
                return Err(BuildError::DanglingLink {
                    family,
                    particle: owner,
                    missing: other,
                });
            }
        }
    }

    check_acyclic(&by_index, &edges, family)?;

    let mut parents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(parent, child) in &edges {
        children.entry(parent).or_default().push(child);
        parents.entry(child).or_default().push(parent);
    }

    let particles = by_index
        .values()
        .map(|np| {
            let [px, py, pz, e] = np.momentum;
            Particle {
                id: np.index,
                pdg_id: np.pdg_id,
                momentum: FourMomentum::new(px, py, pz, e).scaled(convention.momentum_to_gev),
                status: convention.status(np.status),
                parents: parents.remove(&np.index).unwrap_or_default(),
                children: children.remove(&np.index).unwrap_or_default(),
            }
        })
        .collect();

    Ok(EventRecord {
        event_number,
        weight,
        process_id,
        particles,
    })
}

/// Kahn's algorithm over the merged edge set
fn check_acyclic(
    nodes: &BTreeMap<usize, &NativeParticle>,
    edges: &BTreeSet<(usize, usize)>,
    family: &'static str,
) -> Result<(), BuildError> {
    let mut in_degree: BTreeMap<usize, usize> = nodes.keys().map(|&id| (id, 0)).collect();
    let mut outgoing: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(parent, child) in edges {
        *in_degree.entry(child).or_default() += 1;
        outgoing.entry(parent).or_default().push(child);
    }

    let mut ready: VecDeque<usize> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut visited = 0;

    while let Some(id) = ready.pop_front() {
        visited += 1;
        for &child in outgoing.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(deg) = in_degree.get_mut(&child) {
                *deg -= 1;
                if *deg == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    if visited == nodes.len() {
        return Ok(());
    }

    let particle = in_degree
        .iter()
        .find(|(_, &deg)| deg > 0)
        .map(|(&id, _)| id)
        .unwrap_or(0);
    Err(BuildError::Cycle { family, particle })
}
