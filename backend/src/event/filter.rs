//! Record filter
//!
//! Reduces an event record to the particles a retention level keeps.
//!
//! # Levels
//!
//! | Level | Keeps                               |
//! |-------|-------------------------------------|
//! | 0     | everything (record unchanged)       |
//! | 1     | stable, decayed, beam               |
//! | 2     | stable, beam                        |
//!
//! # Orphan Policy
//!
//! Links to a dropped particle are removed from the survivors, never
//! rewritten to a grandparent. A survivor whose parents were all dropped
//! becomes a root.
//!
//! The filter decides retention from each particle's own status only, so it
//! is a pure function of the whole record: applying the same level twice
//! yields the same record, and the kept set shrinks monotonically with the
//! level.

use super::{EventRecord, Particle, ParticleStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Retention level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum FilterLevel {
    /// Level 0: no filtering
    #[default]
    None,

    /// Level 1: drop everything except stable, decayed, and beam particles
    Physical,

    /// Level 2: additionally drop decayed particles
    Stable,
}

impl FilterLevel {
    /// Level from its numeric form (0, 1, 2)
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(FilterLevel::None),
            1 => Some(FilterLevel::Physical),
            2 => Some(FilterLevel::Stable),
            _ => None,
        }
    }

    /// Numeric form of the level
    pub fn level(self) -> u8 {
        match self {
            FilterLevel::None => 0,
            FilterLevel::Physical => 1,
            FilterLevel::Stable => 2,
        }
    }

    /// True if a particle with `status` survives this level
    pub fn keeps(self, status: ParticleStatus) -> bool {
        match self {
            FilterLevel::None => true,
            FilterLevel::Physical => matches!(
                status,
                ParticleStatus::Stable | ParticleStatus::Decayed | ParticleStatus::Beam
            ),
            FilterLevel::Stable => {
                matches!(status, ParticleStatus::Stable | ParticleStatus::Beam)
            }
        }
    }
}

/// Apply a retention level to a whole record
///
/// # Example
/// ```
/// use evgen_core::event::{filter_record, EventRecord, FilterLevel, FourMomentum, Particle, ParticleStatus};
///
/// let p = |id, status, parents: Vec<usize>, children: Vec<usize>| Particle {
///     id, pdg_id: 0, momentum: FourMomentum::default(), status, parents, children,
/// };
/// let record = EventRecord {
///     event_number: 1,
///     weight: 1.0,
///     process_id: 0,
///     particles: vec![
///         p(1, ParticleStatus::Beam, vec![], vec![2]),
///         p(2, ParticleStatus::Intermediate, vec![1], vec![3]),
///         p(3, ParticleStatus::Stable, vec![2], vec![]),
///     ],
/// };
///
/// let filtered = filter_record(&record, FilterLevel::Physical);
/// assert_eq!(filtered.len(), 2);
/// assert!(filtered.particle(3).unwrap().parents.is_empty()); // orphan becomes a root
/// ```
pub fn filter_record(record: &EventRecord, level: FilterLevel) -> EventRecord {
    if level == FilterLevel::None {
        return record.clone();
    }

    let kept: BTreeSet<usize> = record
        .particles
        .iter()
        .filter(|p| level.keeps(p.status))
        .map(|p| p.id)
        .collect();

    let particles = record
        .particles
        .iter()
        .filter(|p| kept.contains(&p.id))
        .map(|p| Particle {
            parents: retain_kept(&p.parents, &kept),
            children: retain_kept(&p.children, &kept),
            ..p.clone()
        })
        .collect();

    EventRecord {
        event_number: record.event_number,
        weight: record.weight,
        process_id: record.process_id,
        particles,
    }
}

fn retain_kept(ids: &[usize], kept: &BTreeSet<usize>) -> Vec<usize> {
    ids.iter().copied().filter(|id| kept.contains(id)).collect()
}
