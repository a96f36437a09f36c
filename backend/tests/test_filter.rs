//! Record filter tests
//!
//! Random DAG records are built through the record builder, then checked for
//! the filter's algebraic properties: idempotence, monotonicity across
//! levels, and no dangling links after filtering.

use evgen_core::event::{build_record, Convention, NativeParticle};
use evgen_core::{filter_record, EventRecord, FilterLevel, ParticleStatus};
use proptest::prelude::*;
use std::collections::BTreeSet;

const TOY: Convention = Convention {
    family: "toy",
    momentum_to_gev: 1.0,
    status_map: &[
        (1, ParticleStatus::Stable),
        (2, ParticleStatus::Decayed),
        (3, ParticleStatus::Documentation),
        (4, ParticleStatus::Beam),
        (5, ParticleStatus::Intermediate),
        (6, ParticleStatus::BeamRemnant),
    ],
};

const LEVELS: [FilterLevel; 3] = [FilterLevel::None, FilterLevel::Physical, FilterLevel::Stable];

// ============================================================================
// Helpers
// ============================================================================

/// Up to 40 particles; each picks up to two parents among earlier ones
fn arb_native() -> impl Strategy<Value = Vec<NativeParticle>> {
    let row = (1i32..=7, proptest::collection::vec(any::<prop::sample::Index>(), 0..3));
    proptest::collection::vec(row, 1..40)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (status, picks))| {
                    let parents: BTreeSet<usize> = if i == 0 {
                        BTreeSet::new()
                    } else {
                        picks.iter().map(|pick| pick.index(i) + 1).collect()
                    };
                    NativeParticle {
                        index: i + 1,
                        pdg_id: 211,
                        status,
                        momentum: [0.1, 0.2, 0.3, 1.0],
                        parents: parents.into_iter().collect(),
                        children: Vec::new(),
                    }
                })
                .collect()
        })
}

fn arb_record() -> impl Strategy<Value = EventRecord> {
    arb_native().prop_map(|native| build_record(&native, &TOY, 1, 1.0, 0).unwrap())
}

fn arb_level() -> impl Strategy<Value = FilterLevel> {
    prop_oneof![
        Just(FilterLevel::None),
        Just(FilterLevel::Physical),
        Just(FilterLevel::Stable)
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn filtering_is_idempotent(record in arb_record(), level in arb_level()) {
        let once = filter_record(&record, level);
        let twice = filter_record(&once, level);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn retained_sets_shrink_with_level(record in arb_record()) {
        let none = filter_record(&record, FilterLevel::None).ids();
        let physical = filter_record(&record, FilterLevel::Physical).ids();
        let stable = filter_record(&record, FilterLevel::Stable).ids();
        prop_assert!(stable.is_subset(&physical));
        prop_assert!(physical.is_subset(&none));
        prop_assert_eq!(none, record.ids());
    }

    #[test]
    fn no_dangling_links_before_or_after(record in arb_record()) {
        prop_assert_eq!(record.validate(), Ok(()));
        for level in LEVELS {
            prop_assert_eq!(filter_record(&record, level).validate(), Ok(()));
        }
    }

    #[test]
    fn survivors_keep_identity_and_kinematics(record in arb_record(), level in arb_level()) {
        let filtered = filter_record(&record, level);
        for particle in &filtered.particles {
            let original = record.particle(particle.id).unwrap();
            prop_assert_eq!(particle.pdg_id, original.pdg_id);
            prop_assert_eq!(particle.status, original.status);
            prop_assert_eq!(particle.momentum, original.momentum);
            prop_assert!(particle.parents.iter().all(|p| original.parents.contains(p)));
        }
    }
}

// ============================================================================
// Examples
// ============================================================================

#[test]
fn test_multi_parent_orphan_policy() {
    // beams 1, 2 → intermediate 3 (doc) and 4 (decayed) → hadron 5 with parents 3 and 4
    let native = vec![
        NativeParticle { index: 1, pdg_id: 2212, status: 4, momentum: [0.0; 4], parents: vec![], children: vec![3] },
        NativeParticle { index: 2, pdg_id: 2212, status: 4, momentum: [0.0; 4], parents: vec![], children: vec![4] },
        NativeParticle { index: 3, pdg_id: 21, status: 3, momentum: [0.0; 4], parents: vec![], children: vec![5] },
        NativeParticle { index: 4, pdg_id: 113, status: 2, momentum: [0.0; 4], parents: vec![], children: vec![5] },
        NativeParticle { index: 5, pdg_id: 211, status: 1, momentum: [0.0; 4], parents: vec![], children: vec![] },
    ];
    let record = build_record(&native, &TOY, 1, 1.0, 0).unwrap();
    assert_eq!(record.particle(5).unwrap().parents, vec![3, 4]);

    let physical = filter_record(&record, FilterLevel::Physical);
    assert_eq!(physical.particle(5).unwrap().parents, vec![4]);
    assert_eq!(physical.particle(1).unwrap().children, Vec::<usize>::new());
    assert_eq!(physical.particle(2).unwrap().children, vec![4]);

    let stable = filter_record(&record, FilterLevel::Stable);
    assert_eq!(stable.ids(), [1, 2, 5].into_iter().collect());
    assert!(stable.particle(5).unwrap().parents.is_empty());
    assert_eq!(stable.roots().count(), 3);
}

#[test]
fn test_unmapped_status_dropped_above_level_zero() {
    let native = vec![NativeParticle {
        index: 1,
        pdg_id: 22,
        status: 7,
        momentum: [0.0; 4],
        parents: vec![],
        children: vec![],
    }];
    let record = build_record(&native, &TOY, 1, 1.0, 0).unwrap();
    assert_eq!(record.particles[0].status, ParticleStatus::Other(7));
    assert_eq!(filter_record(&record, FilterLevel::None).len(), 1);
    assert!(filter_record(&record, FilterLevel::Physical).is_empty());
}
