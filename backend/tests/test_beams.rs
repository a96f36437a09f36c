//! Beam specification tests
//!
//! Explicit beam pairs, collider presets (symmetric and the asymmetric HERA
//! table), magnitude suffixes, and parse determinism.

use evgen_core::beams::{collider_names, parse_energy, BeamError};
use evgen_core::{parse_beam_spec, BeamSpec, ParticleKind};
use proptest::prelude::*;

fn assert_beam(beam: &BeamSpec, kind: ParticleKind, momentum: f64) {
    assert_eq!(beam.kind, kind);
    assert!(
        (beam.momentum - momentum).abs() < 1e-9,
        "expected {} GeV, got {}",
        momentum,
        beam.momentum
    );
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_explicit_proton_antiproton() {
    let (a, b) = parse_beam_spec("p:900,pbar:900").unwrap();
    assert_beam(&a, ParticleKind::Proton, 900.0);
    assert_beam(&b, ParticleKind::Antiproton, 900.0);
}

#[test]
fn test_lhc_splits_evenly() {
    let (a, b) = parse_beam_spec("LHC:14000").unwrap();
    assert_beam(&a, ParticleKind::Proton, 7000.0);
    assert_beam(&b, ParticleKind::Proton, 7000.0);
}

#[test]
fn test_hera_uses_fixed_split() {
    let (a, b) = parse_beam_spec("HERA:298").unwrap();
    assert_beam(&a, ParticleKind::Electron, 26.7);
    assert_beam(&b, ParticleKind::Proton, 820.0);

    let (a, b) = parse_beam_spec("hera:318").unwrap();
    assert_beam(&a, ParticleKind::Electron, 27.5);
    assert_beam(&b, ParticleKind::Proton, 920.0);
}

#[test]
fn test_collider_defaults_and_aliases() {
    let (a, b) = parse_beam_spec("Tevatron").unwrap();
    assert_beam(&a, ParticleKind::Proton, 980.0);
    assert_beam(&b, ParticleKind::Antiproton, 980.0);

    let (a, b) = parse_beam_spec("LEP").unwrap();
    assert_beam(&a, ParticleKind::Electron, 45.6);
    assert_beam(&b, ParticleKind::Positron, 45.6);
}

#[test]
fn test_suffixes_in_explicit_beams() {
    let (a, b) = parse_beam_spec("e-:45.6G, e+:0.0456T").unwrap();
    assert_beam(&a, ParticleKind::Electron, 45.6);
    assert_beam(&b, ParticleKind::Positron, 45.6);
    assert!((parse_energy("250M").unwrap() - 0.25).abs() < 1e-12);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_malformed_specs_rejected() {
    assert_eq!(parse_beam_spec("  "), Err(BeamError::Empty));
    assert!(matches!(
        parse_beam_spec("p:900,muon:900"),
        Err(BeamError::UnknownParticle(name)) if name == "muon"
    ));
    assert!(matches!(parse_beam_spec("p:abc,p:1"), Err(BeamError::BadEnergy(_))));
    assert!(matches!(parse_beam_spec("p:0,p:1"), Err(BeamError::NonPositiveEnergy(_))));
    assert!(matches!(parse_beam_spec("p900,p:900"), Err(BeamError::Malformed(_))));
    assert!(matches!(parse_beam_spec("p:1,p:1,p:1"), Err(BeamError::Malformed(_))));
}

#[test]
fn test_unknown_collider_lists_known_names() {
    match parse_beam_spec("FCC:100000") {
        Err(BeamError::UnknownCollider { token, known }) => {
            assert_eq!(token, "FCC");
            for name in collider_names() {
                assert!(known.contains(name));
            }
        }
        other => panic!("expected UnknownCollider, got {:?}", other),
    }
}

// ============================================================================
// Properties
// ============================================================================

fn arb_particle() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("p"), Just("pbar"), Just("e-"), Just("e+"), Just("proton")]
}

fn arb_suffix() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just("G"), Just("T"), Just("M")]
}

proptest! {
    /// Parsing the same `name:energy` string twice yields identical beams
    #[test]
    fn parse_is_deterministic(
        a in arb_particle(),
        b in arb_particle(),
        ea in 0.001f64..1.0e5,
        eb in 0.001f64..1.0e5,
        sa in arb_suffix(),
        sb in arb_suffix(),
    ) {
        let spec = format!("{}:{}{},{}:{}{}", a, ea, sa, b, eb, sb);
        let first = parse_beam_spec(&spec).unwrap();
        let second = parse_beam_spec(&spec).unwrap();
        prop_assert_eq!(first, second);
        prop_assert!(first.0.momentum > 0.0 && first.1.momentum > 0.0);
    }
}
