//! Toy collision cascade
//!
//! Every reference engine draws its events from the same simple model and
//! differs only in how it stores them natively. The particle list is
//! ordered so that each particle's parents occupy a contiguous index range:
//!
//! ```text
//! beams → incoming partons → outgoing partons (2 parents each)
//!       → beam remnants
//!       → shower intermediates → string hadrons (2 parents each)
//!       → decay products
//! ```
//!
//! Lepton beams enter the hard process directly and leave no remnant.

use crate::beams::BeamSpec;
use crate::event::FourMomentum;
use crate::rng::EngineRng;

/// Position of a particle in the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Beam,
    Incoming,
    Outgoing,
    Remnant,
    Shower,
    Decayed,
    Final,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ToyParticle {
    pub pdg_id: i32,
    pub role: Role,

    /// GeV
    pub momentum: FourMomentum,

    /// 0-based positions of the parents, ascending and contiguous
    pub parents: Vec<usize>,
}

/// Knobs each engine maps from its own parameters
#[derive(Debug, Clone, Copy)]
pub(crate) struct CascadeParams {
    /// Multiplies the mean hadron multiplicity
    pub multiplicity_scale: f64,

    /// Width of the transverse kick given to hadrons (GeV)
    pub kt_width: f64,

    /// Decay unstable hadrons
    pub decays: bool,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            multiplicity_scale: 1.0,
            kt_width: 0.4,
            decays: true,
        }
    }
}

/// (pdg, mass GeV, decay products)
const HADRONS: &[(i32, f64, Option<[i32; 2]>)] = &[
    (211, 0.13957, None),
    (-211, 0.13957, None),
    (111, 0.13498, Some([22, 22])),
    (321, 0.49368, None),
    (-321, 0.49368, None),
    (310, 0.49761, Some([211, -211])),
    (113, 0.77526, Some([211, -211])),
];

fn mass_of(pdg_id: i32) -> f64 {
    match pdg_id.abs() {
        22 => 0.0,
        211 => 0.13957,
        _ => HADRONS
            .iter()
            .find(|(id, _, _)| *id == pdg_id)
            .map(|(_, m, _)| *m)
            .unwrap_or(0.0),
    }
}

fn on_shell(px: f64, py: f64, pz: f64, mass: f64) -> FourMomentum {
    let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
    FourMomentum::new(px, py, pz, e)
}

/// Boost along z with velocity `beta`
fn boost_z(p: FourMomentum, beta: f64) -> FourMomentum {
    let gamma = 1.0 / (1.0 - beta * beta).max(1e-300).sqrt();
    FourMomentum::new(
        p.px,
        p.py,
        gamma * (p.pz + beta * p.e),
        gamma * (p.e + beta * p.pz),
    )
}

/// Number of hadrons a string of invariant mass `w` fragments into
fn multiplicity(rng: &mut EngineRng, w: f64, scale: f64) -> usize {
    let mean = scale * (2.0 + 2.0 * w.max(1.0).ln());
    let n = (mean * rng.uniform(0.5, 1.5)).round();
    (n as usize).max(2)
}

/// Generate one event
pub(crate) fn generate(
    rng: &mut EngineRng,
    beam_a: &BeamSpec,
    beam_b: &BeamSpec,
    params: &CascadeParams,
) -> Vec<ToyParticle> {
    let mut out: Vec<ToyParticle> = Vec::new();

    // Beams travel along +z and -z
    for (beam, sign) in [(beam_a, 1.0), (beam_b, -1.0)] {
        out.push(ToyParticle {
            pdg_id: beam.kind.pdg_id(),
            role: Role::Beam,
            momentum: on_shell(0.0, 0.0, sign * beam.momentum, beam.kind.mass()),
            parents: vec![],
        });
    }

    // Incoming partons
    let mut fractions = [1.0, 1.0];
    for (i, beam) in [beam_a, beam_b].into_iter().enumerate() {
        let sign = if i == 0 { 1.0 } else { -1.0 };
        let (pdg_id, x) = if beam.kind.is_lepton() {
            (beam.kind.pdg_id(), 1.0)
        } else {
            let parton = [21, 1, 2][rng.range(0, 3)];
            (parton, rng.uniform(0.05, 0.5))
        };
        fractions[i] = x;
        let pz = sign * x * beam.momentum;
        out.push(ToyParticle {
            pdg_id,
            role: Role::Incoming,
            momentum: FourMomentum::new(0.0, 0.0, pz, pz.abs()),
            parents: vec![i],
        });
    }

    // Hard 2 → 2 scatter in the parton frame, boosted back
    let total = out[2].momentum + out[3].momentum;
    let w = total.mass();
    let beta = if total.e > 0.0 { total.pz / total.e } else { 0.0 };
    let half = w / 2.0;
    let pt = half * rng.uniform(0.1, 0.9);
    let pl = (half * half - pt * pt).max(0.0).sqrt();
    let phi = rng.uniform(0.0, std::f64::consts::TAU);
    let lepton_collision = beam_a.kind.is_lepton() && beam_b.kind.is_lepton();
    let outgoing_ids = if lepton_collision {
        let q = [1, 2, 3][rng.range(0, 3)];
        [q, -q]
    } else {
        [21, 21]
    };
    for (k, sign) in [1.0, -1.0].into_iter().enumerate() {
        let cm = FourMomentum::new(sign * pt * phi.cos(), sign * pt * phi.sin(), sign * pl, half);
        out.push(ToyParticle {
            pdg_id: outgoing_ids[k],
            role: Role::Outgoing,
            momentum: boost_z(cm, beta),
            parents: vec![2, 3],
        });
    }

    // Remnants carry what the partons left behind
    for (i, beam) in [beam_a, beam_b].into_iter().enumerate() {
        if beam.kind.is_lepton() {
            continue;
        }
        let sign = if i == 0 { 1.0 } else { -1.0 };
        let diquark = if beam.kind.pdg_id() > 0 { 2101 } else { -2101 };
        out.push(ToyParticle {
            pdg_id: diquark,
            role: Role::Remnant,
            momentum: on_shell(0.0, 0.0, sign * (1.0 - fractions[i]) * beam.momentum, 0.579),
            parents: vec![i],
        });
    }

    // One shower intermediate per outgoing parton
    let first_shower = out.len();
    for k in [4, 5] {
        out.push(ToyParticle {
            pdg_id: out[k].pdg_id,
            role: Role::Shower,
            momentum: out[k].momentum,
            parents: vec![k],
        });
    }
    let string = out[first_shower].momentum + out[first_shower + 1].momentum;

    // String fragmentation: every hadron has both shower partons as parents
    let n = multiplicity(rng, string.mass(), params.multiplicity_scale);
    let shares: Vec<f64> = (0..n).map(|_| rng.uniform(0.2, 1.0)).collect();
    let norm: f64 = shares.iter().sum();
    let first_hadron = out.len();
    for share in shares {
        let z = share / norm;
        let (pdg_id, mass, decays_to) = HADRONS[rng.range(0, HADRONS.len())];
        let kt = params.kt_width;
        let role = if params.decays && decays_to.is_some() {
            Role::Decayed
        } else {
            Role::Final
        };
        out.push(ToyParticle {
            pdg_id,
            role,
            momentum: on_shell(
                z * string.px + rng.uniform(-kt, kt),
                z * string.py + rng.uniform(-kt, kt),
                z * string.pz,
                mass,
            ),
            parents: vec![first_shower, first_shower + 1],
        });
    }
    let hadron_end = out.len();

    // Two-body decays, products appended in parent order
    for h in first_hadron..hadron_end {
        if out[h].role != Role::Decayed {
            continue;
        }
        let Some(products) = HADRONS
            .iter()
            .find(|(id, _, _)| *id == out[h].pdg_id)
            .and_then(|(_, _, d)| *d)
        else {
            continue;
        };
        let parent = out[h].momentum;
        let q = 0.5 * mass_of(out[h].pdg_id);
        let theta = rng.uniform(0.0, std::f64::consts::TAU);
        for (pdg_id, sign) in products.into_iter().zip([1.0, -1.0]) {
            out.push(ToyParticle {
                pdg_id,
                role: Role::Final,
                momentum: on_shell(
                    parent.px / 2.0 + sign * q * theta.cos(),
                    parent.py / 2.0 + sign * q * theta.sin(),
                    parent.pz / 2.0,
                    mass_of(pdg_id),
                ),
                parents: vec![h],
            });
        }
    }

    out
}

/// Children of every particle, ascending
pub(crate) fn children(particles: &[ToyParticle]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); particles.len()];
    for (i, p) in particles.iter().enumerate() {
        for &parent in &p.parents {
            children[parent].push(i);
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beams::ParticleKind;

    fn beams(a: ParticleKind, b: ParticleKind, p: f64) -> (BeamSpec, BeamSpec) {
        (BeamSpec::new(a, p).unwrap(), BeamSpec::new(b, p).unwrap())
    }

    #[test]
    fn test_parents_precede_and_are_contiguous() {
        let (a, b) = beams(ParticleKind::Proton, ParticleKind::Antiproton, 900.0);
        let mut rng = EngineRng::new(5);
        for _ in 0..20 {
            let event = generate(&mut rng, &a, &b, &CascadeParams::default());
            for (i, p) in event.iter().enumerate() {
                assert!(p.parents.iter().all(|&q| q < i));
                if let (Some(first), Some(last)) = (p.parents.first(), p.parents.last()) {
                    assert_eq!(last - first + 1, p.parents.len());
                }
            }
        }
    }

    #[test]
    fn test_hadrons_have_two_parents() {
        let (a, b) = beams(ParticleKind::Proton, ParticleKind::Proton, 7000.0);
        let event = generate(&mut EngineRng::new(9), &a, &b, &CascadeParams::default());
        let hadrons: Vec<_> = event
            .iter()
            .filter(|p| p.parents.len() == 2 && p.role != Role::Outgoing)
            .collect();
        assert!(hadrons.len() >= 2);
        assert_eq!(event.iter().filter(|p| p.role == Role::Remnant).count(), 2);
    }

    #[test]
    fn test_lepton_beams_leave_no_remnant() {
        let (a, b) = beams(ParticleKind::Electron, ParticleKind::Positron, 45.6);
        let event = generate(&mut EngineRng::new(1), &a, &b, &CascadeParams::default());
        assert!(event.iter().all(|p| p.role != Role::Remnant));
        assert_eq!(event[2].pdg_id, 11);
    }

    #[test]
    fn test_decays_switch() {
        let (a, b) = beams(ParticleKind::Proton, ParticleKind::Proton, 7000.0);
        let params = CascadeParams {
            decays: false,
            ..CascadeParams::default()
        };
        let event = generate(&mut EngineRng::new(3), &a, &b, &params);
        assert!(event.iter().all(|p| p.role != Role::Decayed));
    }
}
