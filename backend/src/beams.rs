//! Beam specification
//!
//! Parses the beam string accepted by the run driver into a pair of
//! [`BeamSpec`]s.
//!
//! # Accepted Forms
//!
//! ```text
//! p:900,pbar:900        two explicit beams, energy = beam momentum
//! LHC                   named collider at its default energy
//! LHC:14000             named collider at the given centre-of-mass energy
//! HERA:298              asymmetric collider, fixed split for that energy range
//! e-:45.6G,e+:0.0456T   magnitude suffixes K, M, G, T
//! ```
//!
//! Energies are in GeV unless suffixed: `K` = 1e-6, `M` = 1e-3, `G` = 1,
//! `T` = 1e3 (all scaled to GeV).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Incoming particle species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    Proton,
    Antiproton,
    Electron,
    Positron,
}

impl ParticleKind {
    /// PDG Monte Carlo particle code
    pub fn pdg_id(self) -> i32 {
        match self {
            ParticleKind::Proton => 2212,
            ParticleKind::Antiproton => -2212,
            ParticleKind::Electron => 11,
            ParticleKind::Positron => -11,
        }
    }

    /// Rest mass in GeV
    pub fn mass(self) -> f64 {
        match self {
            ParticleKind::Proton | ParticleKind::Antiproton => 0.938_272,
            ParticleKind::Electron | ParticleKind::Positron => 0.000_511,
        }
    }

    /// True for electrons and positrons
    pub fn is_lepton(self) -> bool {
        matches!(self, ParticleKind::Electron | ParticleKind::Positron)
    }

    /// Resolve a user-facing particle name (case-insensitive)
    ///
    /// Accepts `p`, `p+`, `proton`, `pbar`, `p-`, `antiproton`, `e-`, `e`,
    /// `electron`, `e+`, `positron`, and the PDG codes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "p" | "p+" | "proton" | "2212" => Some(ParticleKind::Proton),
            "pbar" | "p-" | "antiproton" | "-2212" => Some(ParticleKind::Antiproton),
            "e" | "e-" | "electron" | "11" => Some(ParticleKind::Electron),
            "e+" | "positron" | "-11" => Some(ParticleKind::Positron),
            _ => None,
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParticleKind::Proton => "p",
            ParticleKind::Antiproton => "pbar",
            ParticleKind::Electron => "e-",
            ParticleKind::Positron => "e+",
        };
        f.write_str(name)
    }
}

/// One incoming beam: particle species and momentum in GeV
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamSpec {
    pub kind: ParticleKind,
    pub momentum: f64,
}

impl BeamSpec {
    /// Create a beam, rejecting non-positive or non-finite momenta
    pub fn new(kind: ParticleKind, momentum: f64) -> Result<Self, BeamError> {
        if !(momentum.is_finite() && momentum > 0.0) {
            return Err(BeamError::NonPositiveEnergy(momentum));
        }
        Ok(Self { kind, momentum })
    }

    /// Beam energy in GeV (on-shell)
    pub fn energy(&self) -> f64 {
        (self.momentum * self.momentum + self.kind.mass() * self.kind.mass()).sqrt()
    }
}

impl fmt::Display for BeamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.momentum)
    }
}

/// Centre-of-mass energy of two head-on beams (GeV)
pub fn sqrt_s(a: &BeamSpec, b: &BeamSpec) -> f64 {
    let e = a.energy() + b.energy();
    let pz = a.momentum - b.momentum;
    (e * e - pz * pz).max(0.0).sqrt()
}

/// Beam string errors
#[derive(Debug, Error, PartialEq)]
pub enum BeamError {
    #[error("empty beam specification")]
    Empty,

    #[error("unknown beam particle '{0}'")]
    UnknownParticle(String),

    #[error("cannot parse energy '{0}'")]
    BadEnergy(String),

    #[error("beam energy must be positive, got {0}")]
    NonPositiveEnergy(f64),

    #[error("unknown collider '{token}' (known: {known})")]
    UnknownCollider { token: String, known: String },

    #[error("{collider} has no beam configuration for {energy} GeV")]
    EnergyOutOfRange { collider: String, energy: f64 },

    #[error("malformed beam specification '{0}'")]
    Malformed(String),
}

/// Beam energy assignment for a named collider
enum Split {
    /// Both beams carry half the centre-of-mass energy
    Symmetric,

    /// Fixed per-beam energies chosen by centre-of-mass range
    ///
    /// Each entry: `[low, high)` in GeV, beam A energy, beam B energy.
    Ranges(&'static [(f64, f64, f64, f64)]),
}

/// Named collider preset
struct Collider {
    token: &'static str,
    aliases: &'static [&'static str],
    beams: (ParticleKind, ParticleKind),
    default_energy: f64,
    split: Split,
}

/// HERA running periods by centre-of-mass energy
const HERA_SPLITS: &[(f64, f64, f64, f64)] = &[
    (290.0, 299.0, 26.7, 820.0),
    (299.0, 310.0, 27.5, 820.0),
    (310.0, 325.0, 27.5, 920.0),
];

const COLLIDERS: &[Collider] = &[
    Collider {
        token: "LHC",
        aliases: &[],
        beams: (ParticleKind::Proton, ParticleKind::Proton),
        default_energy: 14000.0,
        split: Split::Symmetric,
    },
    Collider {
        token: "TEV",
        aliases: &["TEVATRON"],
        beams: (ParticleKind::Proton, ParticleKind::Antiproton),
        default_energy: 1960.0,
        split: Split::Symmetric,
    },
    Collider {
        token: "SPS",
        aliases: &["SPPS"],
        beams: (ParticleKind::Proton, ParticleKind::Antiproton),
        default_energy: 630.0,
        split: Split::Symmetric,
    },
    Collider {
        token: "RHIC",
        aliases: &[],
        beams: (ParticleKind::Proton, ParticleKind::Proton),
        default_energy: 200.0,
        split: Split::Symmetric,
    },
    Collider {
        token: "LEP",
        aliases: &[],
        beams: (ParticleKind::Electron, ParticleKind::Positron),
        default_energy: 91.2,
        split: Split::Symmetric,
    },
    Collider {
        token: "HERA",
        aliases: &[],
        beams: (ParticleKind::Electron, ParticleKind::Proton),
        default_energy: 318.0,
        split: Split::Ranges(HERA_SPLITS),
    },
];

/// Names of all collider presets, in table order
pub fn collider_names() -> Vec<&'static str> {
    COLLIDERS.iter().map(|c| c.token).collect()
}

/// Parse an energy with optional magnitude suffix into GeV
///
/// # Example
/// ```
/// use evgen_core::beams::parse_energy;
///
/// assert_eq!(parse_energy("900").unwrap(), 900.0);
/// assert_eq!(parse_energy("7T").unwrap(), 7000.0);
/// assert_eq!(parse_energy("500M").unwrap(), 0.5);
/// ```
pub fn parse_energy(text: &str) -> Result<f64, BeamError> {
    let text = text.trim();
    let (number, scale) = match text.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let scale = match c.to_ascii_uppercase() {
                'K' => 1e-6,
                'M' => 1e-3,
                'G' => 1.0,
                'T' => 1e3,
                _ => return Err(BeamError::BadEnergy(text.to_string())),
            };
            (&text[..text.len() - 1], scale)
        }
        _ => (text, 1.0),
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| BeamError::BadEnergy(text.to_string()))?;
    let gev = value * scale;
    if !(gev.is_finite() && gev > 0.0) {
        return Err(BeamError::NonPositiveEnergy(gev));
    }
    Ok(gev)
}

/// Parse a beam specification string into `(beam A, beam B)`
///
/// # Example
/// ```
/// use evgen_core::beams::{parse_beam_spec, ParticleKind};
///
/// let (a, b) = parse_beam_spec("LHC:14000").unwrap();
/// assert_eq!(a.kind, ParticleKind::Proton);
/// assert_eq!(a.momentum, 7000.0);
/// assert_eq!(b.momentum, 7000.0);
/// ```
pub fn parse_beam_spec(spec: &str) -> Result<(BeamSpec, BeamSpec), BeamError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(BeamError::Empty);
    }

    if let Some((first, second)) = spec.split_once(',') {
        if second.contains(',') {
            return Err(BeamError::Malformed(spec.to_string()));
        }
        return Ok((parse_single_beam(first)?, parse_single_beam(second)?));
    }

    let (token, energy) = match spec.split_once(':') {
        Some((token, energy)) => (token.trim(), Some(parse_energy(energy)?)),
        None => (spec, None),
    };
    collider_beams(token, energy)
}

fn parse_single_beam(text: &str) -> Result<BeamSpec, BeamError> {
    let (name, energy) = text
        .trim()
        .split_once(':')
        .ok_or_else(|| BeamError::Malformed(text.trim().to_string()))?;
    let kind = ParticleKind::from_name(name)
        .ok_or_else(|| BeamError::UnknownParticle(name.trim().to_string()))?;
    BeamSpec::new(kind, parse_energy(energy)?)
}

fn collider_beams(token: &str, energy: Option<f64>) -> Result<(BeamSpec, BeamSpec), BeamError> {
    let collider = COLLIDERS
        .iter()
        .find(|c| {
            c.token.eq_ignore_ascii_case(token)
                || c.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(token))
        })
        .ok_or_else(|| BeamError::UnknownCollider {
            token: token.to_string(),
            known: collider_names().join(", "),
        })?;

    let cms = energy.unwrap_or(collider.default_energy);
    let (kind_a, kind_b) = collider.beams;

    let (energy_a, energy_b) = match collider.split {
        Split::Symmetric => (cms / 2.0, cms / 2.0),
        Split::Ranges(ranges) => ranges
            .iter()
            .find(|(low, high, _, _)| cms >= *low && cms < *high)
            .map(|&(_, _, a, b)| (a, b))
            .ok_or_else(|| BeamError::EnergyOutOfRange {
                collider: collider.token.to_string(),
                energy: cms,
            })?,
    };

    Ok((BeamSpec::new(kind_a, energy_a)?, BeamSpec::new(kind_b, energy_b)?))
}
