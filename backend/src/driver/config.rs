//! Run configuration
//!
//! [`RunConfig`] is the typed, validated form of a run request. Building it
//! is the last step before any native resource is acquired, so every
//! configuration error of a run surfaces here.
//!
//! # Precedence
//!
//! ```text
//! explicit request value  >  RUN: meta-parameter  >  default
//! ```
//!
//! Meta-parameters are stripped before the engine dictionary is formed.

use crate::beams::{parse_beam_spec, BeamError, BeamSpec};
use crate::event::FilterLevel;
use crate::params::{
    ParamError, ParamFileError, ParameterDictionary, META_BEAMS, META_GENERATOR, META_SEED,
};
use crate::registry::RegistryError;
use serde::Serialize;
use thiserror::Error;

/// Seed used when neither the request nor `RUN:SEED` provides one
pub const DEFAULT_SEED: u64 = 12345;

/// Errors raised before the native engine is acquired
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    ParamFile(#[from] ParamFileError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("invalid beam specification: {0}")]
    Beam(#[from] BeamError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no beam specification given (set RUN:BEAMS or pass one explicitly)")]
    MissingBeams,

    #[error("invalid seed '{0}' (expected a non-negative integer)")]
    InvalidSeed(String),

    #[error("invalid filter level {0} (expected 0, 1 or 2)")]
    InvalidFilter(u8),
}

impl RunError {
    /// Process exit status for this error
    ///
    /// 2 for a missing or unreadable parameter file, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::ParamFile(e) if e.is_missing_file() => 2,
            _ => 1,
        }
    }
}

/// Unvalidated run request as assembled by a front end
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub generator: String,

    /// Explicit beam string; falls back to `RUN:BEAMS`
    pub beams: Option<String>,

    /// Explicit seed; falls back to `RUN:SEED`
    pub seed: Option<u64>,

    pub num_events: u64,

    /// Numeric filter level (0, 1, 2)
    pub filter_level: u8,

    /// Files already merged with overrides, meta keys included
    pub params: ParameterDictionary,
}

/// Validated configuration of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub generator: String,
    pub beam_a: BeamSpec,
    pub beam_b: BeamSpec,
    pub seed: u64,
    pub num_events: u64,
    pub filter: FilterLevel,

    /// Engine parameters, meta keys removed, in resolution order
    pub params: ParameterDictionary,
}

impl RunConfig {
    /// Validate a request
    ///
    /// # Example
    /// ```
    /// use evgen_core::driver::{RunConfig, RunRequest};
    /// use evgen_core::ParameterDictionary;
    ///
    /// let params: ParameterDictionary =
    ///     [("RUN:BEAMS", "p:900,pbar:900"), ("MSTP(41)", "0")].into_iter().collect();
    /// let config = RunConfig::resolve(RunRequest {
    ///     generator: "p1".to_string(),
    ///     num_events: 10,
    ///     params,
    ///     ..Default::default()
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.beam_a.momentum, 900.0);
    /// assert_eq!(config.params.len(), 1);
    /// ```
    pub fn resolve(request: RunRequest) -> Result<Self, RunError> {
        let (meta, params) = request.params.split_meta();

        for (key, _) in meta.iter() {
            if ![META_BEAMS, META_SEED, META_GENERATOR].contains(&key) {
                tracing::warn!(key, "ignoring unknown meta-parameter");
            }
        }

        if let Some(named) = meta.get(META_GENERATOR) {
            if !named.eq_ignore_ascii_case(&request.generator) {
                tracing::warn!(
                    requested = %request.generator,
                    meta = named,
                    "{} differs from the requested generator; using the request",
                    META_GENERATOR
                );
            }
        }

        let beam_text = match request.beams {
            Some(text) => text,
            None => meta.get(META_BEAMS)
                .map(str::to_string)
                .ok_or(RunError::MissingBeams)?,
        };
        let (beam_a, beam_b) = parse_beam_spec(&beam_text)?;

        let seed = match request.seed {
            Some(seed) => seed,
            None => match meta.get(META_SEED) {
                Some(text) => text
                    .trim()
                    .parse()
                    .map_err(|_| RunError::InvalidSeed(text.to_string()))?,
                None => DEFAULT_SEED,
            },
        };

        let filter = FilterLevel::from_level(request.filter_level)
            .ok_or(RunError::InvalidFilter(request.filter_level))?;

        Ok(Self {
            generator: request.generator,
            beam_a,
            beam_b,
            seed,
            num_events: request.num_events,
            filter,
            params,
        })
    }

    /// Fully resolved configuration as a dictionary
    ///
    /// Meta entries first (`RUN:GENERATOR`, `RUN:BEAMS`, `RUN:SEED`,
    /// `RUN:EVENTS`, `RUN:FILTER`), then engine parameters in order.
    pub fn resolved(&self) -> ParameterDictionary {
        let mut dict = ParameterDictionary::new();
        dict.insert(META_GENERATOR, self.generator.as_str());
        dict.insert(META_BEAMS, format!("{},{}", self.beam_a, self.beam_b));
        dict.insert(META_SEED, self.seed.to_string());
        dict.insert("RUN:EVENTS", self.num_events.to_string());
        dict.insert("RUN:FILTER", self.filter.level().to_string());
        dict.extend_from(&self.params);
        dict
    }

    /// SHA-256 of the resolved configuration dump
    pub fn fingerprint(&self) -> String {
        self.resolved().fingerprint()
    }
}
