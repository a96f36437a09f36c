//! Parameter dictionary
//!
//! Ordered, unique-key string map handed to the run driver and, through it,
//! to the generator adapter.
//!
//! # Ordering Semantics
//!
//! - Keys are unique
//! - Iteration follows first-insertion order
//! - Re-assigning an existing key overwrites the value in place (the key keeps
//!   its original position)
//!
//! Reproducibility depends on this: the resolved dictionary is dumped and
//! fingerprinted exactly as it will be forwarded to the native engine.
//!
//! # Meta-parameters
//!
//! Keys starting with [`META_PREFIX`] are driver bookkeeping (beams, seed,
//! generator choice) and are never forwarded to an engine. Use
//! [`ParameterDictionary::split_meta`] once, before configuration.

pub mod file;

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

pub use file::{load_parameter_file, ParamFileError};

/// Reserved prefix for driver meta-parameters
pub const META_PREFIX: &str = "RUN:";

/// Meta key holding a beam specification string
pub const META_BEAMS: &str = "RUN:BEAMS";

/// Meta key holding the random seed
pub const META_SEED: &str = "RUN:SEED";

/// Meta key naming the generator (informational)
pub const META_GENERATOR: &str = "RUN:GENERATOR";

/// Errors raised while building a dictionary from text
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("malformed parameter assignment '{0}' (expected KEY=VALUE)")]
    MalformedAssignment(String),

    #[error("parameter key must not be empty")]
    EmptyKey,
}

/// Ordered collection of unique `(key, value)` string pairs
///
/// # Example
/// ```
/// use evgen_core::ParameterDictionary;
///
/// let mut params = ParameterDictionary::new();
/// params.insert("A", "1");
/// params.insert("B", "x");
/// params.insert("A", "2");
///
/// let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec!["A", "B"]);
/// assert_eq!(params.get("A"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterDictionary {
    /// Entries in first-insertion order
    entries: Vec<(String, String)>,

    /// Key → position in `entries`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ParameterDictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value
    ///
    /// An existing key keeps its position; only the value changes.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Parse and insert a `KEY=VALUE` assignment (command-line style)
    ///
    /// Surrounding whitespace is trimmed from both halves. The value may be
    /// empty; the key may not.
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<(), ParamError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| ParamError::MalformedAssignment(assignment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParamError::EmptyKey);
        }
        self.insert(key, value.trim());
        Ok(())
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the dictionary holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply every entry of `other` on top of this dictionary
    ///
    /// Keys already present are overwritten in place; new keys are appended
    /// in `other`'s order. This is how command-line overrides are layered on
    /// top of parameter files.
    pub fn extend_from(&mut self, other: &ParameterDictionary) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    /// Split into `(meta, engine)` dictionaries, preserving order in both
    ///
    /// Meta keys are folded to upper case, so `run:seed` and `RUN:SEED` name
    /// the same entry and the later assignment wins.
    pub fn split_meta(&self) -> (ParameterDictionary, ParameterDictionary) {
        let mut meta = ParameterDictionary::new();
        let mut engine = ParameterDictionary::new();
        for (key, value) in self.iter() {
            if is_meta_key(key) {
                meta.insert(key.to_ascii_uppercase(), value);
            } else {
                engine.insert(key, value);
            }
        }
        (meta, engine)
    }

    /// Render the dictionary as `KEY = VALUE` lines in iteration order
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// SHA-256 (hex) of [`dump`](Self::dump)
    ///
    /// Two dictionaries with the same entries in the same order produce the
    /// same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.dump().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = ParameterDictionary::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}

/// True if `key` is a driver meta-parameter
pub fn is_meta_key(key: &str) -> bool {
    key.get(..META_PREFIX.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(META_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_keeps_position() {
        let mut params = ParameterDictionary::new();
        params.insert("A", "1");
        params.insert("B", "2");
        params.insert("A", "3");

        let entries: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(entries, vec![("A", "3"), ("B", "2")]);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_assignment_parsing() {
        let mut params = ParameterDictionary::new();
        params.insert_assignment(" MSTP(81) = 0 ").unwrap();
        params.insert_assignment("EMPTY=").unwrap();

        assert_eq!(params.get("MSTP(81)"), Some("0"));
        assert_eq!(params.get("EMPTY"), Some(""));
        assert_eq!(
            params.insert_assignment("NOEQUALS"),
            Err(ParamError::MalformedAssignment("NOEQUALS".to_string()))
        );
        assert_eq!(params.insert_assignment("=1"), Err(ParamError::EmptyKey));
    }

    #[test]
    fn test_split_meta_is_case_insensitive() {
        let params: ParameterDictionary = vec![
            ("run:seed", "7"),
            ("PARP(82)", "2.0"),
            ("RUN:BEAMS", "LHC"),
        ]
        .into_iter()
        .collect();

        let (meta, engine) = params.split_meta();
        assert_eq!(meta.len(), 2);
        assert_eq!(engine.iter().collect::<Vec<_>>(), vec![("PARP(82)", "2.0")]);
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let ab: ParameterDictionary = vec![("A", "1"), ("B", "2")].into_iter().collect();
        let ba: ParameterDictionary = vec![("B", "2"), ("A", "1")].into_iter().collect();
        assert_ne!(ab.fingerprint(), ba.fingerprint());
        assert_eq!(ab.fingerprint(), ab.clone().fingerprint());
    }
}
