//! Parameter dictionary and parameter-file tests
//!
//! Covers overwrite-in-place ordering, meta splitting, and the file format:
//! comments, both assignment forms, `@include` expansion through the search
//! path, and the missing-file error class.

use evgen_core::params::file::load_into;
use evgen_core::params::{is_meta_key, ParamFileError};
use evgen_core::{load_parameter_file, ParameterDictionary, SearchPath};
use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn entries(dict: &ParameterDictionary) -> Vec<(String, String)> {
    dict.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

// ============================================================================
// Dictionary
// ============================================================================

#[test]
fn test_reassignment_keeps_original_position() {
    let mut dict = ParameterDictionary::new();
    dict.insert_assignment("A=1").unwrap();
    dict.insert_assignment("B=2").unwrap();
    dict.insert_assignment("A=2").unwrap();

    assert_eq!(dict.len(), 2);
    assert_eq!(
        entries(&dict),
        vec![("A".into(), "2".into()), ("B".into(), "2".into())]
    );
}

#[test]
fn test_overrides_layer_on_files() {
    let mut files: ParameterDictionary = [("X", "1"), ("Y", "2")].into_iter().collect();
    let overrides: ParameterDictionary = [("Y", "9"), ("Z", "3")].into_iter().collect();
    files.extend_from(&overrides);

    assert_eq!(files.dump(), "X = 1\nY = 9\nZ = 3\n");
}

#[test]
fn test_meta_split_preserves_order() {
    let dict: ParameterDictionary = [
        ("MSTP(41)", "0"),
        ("RUN:SEED", "5"),
        ("PARP(2)", "4"),
        ("run:beams", "LHC"),
    ]
    .into_iter()
    .collect();
    let (meta, engine) = dict.split_meta();

    assert_eq!(meta.dump(), "RUN:SEED = 5\nRUN:BEAMS = LHC\n");
    assert_eq!(engine.dump(), "MSTP(41) = 0\nPARP(2) = 4\n");
    assert!(is_meta_key("Run:Generator"));
    assert!(!is_meta_key("RUNX"));
}

#[test]
fn test_fingerprint_depends_on_order() {
    let a: ParameterDictionary = [("A", "1"), ("B", "2")].into_iter().collect();
    let b: ParameterDictionary = [("B", "2"), ("A", "1")].into_iter().collect();
    assert_eq!(a.fingerprint(), a.clone().fingerprint());
    assert_ne!(a.fingerprint(), b.fingerprint());
}

proptest! {
    /// `K=v1` then `K=v2` leaves one entry for `K`, holding `v2`, at `K`'s first position
    #[test]
    fn reassignment_overwrites_in_place(
        before in proptest::collection::vec(("[A-J]{1,3}", "[a-z0-9]{1,4}"), 0..6),
        key in "[K-Z]{1,3}",
        v1 in "[a-z0-9]{1,4}",
        v2 in "[a-z0-9]{1,4}",
        after in proptest::collection::vec(("[A-J]{1,3}", "[a-z0-9]{1,4}"), 0..6),
    ) {
        let mut dict = ParameterDictionary::new();
        for (k, v) in &before {
            dict.insert(k.as_str(), v.as_str());
        }
        let position = dict.len();
        dict.insert(key.as_str(), v1.as_str());
        for (k, v) in &after {
            dict.insert(k.as_str(), v.as_str());
        }
        dict.insert(key.as_str(), v2.as_str());

        let matching: Vec<usize> = dict
            .iter()
            .enumerate()
            .filter(|(_, (k, _))| *k == key)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(matching, vec![position]);
        prop_assert_eq!(dict.get(&key), Some(v2.as_str()));
    }
}

// ============================================================================
// Parameter files
// ============================================================================

#[test]
fn test_file_comments_and_assignment_forms() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "run.cfg",
        "# tune\n\nMSTP(41) = 0   # no decays\nPARP(2) 5.0\nRUN:SEED=17\n",
    );

    let dict = load_parameter_file(&path, &SearchPath::default()).unwrap();
    assert_eq!(dict.dump(), "MSTP(41) = 0\nPARP(2) = 5.0\nRUN:SEED = 17\n");
}

#[test]
fn test_include_expands_in_place_via_search_path() {
    let lib = TempDir::new().unwrap();
    write(lib.path(), "tune.cfg", "B = tuned\nC = 3\n");

    let work = TempDir::new().unwrap();
    let main = write(work.path(), "main.cfg", "A = 1\nB = 0\n@INCLUDE tune.cfg\nC = 4\n");

    let search = SearchPath::new([work.path().to_path_buf(), lib.path().to_path_buf()]);
    let dict = load_parameter_file(&main, &search).unwrap();
    assert_eq!(dict.dump(), "A = 1\nB = tuned\nC = 4\n");
}

#[test]
fn test_bare_name_resolved_on_search_path() {
    let lib = TempDir::new().unwrap();
    write(lib.path(), "lep.cfg", "RUN:BEAMS = LEP\n");

    let search = SearchPath::new([lib.path().to_path_buf()]);
    let mut dict: ParameterDictionary = [("RUN:BEAMS", "LHC")].into_iter().collect();
    load_into(Path::new("lep.cfg"), &search, &mut dict).unwrap();
    assert_eq!(dict.get("RUN:BEAMS"), Some("LEP"));
}

#[test]
fn test_missing_file_is_exit_class_two() {
    let err = load_parameter_file(Path::new("nowhere.cfg"), &SearchPath::default()).unwrap_err();
    assert!(matches!(err, ParamFileError::NotFound { .. }));
    assert!(err.is_missing_file());
}

#[test]
fn test_include_cycle_detected() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.cfg", "@include ./b.cfg\n");
    write(dir.path(), "b.cfg", "@include ./a.cfg\n");

    let err = load_parameter_file(&a, &SearchPath::default()).unwrap_err();
    assert!(matches!(err, ParamFileError::IncludeCycle { .. }));
    assert!(!err.is_missing_file());
}
