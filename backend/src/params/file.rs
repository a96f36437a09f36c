//! Parameter file loader
//!
//! # Format
//!
//! ```text
//! # full-line comment
//! MSTP(81) = 0          # trailing comment
//! PARP(82)   2.1        # whitespace-separated form
//! @include common.params
//! @INCLUDE tunes/extra.params
//! ```
//!
//! - `#` starts a comment that runs to end of line
//! - Blank lines are ignored
//! - `@include <path>` (case-insensitive) expands another file in place;
//!   bare names are resolved on the search path, explicit relative paths
//!   against the including file's directory
//! - Any other line is `KEY = VALUE` or `KEY VALUE`
//! - Later occurrences of a key overwrite earlier ones in place

use super::ParameterDictionary;
use crate::search::{is_explicit_path, SearchPath};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a parameter file
#[derive(Debug, Error)]
pub enum ParamFileError {
    #[error("parameter file '{name}' not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("cannot read parameter file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed parameter line '{text}'", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{}: include cycle through {}", .path.display(), .included.display())]
    IncludeCycle { path: PathBuf, included: PathBuf },
}

impl ParamFileError {
    /// True for the missing/unreadable class (process exit status 2)
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            ParamFileError::NotFound { .. } | ParamFileError::Unreadable { .. }
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a parameter file, expanding includes
///
/// `name` is resolved like an include target: explicit paths are used as
/// given, bare names go through `search`.
pub fn load_parameter_file(
    name: &Path,
    search: &SearchPath,
) -> Result<ParameterDictionary, ParamFileError> {
    let mut dict = ParameterDictionary::new();
    load_into(name, search, &mut dict)?;
    Ok(dict)
}

/// Load a parameter file on top of an existing dictionary
pub fn load_into(
    name: &Path,
    search: &SearchPath,
    dict: &mut ParameterDictionary,
) -> Result<(), ParamFileError> {
    let path = resolve(name, None, search)?;
    let mut stack = Vec::new();
    expand(&path, search, dict, &mut stack)
}

fn resolve(
    name: &Path,
    including_dir: Option<&Path>,
    search: &SearchPath,
) -> Result<PathBuf, ParamFileError> {
    if is_explicit_path(name) {
        let path = match including_dir {
            Some(dir) if name.is_relative() => dir.join(name),
            _ => name.to_path_buf(),
        };
        if path.is_file() {
            return Ok(path);
        }
        return Err(ParamFileError::NotFound {
            name: name.display().to_string(),
            searched: vec![path],
        });
    }

    search.find(name).ok_or_else(|| ParamFileError::NotFound {
        name: name.display().to_string(),
        searched: search.dirs().to_vec(),
    })
}

fn expand(
    path: &Path,
    search: &SearchPath,
    dict: &mut ParameterDictionary,
    stack: &mut Vec<PathBuf>,
) -> Result<(), ParamFileError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&canonical) {
        let parent = stack.last().cloned().unwrap_or_else(|| canonical.clone());
        return Err(ParamFileError::IncludeCycle {
            path: parent,
            included: canonical,
        });
    }

    let text = std::fs::read_to_string(path).map_err(|source| ParamFileError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(file = %path.display(), "reading parameter file");
    stack.push(canonical);

    for (lineno, raw) in text.lines().enumerate() {
        let malformed = || ParamFileError::Malformed {
            path: path.to_path_buf(),
            line: lineno + 1,
            text: raw.trim().to_string(),
        };

        match parse_line(raw).ok_or_else(malformed)? {
            Line::Blank => {}
            Line::Include(target) => {
                let included = resolve(Path::new(target), path.parent(), search)?;
                expand(&included, search, dict, stack)?;
            }
            Line::Assignment(key, value) => dict.insert(key, value),
        }
    }

    stack.pop();
    Ok(())
}

/// One logical line of a parameter file
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Blank,
    Include(&'a str),
    Assignment(&'a str, &'a str),
}

/// Classify a raw line; `None` means malformed
fn parse_line(raw: &str) -> Option<Line<'_>> {
    let content = raw.split('#').next().unwrap_or("").trim();
    if content.is_empty() {
        return Some(Line::Blank);
    }

    if let Some(directive) = content.strip_prefix('@') {
        let (word, rest) = match directive.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (directive, ""),
        };
        if word.eq_ignore_ascii_case("include") && !rest.is_empty() {
            return Some(Line::Include(rest));
        }
        return None;
    }

    let (key, value) = match content.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => {
            let (key, value) = content.split_once(char::is_whitespace)?;
            (key.trim(), value.trim())
        }
    };

    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some(Line::Assignment(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_forms() {
        assert_eq!(parse_line("   "), Some(Line::Blank));
        assert_eq!(parse_line("# only a comment"), Some(Line::Blank));
        assert_eq!(
            parse_line("MSTP(81) = 0   # MPI off"),
            Some(Line::Assignment("MSTP(81)", "0"))
        );
        assert_eq!(
            parse_line("PARP(82)    2.1"),
            Some(Line::Assignment("PARP(82)", "2.1"))
        );
        assert_eq!(
            parse_line("@Include  tune.params"),
            Some(Line::Include("tune.params"))
        );
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert_eq!(parse_line("LONELYKEY"), None);
        assert_eq!(parse_line("@include"), None);
        assert_eq!(parse_line("@define X 1"), None);
        assert_eq!(parse_line(" = 3"), None);
        assert_eq!(parse_line("TWO WORDS = 3"), None);
    }
}
