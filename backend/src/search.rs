//! Search path for generator bindings and parameter files
//!
//! An ordered list of directories consulted front to back. The standard
//! order is:
//!
//! 1. The current working directory
//! 2. Every entry of the `EVGEN_PATH` environment variable (platform
//!    path-list syntax)
//! 3. The installation default
//!
//! The environment is read by the caller and handed in, so resolution
//! itself stays pure and testable.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Environment variable holding extra search directories
pub const SEARCH_PATH_ENV: &str = "EVGEN_PATH";

/// Installation default, overridable at compile time
pub const INSTALL_DIR: &str = match option_env!("EVGEN_INSTALL_DIR") {
    Some(dir) => dir,
    None => "/usr/local/share/evgen",
};

/// Ordered list of search directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Build from an explicit directory list
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// Current directory, then `env_value` entries, then [`INSTALL_DIR`]
    ///
    /// `env_value` is the raw value of [`SEARCH_PATH_ENV`], if set. Empty
    /// entries are skipped.
    pub fn standard(cwd: PathBuf, env_value: Option<&OsStr>) -> Self {
        let mut dirs = vec![cwd];
        if let Some(value) = env_value {
            dirs.extend(std::env::split_paths(value).filter(|p| !p.as_os_str().is_empty()));
        }
        dirs.push(PathBuf::from(INSTALL_DIR));
        Self { dirs }
    }

    /// Directories in search order
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First `dir/name` that exists as a file
    pub fn find(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// True if `path` names a location explicitly rather than a bare file name
///
/// Explicit paths are absolute or contain a directory component; bare names
/// go through the search path.
pub fn is_explicit_path(path: &Path) -> bool {
    path.is_absolute() || path.components().count() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let env = std::env::join_paths(["/opt/a", "", "/opt/b"]).unwrap();
        let path = SearchPath::standard(PathBuf::from("/work"), Some(env.as_os_str()));

        assert_eq!(
            path.dirs(),
            &[
                PathBuf::from("/work"),
                PathBuf::from("/opt/a"),
                PathBuf::from("/opt/b"),
                PathBuf::from(INSTALL_DIR),
            ]
        );
    }

    #[test]
    fn test_explicit_path_detection() {
        assert!(is_explicit_path(Path::new("/etc/tune.params")));
        assert!(is_explicit_path(Path::new("tunes/a.params")));
        assert!(!is_explicit_path(Path::new("a.params")));
    }

    #[test]
    fn test_find_prefers_earlier_dirs() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("x.params"), "A=1\n").unwrap();
        std::fs::write(second.path().join("x.params"), "A=2\n").unwrap();

        let path = SearchPath::new([second.path().to_path_buf(), first.path().to_path_buf()]);
        assert_eq!(path.find("x.params"), Some(second.path().join("x.params")));
        assert_eq!(path.find("missing.params"), None);
    }
}
