//! CLI errors and their exit codes

use evgen_core::RunError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("cannot determine the working directory: {0}")]
    WorkingDir(io::Error),

    #[error("precision must be between 1 and {max}, got {0}", max = evgen_core::Precision::MAX)]
    Precision(u8),

    #[error("{0}")]
    Format(String),

    #[error("cannot open output {}: {source}", .path.display())]
    Output { path: PathBuf, source: io::Error },
}

impl CliError {
    /// Process exit status
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 1    | invalid configuration or generator       |
    /// | 2    | missing or unreadable parameter file     |
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Run(e) => e.exit_code(),
            _ => 1,
        }
    }
}

impl From<evgen_core::ParamFileError> for CliError {
    fn from(err: evgen_core::ParamFileError) -> Self {
        CliError::Run(err.into())
    }
}

impl From<evgen_core::ParamError> for CliError {
    fn from(err: evgen_core::ParamError) -> Self {
        CliError::Run(err.into())
    }
}
