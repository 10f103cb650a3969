//! Error kinds returned by a verification run.
//!
//! `Fixable` and `Unfixable` are the two violation tiers; everything else
//! aborts the run before any report is produced.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// Reading or formatting a file failed; the run stops immediately.
    #[error("Unable to format file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// At least one file differs from its canonical form. Carries the diff report.
    #[error("{0}")]
    Fixable(String),

    /// No file is dirty but lints remain. Details were already streamed.
    #[error("{0}")]
    Unfixable(String),

    #[error("{0}")]
    Config(String),

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl CheckError {
    /// True for the two violation tiers, false for aborted runs.
    pub fn is_violation(&self) -> bool {
        matches!(self, CheckError::Fixable(_) | CheckError::Unfixable(_))
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
