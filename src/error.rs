use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HcpError {
    #[error("unknown dataset: {0} (expected one of rest, task, covariates, atlas)")]
    UnknownDataset(String),

    #[error("found no data for experiment '{0}'")]
    UnknownExperiment(String),

    #[error("subject {subject} out of range (dataset has {n_subjects} subjects)")]
    InvalidSubject { subject: u32, n_subjects: u32 },

    #[error("run {run} is out of range for experiment '{experiment}'")]
    RunOutOfRange { experiment: String, run: usize },

    #[error("download request failed: {0}")]
    Http(String),

    #[error("{url} returned status {status}")]
    RemoteStatus { status: u16, url: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to extract archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to read array from {path}: {message}")]
    Npy { path: PathBuf, message: String },

    #[error("{path}:{line}: {message}")]
    EventParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("array shape mismatch: {0}")]
    Shape(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read atlas {path}: {message}")]
    Atlas { path: PathBuf, message: String },
}

impl HcpError {
    /// Lookup failures: a name that is not in the relevant catalog, or a
    /// file the layout says should exist but does not.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            HcpError::UnknownDataset(_)
                | HcpError::UnknownExperiment(_)
                | HcpError::InvalidSubject { .. }
                | HcpError::RunOutOfRange { .. }
                | HcpError::MissingFile(_)
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, HcpError::Http(_) | HcpError::RemoteStatus { .. })
    }
}
