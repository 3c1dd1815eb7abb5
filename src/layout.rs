use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::catalog::DatasetEntry;
use crate::domain::{RunId, SubjectId};
use crate::error::HcpError;

const TIMESERIES_SUFFIX: &str = "_Atlas_MSMAll_Glasser360Cortical.npy";

/// On-disk convention shared by the fetcher and the accessor.
///
/// ```text
/// {root}/{key}.tgz | atlas.npz
/// {root}/subjects/{subject}/timeseries/bold{run}_Atlas_MSMAll_Glasser360Cortical.npy
/// {root}/subjects/{subject}/EVs/{acquisition}/{condition}.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: Utf8PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn archive_path(&self, entry: &DatasetEntry) -> Utf8PathBuf {
        self.root.join(&entry.archive_filename)
    }

    pub fn subject_dir(&self, subject: SubjectId) -> Utf8PathBuf {
        self.root.join("subjects").join(subject.to_string())
    }

    pub fn timeseries_dir(&self, subject: SubjectId) -> Utf8PathBuf {
        self.subject_dir(subject).join("timeseries")
    }

    pub fn timeseries_path(&self, subject: SubjectId, run: RunId) -> Utf8PathBuf {
        self.timeseries_dir(subject)
            .join(format!("bold{run}{TIMESERIES_SUFFIX}"))
    }

    pub fn ev_path(&self, subject: SubjectId, acquisition: &str, condition: &str) -> Utf8PathBuf {
        self.subject_dir(subject)
            .join("EVs")
            .join(acquisition)
            .join(format!("{condition}.txt"))
    }

    pub fn atlas_path(&self) -> Utf8PathBuf {
        self.root.join("atlas.npz")
    }

    pub fn ensure_root(&self) -> Result<(), HcpError> {
        ensure_directory(&self.root)
    }
}

/// Creates `path` and any missing parents; an existing directory is fine.
pub fn ensure_directory(path: &Utf8Path) -> Result<(), HcpError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| HcpError::Filesystem(format!("create {path}: {err}")))
}
