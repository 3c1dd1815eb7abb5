use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HcpError;

/// Cortical parcels in the Glasser multimodal parcellation.
pub const N_PARCELS: usize = 360;

/// Repetition time shared by every acquisition, in seconds.
pub const TR: f64 = 0.72;

/// Hemisphere order of the parcels.
pub const HEMISPHERES: [&str; 2] = ["Right", "Left"];

pub const N_RUNS_REST: usize = 4;
pub const N_RUNS_TASK: usize = 2;

pub const DEFAULT_N_SUBJECTS: u32 = 339;
pub const DEFAULT_ROOT: &str = "./hcp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKey {
    Rest,
    Task,
    Covariates,
    Atlas,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 4] = [
        DatasetKey::Rest,
        DatasetKey::Task,
        DatasetKey::Covariates,
        DatasetKey::Atlas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKey::Rest => "rest",
            DatasetKey::Task => "task",
            DatasetKey::Covariates => "covariates",
            DatasetKey::Atlas => "atlas",
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKey {
    type Err = HcpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(DatasetKey::Rest),
            "task" => Ok(DatasetKey::Task),
            "covariates" => Ok(DatasetKey::Covariates),
            "atlas" => Ok(DatasetKey::Atlas),
            _ => Err(HcpError::UnknownDataset(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub u32);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SubjectId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Absolute 1-based run number across every acquisition in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub usize);

impl RunId {
    pub fn get(self) -> usize {
        self.0
    }

    /// Run `relative` positions after this one, `None` past `usize::MAX`.
    pub fn offset(self, relative: usize) -> Option<RunId> {
        self.0.checked_add(relative).map(RunId)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 0-based runs of one experiment, relative to its first acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunSelection {
    #[default]
    All,
    One(usize),
    Many(Vec<usize>),
}

impl RunSelection {
    /// Relative indices to load. `All` expands to the experiment's repeat
    /// count: four for resting state, two for any task.
    pub fn resolve(&self, experiment: &str) -> Vec<usize> {
        match self {
            RunSelection::All => (0..default_run_count(experiment)).collect(),
            RunSelection::One(run) => vec![*run],
            RunSelection::Many(runs) => runs.clone(),
        }
    }
}

impl From<usize> for RunSelection {
    fn from(value: usize) -> Self {
        RunSelection::One(value)
    }
}

impl From<Vec<usize>> for RunSelection {
    fn from(value: Vec<usize>) -> Self {
        RunSelection::Many(value)
    }
}

impl From<Option<Vec<usize>>> for RunSelection {
    fn from(value: Option<Vec<usize>>) -> Self {
        match value {
            Some(runs) => RunSelection::Many(runs),
            None => RunSelection::All,
        }
    }
}

pub fn default_run_count(experiment: &str) -> usize {
    if experiment.eq_ignore_ascii_case("rest") {
        N_RUNS_REST
    } else {
        N_RUNS_TASK
    }
}
