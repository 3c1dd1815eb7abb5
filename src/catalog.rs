use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::{DatasetKey, RunId};
use crate::error::HcpError;

/// Acquisition labels in the order the upstream pipeline numbered the BOLD
/// files. Run offsets are derived from this order.
pub const BOLD_NAMES: [&str; 18] = [
    "rfMRI_REST1_LR",
    "rfMRI_REST1_RL",
    "rfMRI_REST2_LR",
    "rfMRI_REST2_RL",
    "tfMRI_MOTOR_RL",
    "tfMRI_MOTOR_LR",
    "tfMRI_WM_RL",
    "tfMRI_WM_LR",
    "tfMRI_EMOTION_RL",
    "tfMRI_EMOTION_LR",
    "tfMRI_GAMBLING_RL",
    "tfMRI_GAMBLING_LR",
    "tfMRI_LANGUAGE_RL",
    "tfMRI_LANGUAGE_LR",
    "tfMRI_RELATIONAL_RL",
    "tfMRI_RELATIONAL_LR",
    "tfMRI_SOCIAL_RL",
    "tfMRI_SOCIAL_LR",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunDescriptor {
    pub run: RunId,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ExperimentCatalog {
    runs: Vec<RunDescriptor>,
    families: HashMap<String, Vec<usize>>,
}

impl ExperimentCatalog {
    pub fn hcp() -> Self {
        Self::from_labels(BOLD_NAMES)
    }

    /// Builds a catalog whose run ids are the 1-based positions of `labels`.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let runs = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| RunDescriptor {
                run: RunId(index + 1),
                label: label.into(),
            })
            .collect::<Vec<_>>();

        let mut families = HashMap::new();
        for descriptor in &runs {
            for family in family_names(&descriptor.label) {
                families
                    .entry(family.clone())
                    .or_insert_with(|| scan(&runs, &family));
            }
        }

        Self { runs, families }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[RunDescriptor] {
        &self.runs
    }

    pub fn label(&self, run: RunId) -> Option<&str> {
        run.get()
            .checked_sub(1)
            .and_then(|index| self.runs.get(index))
            .map(|descriptor| descriptor.label.as_str())
    }

    /// Experiment family names known to the index, sorted.
    pub fn families(&self) -> Vec<&str> {
        let mut names = self.families.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Every acquisition whose label contains `name`, ignoring case, in
    /// catalog order. Never empty. A blank name matches nothing.
    pub fn lookup(&self, name: &str) -> Result<Vec<&RunDescriptor>, HcpError> {
        if name.trim().is_empty() {
            return Err(HcpError::UnknownExperiment(name.to_string()));
        }
        let key = name.to_lowercase();
        let positions = match self.families.get(&key) {
            Some(positions) => positions.clone(),
            None => scan(&self.runs, &key),
        };
        if positions.is_empty() {
            return Err(HcpError::UnknownExperiment(name.to_string()));
        }
        Ok(positions.into_iter().map(|index| &self.runs[index]).collect())
    }

    pub fn run_ids(&self, name: &str) -> Result<Vec<RunId>, HcpError> {
        Ok(self
            .lookup(name)?
            .into_iter()
            .map(|descriptor| descriptor.run)
            .collect())
    }
}

impl Default for ExperimentCatalog {
    fn default() -> Self {
        Self::hcp()
    }
}

fn scan(runs: &[RunDescriptor], needle: &str) -> Vec<usize> {
    let needle = needle.to_lowercase();
    runs.iter()
        .enumerate()
        .filter(|(_, descriptor)| descriptor.label.to_lowercase().contains(&needle))
        .map(|(index, _)| index)
        .collect()
}

/// Modality prefix, stem, phase-encoding suffix.
static FAMILY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z]+mri_)?(.+?)(?:_(?:lr|rl))?$").expect("family pattern is valid")
});

/// `rfMRI_REST1_LR` yields `rest1` and `rest`; `tfMRI_WM_RL` yields `wm`.
fn family_names(label: &str) -> Vec<String> {
    let Some(stem) = FAMILY_PATTERN
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_lowercase())
    else {
        return Vec::new();
    };
    let mut names = vec![stem.clone()];
    let trimmed = stem.trim_end_matches(|ch: char| ch.is_ascii_digit());
    if !trimmed.is_empty() && trimmed != stem {
        names.push(trimmed.to_string());
    }
    names
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    pub key: DatasetKey,
    pub archive_filename: String,
    pub source_url: String,
}

impl DatasetEntry {
    pub fn new(key: DatasetKey, source_url: impl Into<String>) -> Self {
        Self {
            key,
            archive_filename: default_archive_filename(key),
            source_url: source_url.into(),
        }
    }
}

pub fn default_archive_filename(key: DatasetKey) -> String {
    match key {
        DatasetKey::Atlas => format!("{key}.npz"),
        _ => format!("{key}.tgz"),
    }
}

pub fn default_source_url(key: DatasetKey) -> &'static str {
    match key {
        DatasetKey::Rest => "https://osf.io/bqp7m/download/",
        DatasetKey::Task => "https://osf.io/s4h8j/download/",
        DatasetKey::Covariates => "https://osf.io/x5p4g/download/",
        DatasetKey::Atlas => "https://osf.io/j5kuc/download",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetCatalog {
    entries: BTreeMap<DatasetKey, DatasetEntry>,
}

impl DatasetCatalog {
    pub fn new(entries: impl IntoIterator<Item = DatasetEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key, entry))
                .collect(),
        }
    }

    pub fn get(&self, key: DatasetKey) -> Result<&DatasetEntry, HcpError> {
        self.entries
            .get(&key)
            .ok_or_else(|| HcpError::UnknownDataset(key.to_string()))
    }

    pub fn set_source(&mut self, key: DatasetKey, url: impl Into<String>) {
        let url = url.into();
        match self.entries.get_mut(&key) {
            Some(entry) => entry.source_url = url,
            None => {
                self.entries.insert(key, DatasetEntry::new(key, url));
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DatasetEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves requested key names against the catalog. An empty request
    /// selects every entry. Fails on the first unknown name.
    pub fn select<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<&DatasetEntry>, HcpError> {
        if requested.is_empty() {
            return Ok(self.entries().collect());
        }
        let mut selected: Vec<&DatasetEntry> = Vec::new();
        for name in requested {
            let key: DatasetKey = name.as_ref().parse()?;
            let entry = self
                .entries
                .get(&key)
                .ok_or_else(|| HcpError::UnknownDataset(name.as_ref().to_string()))?;
            if !selected.iter().any(|existing| existing.key == key) {
                selected.push(entry);
            }
        }
        Ok(selected)
    }
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self::new(
            DatasetKey::ALL
                .into_iter()
                .map(|key| DatasetEntry::new(key, default_source_url(key))),
        )
    }
}
