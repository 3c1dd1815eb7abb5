use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::catalog::{DatasetCatalog, ExperimentCatalog};
use crate::domain::{DEFAULT_N_SUBJECTS, DEFAULT_ROOT, DatasetKey, SubjectId};
use crate::error::HcpError;
use crate::layout::Layout;

pub const DEFAULT_CONFIG_FILE: &str = "hcp-nma.json";

/// Optional on-disk overrides, e.g.
///
/// ```json
/// { "root": "/data/hcp", "subjects": 20, "sources": { "atlas": "https://mirror/atlas.npz" } }
/// ```
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub root: Option<Utf8PathBuf>,
    #[serde(default)]
    pub subjects: Option<u32>,
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root: Option<Utf8PathBuf>,
    pub subjects: Option<u32>,
}

/// Everything the fetcher and the accessor need, resolved once and passed
/// explicitly.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub root: Utf8PathBuf,
    pub n_subjects: u32,
    pub datasets: DatasetCatalog,
    pub experiments: ExperimentCatalog,
}

impl DataConfig {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_subjects(mut self, n_subjects: u32) -> Self {
        self.n_subjects = n_subjects;
        self
    }

    pub fn with_experiments(mut self, experiments: ExperimentCatalog) -> Self {
        self.experiments = experiments;
        self
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.root.clone())
    }

    pub fn subjects(&self) -> impl Iterator<Item = SubjectId> + use<> {
        (0..self.n_subjects).map(SubjectId)
    }

    pub fn check_subject(&self, subject: SubjectId) -> Result<(), HcpError> {
        if subject.0 >= self.n_subjects {
            return Err(HcpError::InvalidSubject {
                subject: subject.0,
                n_subjects: self.n_subjects,
            });
        }
        Ok(())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from(DEFAULT_ROOT),
            n_subjects: DEFAULT_N_SUBJECTS,
            datasets: DatasetCatalog::default(),
            experiments: ExperimentCatalog::hcp(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the config file, then `overrides`. An explicit `path`
    /// must exist; the default file is optional.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<DataConfig, HcpError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let file = if path.is_none() && !config_path.exists() {
            ConfigFile::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| HcpError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| HcpError::ConfigParse(err.to_string()))?
        };

        let mut config = Self::resolve_config(file)?;
        if let Some(root) = overrides.root {
            config.root = root;
        }
        if let Some(subjects) = overrides.subjects {
            config.n_subjects = subjects;
        }
        tracing::debug!(root = %config.root, subjects = config.n_subjects, "resolved config");
        Ok(config)
    }

    pub fn resolve_config(file: ConfigFile) -> Result<DataConfig, HcpError> {
        let mut config = DataConfig::default();
        if let Some(root) = file.root {
            config.root = root;
        }
        if let Some(subjects) = file.subjects {
            config.n_subjects = subjects;
        }
        for (name, url) in file.sources {
            let key: DatasetKey = name.parse()?;
            config.datasets.set_source(key, url);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_match_published_dataset() {
        let config = ConfigLoader::resolve_config(ConfigFile::default()).unwrap();
        assert_eq!(config.root, "./hcp");
        assert_eq!(config.n_subjects, 339);
        assert_eq!(config.datasets.len(), 4);
        assert_eq!(config.experiments.len(), 18);
    }

    #[test]
    fn source_override_keeps_filename() {
        let file = ConfigFile {
            root: None,
            subjects: Some(5),
            sources: BTreeMap::from([("atlas".to_string(), "http://mirror/a".to_string())]),
        };
        let config = ConfigLoader::resolve_config(file).unwrap();
        let atlas = config.datasets.get(DatasetKey::Atlas).unwrap();
        assert_eq!(atlas.source_url, "http://mirror/a");
        assert_eq!(atlas.archive_filename, "atlas.npz");
        assert_eq!(config.subjects().count(), 5);
    }

    #[test]
    fn unknown_source_key_is_rejected() {
        let file = ConfigFile {
            sources: BTreeMap::from([("video".to_string(), "http://x".to_string())]),
            ..ConfigFile::default()
        };
        let err = ConfigLoader::resolve_config(file).unwrap_err();
        assert_matches!(err, HcpError::UnknownDataset(_));
    }
}
