use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{NpzReader, ReadNpzError};
use serde::Serialize;

use crate::domain::{HEMISPHERES, N_PARCELS};
use crate::error::HcpError;

/// Parcel coordinates array inside `atlas.npz`.
pub const COORDS: &str = "coords";

/// The Glasser atlas bundle shipped alongside the time series.
pub struct Atlas {
    path: PathBuf,
    reader: NpzReader<File>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtlasSummary {
    pub path: String,
    pub arrays: Vec<String>,
    pub coords_shape: Option<(usize, usize)>,
    pub n_parcels: usize,
    /// Parcel order: the first half of the parcels is the first hemisphere.
    pub hemispheres: [&'static str; 2],
}

impl Atlas {
    pub fn open(path: &Path) -> Result<Self, HcpError> {
        if !path.is_file() {
            return Err(HcpError::MissingFile(path.to_path_buf()));
        }
        let file = File::open(path)
            .map_err(|err| HcpError::Filesystem(format!("open {}: {err}", path.display())))?;
        let reader = NpzReader::new(file).map_err(|err| atlas_err(path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    /// Array names without the `.npy` suffix.
    pub fn names(&mut self) -> Result<Vec<String>, HcpError> {
        let names = self
            .reader
            .names()
            .map_err(|err| atlas_err(&self.path, err))?;
        Ok(names
            .into_iter()
            .map(|name| name.trim_end_matches(".npy").to_string())
            .collect())
    }

    pub fn array2(&mut self, name: &str) -> Result<Array2<f64>, HcpError> {
        self.reader
            .by_name(name)
            .or_else(|_| self.reader.by_name(&format!("{name}.npy")))
            .map_err(|err| atlas_err(&self.path, err))
    }

    /// Parcel centroid coordinates, parcels × 3.
    pub fn coords(&mut self) -> Result<Array2<f64>, HcpError> {
        self.array2(COORDS)
    }

    pub fn summary(&mut self) -> Result<AtlasSummary, HcpError> {
        let arrays = self.names()?;
        let coords_shape = if arrays.iter().any(|name| name == COORDS) {
            Some(self.coords()?.dim())
        } else {
            None
        };
        Ok(AtlasSummary {
            path: self.path.display().to_string(),
            arrays,
            coords_shape,
            n_parcels: N_PARCELS,
            hemispheres: HEMISPHERES,
        })
    }
}

fn atlas_err(path: &Path, err: ReadNpzError) -> HcpError {
    HcpError::Atlas {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
