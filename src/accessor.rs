use camino::Utf8Path;
use ndarray::{Array2, ArrayView2, Axis};
use ndarray_npy::{ReadNpyError, read_npy};

use crate::atlas::Atlas;
use crate::catalog::RunDescriptor;
use crate::config::DataConfig;
use crate::domain::{RunId, RunSelection, SubjectId, TR};
use crate::error::HcpError;
use crate::events::EventTable;
use crate::layout::Layout;

#[derive(Debug, Clone)]
pub struct TimeseriesOptions {
    pub runs: RunSelection,
    pub concatenate: bool,
    pub remove_mean: bool,
}

impl Default for TimeseriesOptions {
    fn default() -> Self {
        Self {
            runs: RunSelection::All,
            concatenate: true,
            remove_mean: true,
        }
    }
}

impl TimeseriesOptions {
    pub fn runs(mut self, runs: impl Into<RunSelection>) -> Self {
        self.runs = runs.into();
        self
    }

    pub fn concatenate(mut self, concatenate: bool) -> Self {
        self.concatenate = concatenate;
        self
    }

    pub fn remove_mean(mut self, remove_mean: bool) -> Self {
        self.remove_mean = remove_mean;
        self
    }
}

/// BOLD signal for one subject: parcels × timepoints.
#[derive(Debug, Clone, PartialEq)]
pub enum Bold {
    Concatenated(Array2<f64>),
    Runs(Vec<Array2<f64>>),
}

impl Bold {
    pub fn n_timepoints(&self) -> usize {
        match self {
            Bold::Concatenated(ts) => ts.ncols(),
            Bold::Runs(runs) => runs.iter().map(Array2::ncols).sum(),
        }
    }

    /// Scan time covered, in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.n_timepoints() as f64 * TR
    }

    pub fn shapes(&self) -> Vec<(usize, usize)> {
        match self {
            Bold::Concatenated(ts) => vec![ts.dim()],
            Bold::Runs(runs) => runs.iter().map(Array2::dim).collect(),
        }
    }

    pub fn into_concatenated(self) -> Option<Array2<f64>> {
        match self {
            Bold::Concatenated(ts) => Some(ts),
            Bold::Runs(_) => None,
        }
    }

    pub fn into_runs(self) -> Vec<Array2<f64>> {
        match self {
            Bold::Concatenated(ts) => vec![ts],
            Bold::Runs(runs) => runs,
        }
    }
}

/// Reads subject data out of a populated root.
pub struct Accessor<'a> {
    config: &'a DataConfig,
    layout: Layout,
}

impl<'a> Accessor<'a> {
    pub fn new(config: &'a DataConfig) -> Self {
        Self {
            config,
            layout: config.layout(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn subjects(&self) -> impl Iterator<Item = SubjectId> + use<> {
        self.config.subjects()
    }

    /// 1-based ids of every acquisition whose label contains `experiment`
    /// (case-insensitive), in catalog order.
    pub fn get_run_ids(&self, experiment: &str) -> Result<Vec<RunId>, HcpError> {
        self.config.experiments.run_ids(experiment)
    }

    pub fn runs(&self, experiment: &str) -> Result<Vec<&'a RunDescriptor>, HcpError> {
        self.config.experiments.lookup(experiment)
    }

    pub fn load_timeseries(
        &self,
        subject: SubjectId,
        experiment: &str,
        options: &TimeseriesOptions,
    ) -> Result<Bold, HcpError> {
        self.config.check_subject(subject)?;
        let relative = options.runs.resolve(experiment);
        let offset = self
            .get_run_ids(experiment)?
            .first()
            .copied()
            .ok_or_else(|| HcpError::UnknownExperiment(experiment.to_string()))?;

        let runs = relative
            .into_iter()
            .map(|run| {
                let absolute = offset.offset(run).ok_or_else(|| HcpError::RunOutOfRange {
                    experiment: experiment.to_string(),
                    run,
                })?;
                self.load_single_timeseries(subject, absolute, options.remove_mean)
            })
            .collect::<Result<Vec<_>, HcpError>>()?;

        if !options.concatenate {
            return Ok(Bold::Runs(runs));
        }
        let views = runs.iter().map(Array2::view).collect::<Vec<ArrayView2<f64>>>();
        let joined = ndarray::concatenate(Axis(1), &views)
            .map_err(|err| HcpError::Shape(format!("cannot join runs of {experiment}: {err}")))?;
        Ok(Bold::Concatenated(joined))
    }

    pub fn load_single_timeseries(
        &self,
        subject: SubjectId,
        run: RunId,
        remove_mean: bool,
    ) -> Result<Array2<f64>, HcpError> {
        self.config.check_subject(subject)?;
        let path = self.layout.timeseries_path(subject, run);
        let mut ts = read_timeseries(&path)?;
        tracing::debug!(%subject, %run, shape = ?ts.dim(), "loaded timeseries");
        if remove_mean {
            subtract_row_means(&mut ts);
        }
        Ok(ts)
    }

    /// One table per run of `experiment`, in catalog order.
    pub fn load_evs(
        &self,
        subject: SubjectId,
        experiment: &str,
        condition: &str,
    ) -> Result<Vec<EventTable>, HcpError> {
        self.config.check_subject(subject)?;
        self.runs(experiment)?
            .into_iter()
            .map(|descriptor| {
                let path = self.layout.ev_path(subject, &descriptor.label, condition);
                EventTable::read(path.as_std_path())
            })
            .collect()
    }

    pub fn load_atlas(&self) -> Result<Atlas, HcpError> {
        Atlas::open(self.layout.atlas_path().as_std_path())
    }
}

fn read_timeseries(path: &Utf8Path) -> Result<Array2<f64>, HcpError> {
    if !path.as_std_path().is_file() {
        return Err(HcpError::MissingFile(path.as_std_path().to_path_buf()));
    }
    let npy_err = |err: ReadNpyError| HcpError::Npy {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    };
    match read_npy::<_, Array2<f64>>(path.as_std_path()) {
        Ok(ts) => Ok(ts),
        // Some exports are single precision.
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, Array2<f32>>(path.as_std_path())
            .map(|ts| ts.mapv(f64::from))
            .map_err(npy_err),
        Err(err) => Err(npy_err(err)),
    }
}

pub fn subtract_row_means(ts: &mut Array2<f64>) {
    if let Some(mean) = ts.mean_axis(Axis(1)) {
        *ts -= &mean.insert_axis(Axis(1));
    }
}
