use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hcp_nma::accessor::{Accessor, Bold, TimeseriesOptions};
use hcp_nma::catalog::RunDescriptor;
use hcp_nma::config::{ConfigLoader, ConfigOverrides, DataConfig};
use hcp_nma::domain::{RunSelection, SubjectId};
use hcp_nma::error::HcpError;
use hcp_nma::events::EventTable;
use hcp_nma::fetch::Fetcher;
use hcp_nma::http::HttpArchiveClient;
use hcp_nma::output::{BarProgress, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "hcp-nma")]
#[command(about = "Fetch and read the Neuromatch Academy preprocessed HCP dataset")]
#[command(version, author)]
struct Cli {
    /// Dataset root (default ./hcp)
    #[arg(long, global = true)]
    root: Option<Utf8PathBuf>,

    /// Number of subjects in the release (default 339)
    #[arg(long, global = true)]
    subjects: Option<u32>,

    /// JSON config file (default hcp-nma.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download and extract datasets (rest, task, covariates, atlas; default all)")]
    Fetch(FetchArgs),
    #[command(about = "List run ids for an experiment")]
    Runs(RunsArgs),
    #[command(about = "Load a subject's time series and report its shape")]
    Timeseries(TimeseriesArgs),
    #[command(about = "Print a subject's EVs for one task condition")]
    Evs(EvsArgs),
    #[command(about = "Summarise the parcellation atlas")]
    Atlas,
}

#[derive(Args)]
struct FetchArgs {
    keys: Vec<String>,
}

#[derive(Args)]
struct RunsArgs {
    experiment: String,
}

#[derive(Args)]
struct TimeseriesArgs {
    subject: u32,
    experiment: String,

    /// 0-based run within the experiment; repeat for several (default all)
    #[arg(long = "run")]
    runs: Vec<usize>,

    /// Keep runs separate instead of joining them in time
    #[arg(long)]
    split: bool,

    /// Skip per-parcel mean removal
    #[arg(long)]
    keep_mean: bool,
}

#[derive(Args)]
struct EvsArgs {
    subject: u32,
    experiment: String,
    condition: String,
}

#[derive(Serialize)]
struct RunsReport<'a> {
    experiment: String,
    runs: Vec<&'a RunDescriptor>,
}

#[derive(Serialize)]
struct TimeseriesReport {
    subject: u32,
    experiment: String,
    concatenated: bool,
    shapes: Vec<(usize, usize)>,
    n_timepoints: usize,
    duration_secs: f64,
}

#[derive(Serialize)]
struct EvsReport {
    subject: u32,
    experiment: String,
    condition: String,
    runs: Vec<EventTable>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HcpError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HcpError) -> u8 {
    if error.is_lookup() {
        2
    } else if error.is_network() {
        3
    } else {
        1
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            root: cli.root,
            subjects: cli.subjects,
        },
    )?;

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, &config, output_mode),
        Commands::Runs(args) => run_runs(args, &config),
        Commands::Timeseries(args) => run_timeseries(args, &config),
        Commands::Evs(args) => run_evs(args, &config),
        Commands::Atlas => run_atlas(&config),
    }
}

fn run_fetch(args: FetchArgs, config: &DataConfig, output_mode: OutputMode) -> miette::Result<()> {
    // Reject unknown keys before building a client.
    config.datasets.select(&args.keys)?;

    let fetcher = Fetcher::new(config, HttpArchiveClient::new()?);
    match output_mode {
        OutputMode::NonInteractive => {
            let result = fetcher.fetch(&args.keys, &JsonOutput)?;
            JsonOutput::print(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let progress = BarProgress::new();
            let result = fetcher.fetch(&args.keys, &progress);
            progress.finish();
            print_fetch_summary(&result?);
        }
    }
    Ok(())
}

fn print_fetch_summary(result: &hcp_nma::fetch::FetchResult) {
    println!("dataset root: {}", result.root);
    for item in &result.items {
        match item.bytes {
            Some(bytes) => println!(
                "  {:<10} downloaded {} bytes, {} files extracted -> {}",
                item.key.as_str(),
                bytes,
                item.extracted_entries,
                item.archive_path
            ),
            None => println!(
                "  {:<10} already present -> {}",
                item.key.as_str(),
                item.archive_path
            ),
        }
    }
}

fn run_runs(args: RunsArgs, config: &DataConfig) -> miette::Result<()> {
    let accessor = Accessor::new(config);
    let runs = accessor.runs(&args.experiment)?;
    JsonOutput::print(&RunsReport {
        experiment: args.experiment,
        runs,
    })
    .into_diagnostic()
}

fn run_timeseries(args: TimeseriesArgs, config: &DataConfig) -> miette::Result<()> {
    let accessor = Accessor::new(config);
    let runs = if args.runs.is_empty() {
        RunSelection::All
    } else {
        RunSelection::Many(args.runs)
    };
    let options = TimeseriesOptions::default()
        .runs(runs)
        .concatenate(!args.split)
        .remove_mean(!args.keep_mean);
    let bold = accessor.load_timeseries(SubjectId(args.subject), &args.experiment, &options)?;
    JsonOutput::print(&TimeseriesReport {
        subject: args.subject,
        experiment: args.experiment,
        concatenated: matches!(bold, Bold::Concatenated(_)),
        shapes: bold.shapes(),
        n_timepoints: bold.n_timepoints(),
        duration_secs: bold.duration_secs(),
    })
    .into_diagnostic()
}

fn run_evs(args: EvsArgs, config: &DataConfig) -> miette::Result<()> {
    let accessor = Accessor::new(config);
    let runs = accessor.load_evs(SubjectId(args.subject), &args.experiment, &args.condition)?;
    JsonOutput::print(&EvsReport {
        subject: args.subject,
        experiment: args.experiment,
        condition: args.condition,
        runs,
    })
    .into_diagnostic()
}

fn run_atlas(config: &DataConfig) -> miette::Result<()> {
    let mut atlas = Accessor::new(config).load_atlas()?;
    let summary = atlas.summary()?;
    JsonOutput::print(&summary).into_diagnostic()
}
