//! Command-line parsing for the diffusion profile fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling/math code. Every path and list option can also come from the
//! environment (a `.env` file is loaded first).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Experiments fitted when none are configured.
pub const DEFAULT_EXPERIMENTS: [&str; 9] = ["3", "7", "10", "11", "13", "15", "17", "18", "21"];
/// Oxides fitted when none are configured.
pub const DEFAULT_OXIDES: [&str; 6] = ["SiO2", "Al2O3", "Na2O", "K2O", "CaO", "TiO2"];

fn default_experiments() -> Vec<String> {
    DEFAULT_EXPERIMENTS.iter().map(|s| s.to_string()).collect()
}

fn default_oxides() -> Vec<String> {
    DEFAULT_OXIDES.iter().map(|s| s.to_string()).collect()
}

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dfit", version, about = "Fit erfc diffusion profiles to oxide concentration data")]
pub struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every configured (experiment, oxide) pair and write the results table.
    Fit(FitArgs),
    /// Fit one pair and draw data and profile in the terminal.
    Plot(PlotArgs),
    /// Write synthetic profile and range tables for testing.
    Generate(GenerateArgs),
}

/// Input tables and the experiment/oxide selection.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Diffusion-profile CSV (`Expt`, `x`, one column per oxide).
    #[arg(short = 'p', long, env = "DFIT_PROFILES", default_value = "DiffusionProfiles.csv")]
    pub profiles: PathBuf,

    /// Range CSV (`Expt.`, `Min x`, `Max x`).
    #[arg(short = 'r', long, env = "DFIT_RANGES", default_value = "XrangeDiffusionProfiles.csv")]
    pub ranges: PathBuf,

    /// Experiment labels (comma separated).
    #[arg(
        short = 'e',
        long,
        env = "DFIT_EXPERIMENTS",
        value_delimiter = ',',
        default_values_t = default_experiments()
    )]
    pub experiments: Vec<String>,

    /// Oxide columns to fit (comma separated).
    #[arg(
        short = 'o',
        long,
        env = "DFIT_OXIDES",
        value_delimiter = ',',
        default_values_t = default_oxides()
    )]
    pub oxides: Vec<String>,

    /// Prefix joining a label to the profile table's experiment ID.
    #[arg(long, env = "DFIT_EXPT_PREFIX", default_value = "SpDis")]
    pub expt_prefix: String,

    /// Do not retry failed fits from alternate starting points.
    #[arg(long)]
    pub no_fallback: bool,

    /// Residual-evaluation budget per start (default 200 * (params + 1)).
    #[arg(long)]
    pub max_evaluations: Option<usize>,
}

/// Options for `dfit fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Results CSV.
    #[arg(long = "output", env = "DFIT_OUTPUT", default_value = "optimized_values.csv")]
    pub output: PathBuf,

    /// Also write the run (config, results, skipped rows) as JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Exit with code 4 if any pair failed.
    #[arg(long)]
    pub strict: bool,

    /// Do not print the summary table.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Options for `dfit plot`.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Experiment label to plot.
    #[arg(long)]
    pub expt: String,

    /// Oxide to plot.
    #[arg(long)]
    pub oxide: String,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Options for `dfit generate`.
#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Profile CSV to write.
    #[arg(long, default_value = "synthetic_profiles.csv")]
    pub profiles: PathBuf,

    /// Range CSV to write.
    #[arg(long, default_value = "synthetic_ranges.csv")]
    pub ranges: PathBuf,

    #[arg(short = 'e', long, value_delimiter = ',', default_values_t = default_experiments())]
    pub experiments: Vec<String>,

    #[arg(short = 'o', long, value_delimiter = ',', default_values_t = default_oxides())]
    pub oxides: Vec<String>,

    #[arg(long, default_value = "SpDis")]
    pub expt_prefix: String,

    /// True slope `m`.
    #[arg(long, default_value_t = 0.5)]
    pub slope: f64,

    /// True boundary concentration `c0`.
    #[arg(long, default_value_t = 2.0)]
    pub c0: f64,

    /// Window start written to the range table.
    #[arg(long, default_value_t = 0.0)]
    pub x_min: f64,

    /// Window end written to the range table.
    #[arg(long, default_value_t = 4.0)]
    pub x_max: f64,

    /// Points per experiment.
    #[arg(long, default_value_t = 25)]
    pub points: usize,

    /// Standard deviation of additive Gaussian noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
