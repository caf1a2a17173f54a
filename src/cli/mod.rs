//! Command-line parsing for the SIR outbreak fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::DEFAULT_DATA_URL;
use crate::domain::{FitConfig, RateParams, SweepConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sirfit", version, about = "Piecewise SIR outbreak fitter (NYT case data)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the two-regime model against observed cases, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Grid-search (k1, k2) for the second regime, picking the lowest-MSE cell.
    Sweep(SweepArgs),
    /// Simulate one SIR regime forward without observed data.
    Simulate(SimArgs),
    /// Plot a previously exported model JSON.
    Plot(PlotArgs),
}

/// Common options for fitting and sweeping.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// State name to filter case rows on.
    #[arg(short = 's', long, default_value = "Idaho")]
    pub state: String,

    /// Total population of the modeled region.
    #[arg(long, default_value_t = 1_787_065.0)]
    pub population: f64,

    /// Remote case-data CSV URL (date,state,fips,cases,deaths).
    #[arg(long, default_value = DEFAULT_DATA_URL)]
    pub data_url: String,

    /// Local case-data CSV file (used instead of the URL when set).
    #[arg(long, value_name = "CSV")]
    pub data_file: Option<PathBuf>,

    /// Annotation CSV file (`date, event` rows) to mark on the plot.
    #[arg(long, value_name = "CSV")]
    pub annotations: Option<PathBuf>,

    /// Day index at which the second regime takes over.
    #[arg(long, default_value_t = 21)]
    pub switch_day: usize,

    /// Transmission rate for the first regime (1/day).
    #[arg(long, default_value_t = 1.3)]
    pub k1: f64,

    /// Removal rate for the first regime (1/day).
    #[arg(long, default_value_t = 1.0)]
    pub k2: f64,

    /// Transmission rate for the second regime (1/day).
    #[arg(long, default_value_t = 1.06)]
    pub k1_post: f64,

    /// Removal rate for the second regime (1/day).
    #[arg(long, default_value_t = 1.025)]
    pub k2_post: f64,

    /// Infected count seeding day 0.
    #[arg(long, default_value_t = 2.0)]
    pub seed_infected: f64,

    /// Simulation horizon in days (for reported peaks).
    #[arg(long, default_value_t = 365)]
    pub horizon: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-day results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export model (parameters + fitted grid) to JSON.
    #[arg(long = "export-model")]
    pub export_model: Option<PathBuf>,
}

impl FitArgs {
    /// Resolve CLI flags into the pipeline's run configuration.
    pub fn to_config(&self) -> FitConfig {
        FitConfig {
            state: self.state.clone(),
            population: self.population,
            data_url: self.data_url.clone(),
            data_file: self.data_file.clone(),
            annotations: self.annotations.clone(),
            switch_day: self.switch_day,
            initial_regime: RateParams::new(self.k1, self.k2),
            post_regime: RateParams::new(self.k1_post, self.k2_post),
            seed_infected: self.seed_infected,
            horizon_days: self.horizon,
            plot: self.plot && !self.no_plot,
            plot_width: self.width,
            plot_height: self.height,
            export_results: self.export.clone(),
            export_model: self.export_model.clone(),
        }
    }
}

/// Options for the second-regime grid sweep.
#[derive(Debug, Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Minimum k1 for the sweep grid.
    #[arg(long, default_value_t = 0.8)]
    pub k1_min: f64,

    /// Maximum k1 for the sweep grid.
    #[arg(long, default_value_t = 1.4)]
    pub k1_max: f64,

    /// Number of k1 grid points.
    #[arg(long, default_value_t = 25)]
    pub k1_steps: usize,

    /// Minimum k2 for the sweep grid.
    #[arg(long, default_value_t = 0.8)]
    pub k2_min: f64,

    /// Maximum k2 for the sweep grid.
    #[arg(long, default_value_t = 1.4)]
    pub k2_max: f64,

    /// Number of k2 grid points.
    #[arg(long, default_value_t = 25)]
    pub k2_steps: usize,
}

impl SweepArgs {
    pub fn to_sweep_config(&self) -> SweepConfig {
        SweepConfig {
            k1_min: self.k1_min,
            k1_max: self.k1_max,
            k1_steps: self.k1_steps,
            k2_min: self.k2_min,
            k2_max: self.k2_max,
            k2_steps: self.k2_steps,
        }
    }
}

/// Options for a standalone forward simulation.
#[derive(Debug, Args)]
pub struct SimArgs {
    /// Total population of the modeled region.
    #[arg(long, default_value_t = 1_787_065.0)]
    pub population: f64,

    /// Transmission rate (1/day).
    #[arg(long, default_value_t = 1.3)]
    pub k1: f64,

    /// Removal rate (1/day).
    #[arg(long, default_value_t = 1.0)]
    pub k2: f64,

    /// Infected count seeding day 0.
    #[arg(long, default_value_t = 2.0)]
    pub seed_infected: f64,

    /// Simulation horizon in days.
    #[arg(long, default_value_t = 365)]
    pub horizon: usize,

    /// Render an ASCII plot of the infected curve.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for plotting a saved model.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Model JSON file produced by `sirfit fit --export-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
