//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Rate constants for one SIR regime.
///
/// Both are per-day rates: `k1` drives the S→I flux `k1 * S * I / N` and
/// `k2` drives the I→R flux `k2 * I`. They are fixed for the duration of a
/// single integration call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateParams {
    /// Transmission rate coefficient (1/day).
    pub k1: f64,
    /// Removal/recovery rate coefficient (1/day).
    pub k2: f64,
}

impl RateParams {
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    /// Reject non-finite or non-positive rates before any integration starts.
    ///
    /// Zero or negative rates produce degenerate dynamics (no transmission, or
    /// spontaneous un-recovery), so they are treated as input errors rather
    /// than silently integrated.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.k1.is_finite() && self.k1 > 0.0) {
            return Err(AppError::new(
                2,
                format!("k1 must be finite and > 0 (got {})", self.k1),
            ));
        }
        if !(self.k2.is_finite() && self.k2 > 0.0) {
            return Err(AppError::new(
                2,
                format!("k2 must be finite and > 0 (got {})", self.k2),
            ));
        }
        Ok(())
    }

    /// Basic reproduction number `R0 = k1 / k2` for a fully susceptible population.
    pub fn basic_reproduction_number(&self) -> f64 {
        self.k1 / self.k2
    }
}

/// Compartment populations at one instant: Susceptible, Infected, Recovered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompartmentState {
    pub s: f64,
    pub i: f64,
    pub r: f64,
}

impl CompartmentState {
    pub fn new(s: f64, i: f64, r: f64) -> Self {
        Self { s, i, r }
    }

    /// Total population represented by this state.
    pub fn total(&self) -> f64 {
        self.s + self.i + self.r
    }

    /// Reject negative or non-finite initial populations, and the all-zero
    /// population (the flux term divides by the population total).
    pub fn validate_initial(&self) -> Result<(), AppError> {
        for (name, v) in [("S0", self.s), ("I0", self.i), ("R0", self.r)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::new(
                    2,
                    format!("{name} must be finite and >= 0 (got {v})"),
                ));
            }
        }
        if self.total() <= 0.0 {
            return Err(AppError::new(2, "Initial population is zero; nothing to simulate."));
        }
        Ok(())
    }
}

/// Fit quality for one regime window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub mse: f64,
    pub rmse: f64,
    /// Number of observed days compared.
    pub n: usize,
}

/// A half-open window of day indices `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: usize,
    pub end: usize,
}

impl DayWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One fitted regime: rate constants, the window they cover, the initial
/// state the integration was seeded with, and goodness of fit on that window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeFit {
    pub params: RateParams,
    pub window: DayWindow,
    pub initial: CompartmentState,
    pub quality: FitQuality,
    /// Maximum infected count predicted by this regime over the full horizon.
    pub peak_infected: f64,
    /// Day index (within the regime's own time axis) at which the peak occurs.
    pub peak_day: usize,
}

/// A per-day comparison of observed cases against the fitted infected curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayResidual {
    pub day: usize,
    pub date: chrono::NaiveDate,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// State name to filter case rows on (e.g. "Idaho").
    pub state: String,
    /// Reference total population for the modeled region.
    pub population: f64,

    /// Remote CSV source (`date,state,fips,cases,deaths`).
    pub data_url: String,
    /// Local CSV file used instead of the remote source when set.
    pub data_file: Option<PathBuf>,
    /// Local `date, event` annotation CSV (optional).
    pub annotations: Option<PathBuf>,

    /// Day index at which the model switches from the first to the second regime.
    pub switch_day: usize,
    /// Rate constants before the switch day.
    pub initial_regime: RateParams,
    /// Rate constants from the switch day onward.
    pub post_regime: RateParams,
    /// Infected count seeding the first regime at day 0.
    pub seed_infected: f64,

    /// Simulation horizon in days for reported peaks.
    pub horizon_days: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
}

/// Configuration for a `(k1, k2)` grid-search sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub k1_min: f64,
    pub k1_max: f64,
    pub k1_steps: usize,
    pub k2_min: f64,
    pub k2_max: f64,
    pub k2_steps: usize,
}

/// A saved fitted-model file (JSON).
///
/// This is the portable representation of a completed two-regime fit:
/// parameters, quality per window, and a precomputed fitted infected curve
/// for quick plotting without re-solving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub state: String,
    pub population: f64,
    pub switch_day: usize,
    pub regimes: Vec<RegimeFit>,
    pub grid: CurveGrid,
}

/// Fitted infected counts on the daily grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub day: Vec<f64>,
    pub infected: Vec<f64>,
}
