//! Parallel `(k1, k2)` grid-search sweep.
//!
//! Every grid cell is one independent SIR integration scored by MSE against
//! the observed case counts, so the whole sweep is a rayon map with a
//! deterministic min-reduction at the end (ties break toward the lower grid
//! index). No shared mutable state: each cell owns its solver state and
//! trajectory outright.

use rayon::prelude::*;

use crate::data::ObservedSeries;
use crate::domain::{CompartmentState, FitConfig, RateParams, SweepConfig};
use crate::error::AppError;
use crate::fit::grid::rate_grid;
use crate::fit::mean_squared_error;
use crate::models::integrate;

/// One evaluated grid cell.
#[derive(Debug, Clone)]
pub struct SweepCell {
    pub idx: usize,
    pub params: RateParams,
    pub mse: f64,
}

/// Result of a full sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub best: SweepCell,
    /// Cells that produced a finite score.
    pub evaluated: usize,
    /// Cells skipped because their integration failed or scored non-finite.
    pub skipped: usize,
}

/// Evaluate the grid and return the minimum-MSE cell.
///
/// Each integration is seeded like the first fit regime: the configured
/// initial infected count against the full population. Modeled infected
/// counts are compared against observed case counts day by day.
pub fn run_sweep(
    observed: &ObservedSeries,
    config: &FitConfig,
    sweep: &SweepConfig,
) -> Result<SweepOutcome, AppError> {
    let n_obs = observed.len();
    if n_obs < 2 {
        return Err(AppError::new(3, "Need at least two observed days to sweep."));
    }

    let grid = rate_grid(sweep)?;
    let initial = CompartmentState::new(
        config.population - config.seed_infected,
        config.seed_infected,
        0.0,
    );
    initial.validate_initial()?;

    let cells: Vec<SweepCell> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &params)| {
            let traj = integrate(params, initial, n_obs).ok()?;
            let mse = mean_squared_error(&traj.infected(), &observed.cases).ok()?;
            if !mse.is_finite() {
                return None;
            }
            Some(SweepCell { idx, params, mse })
        })
        .collect();

    if cells.is_empty() {
        return Err(AppError::new(4, "No sweep cell produced a finite score."));
    }

    // Deterministic selection: minimum MSE, ties broken by grid index.
    let mut best = &cells[0];
    for c in &cells[1..] {
        if c.mse < best.mse || (c.mse == best.mse && c.idx < best.idx) {
            best = c;
        }
    }

    Ok(SweepOutcome {
        best: best.clone(),
        evaluated: cells.len(),
        skipped: grid.len() - cells.len(),
    })
}
