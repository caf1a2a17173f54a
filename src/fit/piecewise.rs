//! Piecewise two-regime SIR fit.
//!
//! The outbreak is modeled as two SIR regimes joined at a switch day (a
//! real-world intervention such as a stay-home order):
//!
//! - regime 1 runs `(k1, k2)` from day 0, seeded with the configured initial
//!   infected count;
//! - regime 2 runs `(k1', k2')` re-seeded at the switch day with the observed
//!   case count there (`I0 = cases[switch]`, `S0 = N - I0`, `R0 = 0`).
//!
//! The fitted infected curve is the concatenation of the two regimes at the
//! switch day, and each regime is scored by MSE/RMSE of modeled infected
//! counts against observed case counts over its own window.

use crate::data::ObservedSeries;
use crate::domain::{CompartmentState, DayWindow, FitConfig, FitQuality, RegimeFit};
use crate::error::AppError;
use crate::fit::mean_squared_error;
use crate::models::{Trajectory, integrate};

/// Everything computed by one piecewise fit.
#[derive(Debug, Clone)]
pub struct PiecewiseOutcome {
    pub first: RegimeFit,
    pub second: RegimeFit,
    /// Fitted infected counts aligned to the observed day grid.
    pub fitted: Vec<f64>,
    /// Combined quality over all observed days.
    pub overall: FitQuality,
}

/// Run the two-regime fit against an observed series.
pub fn fit_piecewise(observed: &ObservedSeries, config: &FitConfig) -> Result<PiecewiseOutcome, AppError> {
    let n_obs = observed.len();
    if n_obs < 2 {
        return Err(AppError::new(3, "Need at least two observed days to fit."));
    }
    if config.switch_day == 0 || config.switch_day >= n_obs {
        return Err(AppError::new(
            2,
            format!(
                "switch-day must lie inside the observed series (got {}, series has {n_obs} days).",
                config.switch_day
            ),
        ));
    }
    if config.horizon_days < n_obs {
        return Err(AppError::new(
            2,
            format!(
                "horizon ({}) must cover the observed series ({n_obs} days).",
                config.horizon_days
            ),
        ));
    }

    let switch = config.switch_day;

    // Regime 1: from day 0 with the configured seed.
    let initial_1 = CompartmentState::new(
        config.population - config.seed_infected,
        config.seed_infected,
        0.0,
    );
    let traj_1 = integrate(config.initial_regime, initial_1, config.horizon_days)?;

    // Regime 2: re-seeded from the observed count at the switch day.
    let i0 = observed.cases[switch];
    let initial_2 = CompartmentState::new(config.population - i0, i0, 0.0);
    let traj_2 = integrate(config.post_regime, initial_2, config.horizon_days)?;

    // Concatenated fitted curve over the observed day grid. Regime 2's own
    // time axis starts at the switch day.
    let infected_1 = traj_1.infected();
    let infected_2 = traj_2.infected();
    let mut fitted = Vec::with_capacity(n_obs);
    for day in 0..n_obs {
        if day < switch {
            fitted.push(infected_1[day]);
        } else {
            fitted.push(infected_2[day - switch]);
        }
    }

    // Modeled infected counts vs observed case counts, window by window.
    let window_1 = DayWindow { start: 0, end: switch };
    let window_2 = DayWindow { start: switch, end: n_obs };
    let quality_1 = window_quality(&fitted[..switch], &observed.cases[..switch])?;
    let quality_2 = window_quality(&fitted[switch..], &observed.cases[switch..])?;
    let overall = window_quality(&fitted, &observed.cases)?;

    Ok(PiecewiseOutcome {
        first: regime_fit(&traj_1, config.initial_regime, initial_1, window_1, quality_1),
        second: regime_fit(&traj_2, config.post_regime, initial_2, window_2, quality_2),
        fitted,
        overall,
    })
}

fn window_quality(fitted: &[f64], observed: &[f64]) -> Result<FitQuality, AppError> {
    let mse = mean_squared_error(fitted, observed)?;
    Ok(FitQuality {
        mse,
        rmse: mse.sqrt(),
        n: fitted.len(),
    })
}

fn regime_fit(
    traj: &Trajectory,
    params: crate::domain::RateParams,
    initial: CompartmentState,
    window: DayWindow,
    quality: FitQuality,
) -> RegimeFit {
    let (peak_day, peak_infected) = traj.peak_infected();
    RegimeFit {
        params,
        window,
        initial,
        quality,
        peak_infected,
        peak_day,
    }
}
