//! Residual computation and formatted terminal summaries.

use crate::data::{DayAnnotation, ObservedSeries};
use crate::domain::{DayResidual, FitConfig, RegimeFit, SweepConfig};
use crate::error::AppError;
use crate::fit::{PiecewiseOutcome, SweepOutcome};
use crate::models::Trajectory;

/// Per-day observed-vs-fitted residuals over the observed grid.
pub fn compute_day_residuals(
    observed: &ObservedSeries,
    fitted: &[f64],
) -> Result<Vec<DayResidual>, AppError> {
    if fitted.len() != observed.len() {
        return Err(AppError::new(
            2,
            format!(
                "Fitted curve has {} days but the series has {}.",
                fitted.len(),
                observed.len()
            ),
        ));
    }
    let mut out = Vec::with_capacity(fitted.len());
    for (day, &y_fit) in fitted.iter().enumerate() {
        if !y_fit.is_finite() {
            return Err(AppError::new(4, "Non-finite fitted value during residual computation."));
        }
        let observed_count = observed.cases[day];
        out.push(DayResidual {
            day,
            date: observed.dates[day],
            observed: observed_count,
            fitted: y_fit,
            residual: observed_count - y_fit,
        });
    }
    Ok(out)
}

/// Format the full fit summary (dataset stats + both regimes + quality).
pub fn format_fit_summary(
    observed: &ObservedSeries,
    outcome: &PiecewiseOutcome,
    annotations: &[DayAnnotation],
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== sirfit - piecewise SIR fit ===\n");
    out.push_str(&format!("State: {}\n", observed.state));
    out.push_str(&format!("Population: {:.0}\n", config.population));
    out.push_str(&format!(
        "Observed: {} days ({} .. {}), {} rows skipped\n",
        observed.len(),
        observed.dates[0],
        observed.dates[observed.len() - 1],
        observed.rows_skipped,
    ));
    out.push_str(&format!("Switch day: {}\n", config.switch_day));

    out.push_str("\nRegimes:\n");
    out.push_str(&format_regime("before switch", &outcome.first));
    out.push_str(&format_regime("after switch", &outcome.second));

    out.push_str(&format!(
        "\nOverall: MSE={:.3} RMSE={:.3} over {} days\n",
        outcome.overall.mse, outcome.overall.rmse, outcome.overall.n
    ));

    if !annotations.is_empty() {
        out.push_str("\nAnnotations:\n");
        for a in annotations {
            out.push_str(&format!("  day {:>3}  {}\n", a.day, a.event));
        }
    }

    out
}

fn format_regime(label: &str, regime: &RegimeFit) -> String {
    format!(
        "  {label:<13} k1={:.3} k2={:.3} R0={:.3} | days [{}, {}) | MSE={:.3} RMSE={:.3} | peak {:.0} infected on regime day {}\n",
        regime.params.k1,
        regime.params.k2,
        regime.params.basic_reproduction_number(),
        regime.window.start,
        regime.window.end,
        regime.quality.mse,
        regime.quality.rmse,
        regime.peak_infected,
        regime.peak_day,
    )
}

/// Format the sweep result.
pub fn format_sweep_summary(outcome: &SweepOutcome, sweep: &SweepConfig) -> String {
    let mut out = String::new();
    out.push_str("=== sirfit - (k1, k2) grid sweep ===\n");
    out.push_str(&format!(
        "Grid: k1 in [{:.3}, {:.3}] x{} | k2 in [{:.3}, {:.3}] x{}\n",
        sweep.k1_min, sweep.k1_max, sweep.k1_steps, sweep.k2_min, sweep.k2_max, sweep.k2_steps,
    ));
    out.push_str(&format!(
        "Cells: {} evaluated, {} skipped\n",
        outcome.evaluated, outcome.skipped
    ));
    out.push_str(&format!(
        "Best: k1={:.4} k2={:.4} MSE={:.3}\n",
        outcome.best.params.k1, outcome.best.params.k2, outcome.best.mse
    ));
    out
}

/// Format a single-simulation summary.
pub fn format_simulation_summary(traj: &Trajectory, config: &FitConfig) -> String {
    let (peak_day, peak_infected) = traj.peak_infected();
    let first = traj.states()[0];
    let last = traj.states()[traj.len() - 1];

    let mut out = String::new();
    out.push_str("=== sirfit - SIR simulation ===\n");
    out.push_str(&format!(
        "k1={:.3} k2={:.3} R0={:.3} | N={:.0} | horizon {} days\n",
        config.initial_regime.k1,
        config.initial_regime.k2,
        config.initial_regime.basic_reproduction_number(),
        config.population,
        config.horizon_days,
    ));
    out.push_str(&format!(
        "Day 0:   S={:.0} I={:.0} R={:.0}\n",
        first.s, first.i, first.r
    ));
    out.push_str(&format!(
        "Peak:    {:.0} infected on day {peak_day}\n",
        peak_infected
    ));
    out.push_str(&format!(
        "Day {}: S={:.0} I={:.0} R={:.0}\n",
        traj.len() - 1,
        last.s,
        last.i,
        last.r
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(n: usize) -> ObservedSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 13).unwrap();
        ObservedSeries {
            state: "Idaho".to_string(),
            dates: (0..n).map(|d| start + chrono::Days::new(d as u64)).collect(),
            cases: (0..n).map(|d| d as f64 * 3.0).collect(),
            deaths: vec![0.0; n],
            rows_skipped: 0,
        }
    }

    #[test]
    fn residuals_align_with_observed_days() {
        let observed = series(5);
        let fitted = vec![0.5, 2.0, 7.0, 9.5, 11.0];
        let residuals = compute_day_residuals(&observed, &fitted).unwrap();
        assert_eq!(residuals.len(), 5);
        assert_eq!(residuals[2].day, 2);
        assert!((residuals[2].residual - (6.0 - 7.0)).abs() < 1e-12);
    }

    #[test]
    fn residuals_reject_length_mismatch() {
        let observed = series(5);
        assert!(compute_day_residuals(&observed, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn residuals_reject_non_finite_fits() {
        let observed = series(2);
        let err = compute_day_residuals(&observed, &[1.0, f64::NAN]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
