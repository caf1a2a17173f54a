//! Shared "fit pipeline" logic used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! case-data load -> annotation attach -> piecewise fit -> residuals
//!
//! The CLI can then focus on presentation (printing and exports).

use crate::data::{
    DayAnnotation, ObservedSeries, attach_to_series, fetch_series, load_annotations,
    load_series_from_file,
};
use crate::domain::{DayResidual, FitConfig};
use crate::error::AppError;
use crate::fit::{PiecewiseOutcome, fit_piecewise};

/// All computed outputs of a single `sirfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observed: ObservedSeries,
    pub annotations: Vec<DayAnnotation>,
    pub outcome: PiecewiseOutcome,
    pub residuals: Vec<DayResidual>,
}

/// Load the observed series from the configured source.
pub fn load_observed(config: &FitConfig) -> Result<ObservedSeries, AppError> {
    match &config.data_file {
        Some(path) => load_series_from_file(path, &config.state),
        None => fetch_series(&config.data_url, &config.state),
    }
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let observed = load_observed(config)?;
    run_fit_with_observed(config, observed)
}

/// Execute the fitting pipeline with pre-loaded observations.
///
/// This is useful when refitting after a sweep, where re-downloading the
/// series would be wasted work.
pub fn run_fit_with_observed(
    config: &FitConfig,
    observed: ObservedSeries,
) -> Result<RunOutput, AppError> {
    let annotations = match &config.annotations {
        Some(path) => attach_to_series(&load_annotations(path)?, &observed),
        None => Vec::new(),
    };

    let outcome = fit_piecewise(&observed, config)?;
    let residuals = crate::report::compute_day_residuals(&observed, &outcome.fitted)?;

    Ok(RunOutput {
        observed,
        annotations,
        outcome,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RateParams;
    use chrono::NaiveDate;

    fn series(n: usize) -> ObservedSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 13).unwrap();
        ObservedSeries {
            state: "Idaho".to_string(),
            dates: (0..n).map(|d| start + chrono::Days::new(d as u64)).collect(),
            cases: (0..n).map(|d| 2.0 * (1.2_f64).powi(d as i32)).collect(),
            deaths: vec![0.0; n],
            rows_skipped: 0,
        }
    }

    fn config() -> FitConfig {
        FitConfig {
            state: "Idaho".to_string(),
            population: 1_787_065.0,
            data_url: String::new(),
            data_file: None,
            annotations: None,
            switch_day: 21,
            initial_regime: RateParams::new(1.3, 1.0),
            post_regime: RateParams::new(1.06, 1.025),
            seed_infected: 2.0,
            horizon_days: 365,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export_results: None,
            export_model: None,
        }
    }

    #[test]
    fn pipeline_produces_residuals_for_every_day() {
        let run = run_fit_with_observed(&config(), series(40)).unwrap();
        assert_eq!(run.residuals.len(), 40);
        assert_eq!(run.outcome.fitted.len(), 40);
        assert!(run.annotations.is_empty());
    }
}
