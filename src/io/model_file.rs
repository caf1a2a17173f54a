//! Read/write model JSON files.
//!
//! Model JSON is the "portable" representation of a completed two-regime fit:
//! - rate constants, windows, and quality for both regimes
//! - run metadata (state, population, switch day)
//! - a precomputed fitted infected grid for quick plotting without re-solving
//!
//! The schema is defined by `domain::ModelFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveGrid, FitConfig, ModelFile};
use crate::error::AppError;
use crate::fit::PiecewiseOutcome;

/// Write a model JSON file for a completed fit.
pub fn write_model_json(path: &Path, outcome: &PiecewiseOutcome, config: &FitConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;

    let model = ModelFile {
        tool: "sirfit".to_string(),
        state: config.state.clone(),
        population: config.population,
        switch_day: config.switch_day,
        regimes: vec![outcome.first.clone(), outcome.second.clone()],
        grid: CurveGrid {
            day: (0..outcome.fitted.len()).map(|d| d as f64).collect(),
            infected: outcome.fitted.clone(),
        },
    };

    serde_json::to_writer_pretty(file, &model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;

    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompartmentState, DayWindow, FitQuality, RateParams, RegimeFit};

    fn regime(k1: f64, k2: f64, window: DayWindow) -> RegimeFit {
        RegimeFit {
            params: RateParams::new(k1, k2),
            window,
            initial: CompartmentState::new(1_787_063.0, 2.0, 0.0),
            quality: FitQuality { mse: 12.5, rmse: 12.5_f64.sqrt(), n: window.len() },
            peak_infected: 52_000.0,
            peak_day: 34,
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
    fn model_json_round_trips() {
        let outcome = PiecewiseOutcome {
            first: regime(1.3, 1.0, DayWindow { start: 0, end: 21 }),
            second: regime(1.06, 1.025, DayWindow { start: 21, end: 40 }),
            fitted: (0..40).map(|d| d as f64 * 3.0).collect(),
            overall: FitQuality { mse: 10.0, rmse: 10.0_f64.sqrt(), n: 40 },
        };
        let path = std::env::temp_dir().join("sirfit-model-test.json");
        write_model_json(&path, &outcome, &config()).unwrap();
        let model = read_model_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.tool, "sirfit");
        assert_eq!(model.state, "Idaho");
        assert_eq!(model.switch_day, 21);
        assert_eq!(model.regimes.len(), 2);
        assert_eq!(model.grid.day.len(), 40);
        assert!((model.grid.infected[10] - 30.0).abs() < 1e-12);
        assert!((model.regimes[0].params.k1 - 1.3).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = read_model_json(Path::new("/nonexistent/sirfit-model.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
