//! Rate-constant grid generation.
//!
//! The sweep searches `(k1, k2)` over a deterministic rectangular grid.
//!
//! Why grid search?
//! - It avoids local minima issues common in nonlinear optimization.
//! - It is deterministic given the same inputs/flags.
//! - Each cell is one independent integration, so the grid parallelizes
//!   trivially.

use crate::domain::{RateParams, SweepConfig};
use crate::error::AppError;

/// Generate `steps` linearly spaced points between `min` and `max` (inclusive).
///
/// Rates must stay strictly positive; a grid touching zero would integrate
/// degenerate dynamics.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid rate range: min={min}, max={max} (must be finite, >0, and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Rate grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

/// Cartesian `(k1, k2)` grid, row-major in `k1` then `k2`.
pub fn rate_grid(config: &SweepConfig) -> Result<Vec<RateParams>, AppError> {
    let k1s = lin_space(config.k1_min, config.k1_max, config.k1_steps)?;
    let k2s = lin_space(config.k2_min, config.k2_max, config.k2_steps)?;

    let mut out = Vec::with_capacity(k1s.len() * k2s.len());
    for &k1 in &k1s {
        for &k2 in &k2s {
            out.push(RateParams::new(k1, k2));
        }
    }
    Ok(out)
}
