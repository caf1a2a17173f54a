//! Fitting orchestration.
//!
//! Responsibilities:
//!
//! - piecewise two-regime fit at a chosen switch day
//! - rate-constant grid generation
//! - parallel grid-search sweep over `(k1, k2)` (independent integrations)

pub mod grid;
pub mod piecewise;
pub mod sweep;

pub use grid::*;
pub use piecewise::*;
pub use sweep::*;

/// Mean squared error between two equally long sample arrays.
///
/// Both arrays carry infected *counts*; comparing counts against day indices
/// (or any other axis) is a caller bug, so the length mismatch is an error
/// rather than a truncation.
pub fn mean_squared_error(a: &[f64], b: &[f64]) -> Result<f64, crate::error::AppError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(crate::error::AppError::new(
            2,
            format!("MSE requires equal, non-empty arrays (got {} and {}).", a.len(), b.len()),
        ));
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok(sum / a.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_of_identical_arrays_is_zero() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(mean_squared_error(&v, &v).unwrap(), 0.0);
    }

    #[test]
    fn mse_matches_hand_computation() {
        let a = [1.0, 2.0];
        let b = [3.0, 6.0];
        // ((2)^2 + (4)^2) / 2 = 10
        assert_eq!(mean_squared_error(&a, &b).unwrap(), 10.0);
    }

    #[test]
    fn mse_rejects_mismatched_lengths() {
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(mean_squared_error(&[], &[]).is_err());
    }
}
