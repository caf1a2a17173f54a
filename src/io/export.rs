//! Export per-day results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::DayResidual;
use crate::error::AppError;

/// Write per-day observed/fitted/residual rows to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[DayResidual]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(file, "day,date,observed,fitted,residual")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        writeln!(
            file,
            "{},{},{:.4},{:.4},{:.4}",
            r.day, r.date, r.observed, r.fitted, r.residual,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
