//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed cases: `o` on weekdays, `.` on weekends
//! - observed deaths: `x`
//! - fitted infected curve: `-` line
//! - annotation days: `|` column with a numbered footnote

use crate::data::{DayAnnotation, ObservedSeries};
use crate::domain::ModelFile;

/// Render observed cases and the fitted curve over the observed day grid.
pub fn render_fit_plot(
    observed: &ObservedSeries,
    fitted: &[f64],
    annotations: &[DayAnnotation],
    width: usize,
    height: usize,
) -> String {
    let n = observed.len();
    let curve: Vec<(f64, f64)> = fitted.iter().enumerate().map(|(d, &y)| (d as f64, y)).collect();
    let mut points: Vec<(f64, f64, char)> = (0..n)
        .map(|d| {
            let glyph = if observed.is_weekend(d) { '.' } else { 'o' };
            (d as f64, observed.cases[d], glyph)
        })
        .collect();
    // Deaths drawn after cases so they stay visible where the series overlap.
    points.extend((0..n).map(|d| (d as f64, observed.deaths[d], 'x')));
    let marks: Vec<usize> = annotations.iter().map(|a| a.day).collect();

    let mut out = render_grid(&points, &curve, &marks, n.saturating_sub(1) as f64, width, height);

    out.push_str(
        "legend: o cases (weekday)  . cases (weekend)  x deaths  - fitted infected\n",
    );
    for (i, a) in annotations.iter().enumerate() {
        out.push_str(&format!("  [{}] day {} - {}\n", i + 1, a.day, a.event));
    }
    out
}

/// Render the fitted curve of a saved model file (no observed overlay).
pub fn render_model_plot(model: &ModelFile, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = model
        .grid
        .day
        .iter()
        .zip(model.grid.infected.iter())
        .map(|(&d, &y)| (d, y))
        .collect();
    let x_max = curve.last().map(|&(d, _)| d).unwrap_or(1.0);
    let mut out = render_grid(&[], &curve, &[], x_max, width, height);
    out.push_str(&format!(
        "legend: - fitted infected ({}, switch day {})\n",
        model.state, model.switch_day
    ));
    out
}

/// Render a bare simulated infected curve (no observations, no annotations).
pub fn render_curve_plot(infected: &[f64], width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = infected.iter().enumerate().map(|(d, &y)| (d as f64, y)).collect();
    let x_max = infected.len().saturating_sub(1) as f64;
    let mut out = render_grid(&[], &curve, &[], x_max, width, height);
    out.push_str("legend: - simulated infected\n");
    out
}

fn render_grid(
    points: &[(f64, f64, char)],
    curve: &[(f64, f64)],
    mark_days: &[usize],
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let x_max = if x_max > 0.0 { x_max } else { 1.0 };

    let y_max = curve
        .iter()
        .map(|&(_, y)| y)
        .chain(points.iter().map(|&(_, y, _)| y))
        .fold(0.0_f64, f64::max)
        .max(1.0);
    // 5% headroom so the peak does not sit on the frame.
    let y_max = y_max * 1.05;

    let mut grid = vec![vec![' '; width]; height];

    let col_of = |x: f64| -> usize {
        (((x / x_max) * (width as f64 - 1.0)).round() as isize).clamp(0, width as isize - 1) as usize
    };
    let row_of = |y: f64| -> usize {
        let r = ((1.0 - y / y_max) * (height as f64 - 1.0)).round() as isize;
        r.clamp(0, height as isize - 1) as usize
    };

    // Annotation columns first, then the curve, then points on top.
    for &day in mark_days {
        let col = col_of(day as f64);
        for row in grid.iter_mut() {
            row[col] = '|';
        }
    }
    for &(x, y) in curve {
        if y.is_finite() {
            grid[row_of(y)][col_of(x)] = '-';
        }
    }
    for &(x, y, glyph) in points {
        if y.is_finite() {
            grid[row_of(y)][col_of(x)] = glyph;
        }
    }

    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let label = if i == 0 {
            format!("{y_max:>10.0} ")
        } else if i == height - 1 {
            format!("{:>10.0} ", 0.0)
        } else {
            " ".repeat(11)
        };
        out.push_str(&label);
        out.push_str(&row.iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&" ".repeat(11));
    out.push_str(&format!("day 0{:>width$}\n", format!("day {x_max:.0}"), width = width - 5));
    out
}
