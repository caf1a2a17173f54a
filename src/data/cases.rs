//! Case-count ingest from the NYT state-level COVID CSV.
//!
//! The source is a comma-separated table with columns
//! `date,state,fips,cases,deaths`, fetched over HTTPS (or read from a local
//! file for offline/repeatable runs). This module is responsible for turning
//! it into a clean per-state daily series indexed as days since the state's
//! first reported infection.
//!
//! Design goals (same as the rest of the ingest code):
//! - row-level validation: skip bad rows, but count what happened
//! - deterministic behavior: rows are sorted by date before indexing
//! - separation of concerns: no modeling logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Deserialize;

use crate::error::AppError;

/// Default remote source for `date,state,fips,cases,deaths` rows.
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-states.csv";

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    state: String,
    #[serde(default)]
    #[allow(dead_code)]
    fips: String,
    cases: f64,
    deaths: f64,
}

/// One state's observed series, indexed as days since first reported case.
#[derive(Debug, Clone)]
pub struct ObservedSeries {
    pub state: String,
    pub dates: Vec<NaiveDate>,
    pub cases: Vec<f64>,
    pub deaths: Vec<f64>,
    /// Rows skipped during ingest (unparseable date or negative counts).
    pub rows_skipped: usize,
}

impl ObservedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Day index for a calendar date, if the series covers it.
    pub fn day_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.iter().position(|&d| d == date)
    }

    /// Whether the given day index falls on a weekend (plot glyph choice).
    pub fn is_weekend(&self, day: usize) -> bool {
        matches!(
            self.dates.get(day).map(|d| d.weekday()),
            Some(Weekday::Sat) | Some(Weekday::Sun)
        )
    }
}

/// Fetch the remote CSV and extract one state's series.
pub fn fetch_series(url: &str, state: &str) -> Result<ObservedSeries, AppError> {
    let resp = reqwest::blocking::get(url)
        .map_err(|e| AppError::new(3, format!("Case-data request failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(AppError::new(
            3,
            format!("Case-data request failed with status {}.", resp.status()),
        ));
    }
    let body = resp
        .text()
        .map_err(|e| AppError::new(3, format!("Failed to read case-data response: {e}")))?;
    parse_series(body.as_bytes(), state)
}

/// Read a previously downloaded copy of the CSV.
pub fn load_series_from_file(path: &Path, state: &str) -> Result<ObservedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open case CSV '{}': {e}", path.display())))?;
    parse_series(file, state)
}

/// Parse `date,state,fips,cases,deaths` rows and keep the matching state.
pub fn parse_series<R: Read>(reader: R, state: &str) -> Result<ObservedSeries, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<(NaiveDate, f64, f64)> = Vec::new();
    let mut rows_skipped = 0usize;

    for record in csv_reader.deserialize::<RawRow>() {
        let row = match record {
            Ok(r) => r,
            Err(_) => {
                rows_skipped += 1;
                continue;
            }
        };
        if row.state != state {
            continue;
        }
        let date = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                rows_skipped += 1;
                continue;
            }
        };
        if !(row.cases.is_finite() && row.cases >= 0.0 && row.deaths.is_finite() && row.deaths >= 0.0)
        {
            rows_skipped += 1;
            continue;
        }
        rows.push((date, row.cases, row.deaths));
    }

    if rows.is_empty() {
        return Err(AppError::new(
            3,
            format!("No usable case rows found for state '{state}'."),
        ));
    }

    rows.sort_by_key(|(d, _, _)| *d);
    rows.dedup_by_key(|(d, _, _)| *d);

    let mut series = ObservedSeries {
        state: state.to_string(),
        dates: Vec::with_capacity(rows.len()),
        cases: Vec::with_capacity(rows.len()),
        deaths: Vec::with_capacity(rows.len()),
        rows_skipped,
    };
    for (date, cases, deaths) in rows {
        series.dates.push(date);
        series.cases.push(cases);
        series.deaths.push(deaths);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,state,fips,cases,deaths
2020-03-13,Idaho,16,2,0
2020-03-14,Idaho,16,5,0
2020-03-14,Washington,53,572,37
2020-03-15,Idaho,16,8,0
bogus-date,Idaho,16,9,0
2020-03-16,Idaho,16,-3,0
2020-03-17,Idaho,16,20,1
";

    #[test]
    fn parses_and_filters_one_state() {
        let series = parse_series(SAMPLE.as_bytes(), "Idaho").unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.cases, vec![2.0, 5.0, 8.0, 20.0]);
        assert_eq!(series.deaths[3], 1.0);
        assert_eq!(series.rows_skipped, 2);
    }

    #[test]
    fn day_indexing_follows_sorted_dates() {
        let series = parse_series(SAMPLE.as_bytes(), "Idaho").unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        assert_eq!(series.day_of(d), Some(2));
        assert_eq!(series.day_of(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()), None);
    }

    #[test]
    fn weekend_flag_uses_the_calendar() {
        let series = parse_series(SAMPLE.as_bytes(), "Idaho").unwrap();
        // 2020-03-13 was a Friday, 03-14 a Saturday, 03-15 a Sunday.
        assert!(!series.is_weekend(0));
        assert!(series.is_weekend(1));
        assert!(series.is_weekend(2));
        assert!(!series.is_weekend(3));
    }

    #[test]
    fn missing_state_is_a_data_error() {
        let err = parse_series(SAMPLE.as_bytes(), "Atlantis").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
