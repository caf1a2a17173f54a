//! Dated annotation file: `date, event` pairs overlaid on plots.
//!
//! The file is a small local CSV such as:
//!
//! ```text
//! date, event
//! 2020-03-25, stay-home order
//! 2020-04-15, peak hospital load
//! ```
//!
//! Annotations never influence the fit; they only mark days on plots and in
//! the run summary.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use crate::data::cases::ObservedSeries;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Annotation {
    pub date: NaiveDate,
    pub event: String,
}

/// An annotation matched to a day index of an observed series.
#[derive(Debug, Clone)]
pub struct DayAnnotation {
    pub day: usize,
    pub event: String,
}

/// Load `date, event` pairs from a local CSV file.
pub fn load_annotations(path: &Path) -> Result<Vec<Annotation>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open annotations '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut out = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::new(2, format!("Invalid annotations row: {e}")))?;
        let Some(raw_date) = record.get(0) else {
            continue;
        };
        if raw_date.is_empty() {
            continue;
        }
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| AppError::new(2, format!("Invalid annotation date '{raw_date}': {e}")))?;
        let event = record.get(1).unwrap_or("").to_string();
        out.push(Annotation { date, event });
    }
    Ok(out)
}

/// Match annotations to the day indices of an observed series.
///
/// Annotations dated outside the series are dropped; they have no day to mark.
pub fn attach_to_series(annotations: &[Annotation], series: &ObservedSeries) -> Vec<DayAnnotation> {
    annotations
        .iter()
        .filter_map(|a| {
            series.day_of(a.date).map(|day| DayAnnotation {
                day,
                event: a.event.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cases::parse_series;
    use std::io::Write;

    const CASES: &str = "\
date,state,fips,cases,deaths
2020-03-13,Idaho,16,2,0
2020-03-14,Idaho,16,5,0
2020-03-15,Idaho,16,8,0
";

    #[test]
    fn loads_and_attaches_annotations() {
        let tmp = tempfile_path("sirfit_annotations_test.csv");
        {
            let mut f = File::create(&tmp).unwrap();
            writeln!(f, "date, event").unwrap();
            writeln!(f, "2020-03-14, school closure").unwrap();
            writeln!(f, "2020-06-01, outside the series").unwrap();
        }

        let annotations = load_annotations(&tmp).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].event, "school closure");

        let series = parse_series(CASES.as_bytes(), "Idaho").unwrap();
        let attached = attach_to_series(&annotations, &series);
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].day, 1);

        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn bad_date_is_an_input_error() {
        let tmp = tempfile_path("sirfit_annotations_bad.csv");
        {
            let mut f = File::create(&tmp).unwrap();
            writeln!(f, "date, event").unwrap();
            writeln!(f, "14-03-2020, wrong format").unwrap();
        }
        let err = load_annotations(&tmp).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let _ = std::fs::remove_file(&tmp);
    }

    fn tempfile_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(name)
    }
}
