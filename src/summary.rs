//! Column-level descriptive summaries.
//!
//! [`describe`] reports, for every column, its type and missingness plus a
//! type-specific block computed over the present values only. Missing cells
//! are expected input here, not errors.
//!
//! # Example
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::summary::describe;
//!
//! let df = DataFrame::from_columns(vec![
//!     ("margin", Column::reals(vec![Some(2.0), None, Some(4.0), Some(9.0)])),
//!     ("party", Column::texts(vec![Some("dem"), Some("rep"), Some("rep"), None])),
//! ])
//! .unwrap();
//!
//! let summaries = describe(&df);
//! assert_eq!(summaries[0].missing_count, 1);
//! assert_eq!(summaries[0].numeric.as_ref().unwrap().median, 4.0);
//! assert_eq!(summaries[1].text.as_ref().unwrap().mode.as_deref(), Some("rep"));
//! ```

use std::collections::HashMap;

use serde::Serialize;
use u_numflow::stats;

use crate::dataframe::{Column, DataFrame};
use crate::value::DataType;

// ── Summaries ─────────────────────────────────────────────────────────

/// Statistics for an integer or real column.
///
/// Every field is NaN when the column has no present values; `std_dev` is
/// also NaN for a single value. A non-finite value makes `mean` and
/// `std_dev` NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// Statistics for a boolean column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanSummary {
    pub true_count: usize,
    /// Proportion of `true` among present values (NaN if none).
    pub true_ratio: f64,
}

/// Statistics for a text column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub distinct_count: usize,
    /// Most frequent value; ties go to the value seen first.
    pub mode: Option<String>,
    /// Occurrences of `mode`.
    pub mode_count: usize,
}

/// Summary of a single column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: DataType,
    pub row_count: usize,
    pub missing_count: usize,
    /// Share of missing cells in `0.0..=1.0`; NaN for an empty column.
    pub proportion_missing: f64,
    pub numeric: Option<NumericSummary>,
    pub boolean: Option<BooleanSummary>,
    pub text: Option<TextSummary>,
}

// ── Describe ──────────────────────────────────────────────────────────

/// Summarizes every column of `df`, in column order.
pub fn describe(df: &DataFrame) -> Vec<ColumnSummary> {
    let summaries: Vec<ColumnSummary> = df
        .iter()
        .map(|(name, column)| describe_column(name, column))
        .collect();
    log::debug!("describe: {} columns x {} rows", summaries.len(), df.row_count());
    summaries
}

/// Summarizes a single column.
pub fn describe_column(name: &str, column: &Column) -> ColumnSummary {
    let row_count = column.len();
    let missing_count = column.missing_count();
    let proportion_missing = if row_count > 0 {
        missing_count as f64 / row_count as f64
    } else {
        f64::NAN
    };

    let mut summary = ColumnSummary {
        name: name.to_string(),
        data_type: column.data_type(),
        row_count,
        missing_count,
        proportion_missing,
        numeric: None,
        boolean: None,
        text: None,
    };
    match column {
        Column::Integer { .. } | Column::Real { .. } => {
            let present: Vec<f64> = (0..row_count).filter_map(|i| column.numeric_at(i)).collect();
            summary.numeric = Some(numeric_summary(&present));
        }
        Column::Boolean { values, validity } => {
            let present = validity.valid_count();
            let true_count = validity.valid_indices().filter(|&i| values[i]).count();
            summary.boolean = Some(BooleanSummary {
                true_count,
                true_ratio: if present > 0 {
                    true_count as f64 / present as f64
                } else {
                    f64::NAN
                },
            });
        }
        Column::Text { values, validity } => {
            summary.text = Some(text_summary(validity.valid_indices().map(|i| values[i].as_str())));
        }
        Column::Date { .. } | Column::Null { .. } => {}
    }
    summary
}

fn numeric_summary(values: &[f64]) -> NumericSummary {
    NumericSummary {
        mean: stats::mean(values).unwrap_or(f64::NAN),
        std_dev: stats::std_dev(values).unwrap_or(f64::NAN),
        min: stats::min(values).unwrap_or(f64::NAN),
        median: stats::median(values).unwrap_or(f64::NAN),
        max: stats::max(values).unwrap_or(f64::NAN),
    }
}

fn text_summary<'a>(values: impl Iterator<Item = &'a str>) -> TextSummary {
    // (count, first position)
    let mut freq: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, v) in values.enumerate() {
        freq.entry(v).or_insert((0, pos)).0 += 1;
    }
    let mode = freq
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(v, (count, _))| (v.to_string(), *count));
    TextSummary {
        distinct_count: freq.len(),
        mode_count: mode.as_ref().map_or(0, |m| m.1),
        mode: mode.map(|m| m.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn polls() -> DataFrame {
        DataFrame::from_columns(vec![
            ("pct", Column::integers(vec![Some(3), Some(1), None, Some(2), Some(10)])),
            ("lead", Column::booleans(vec![Some(true), Some(false), Some(true), None, None])),
            ("pollster", Column::texts(vec![Some("b"), Some("a"), Some("a"), Some("b"), None])),
            ("date", Column::dates(vec![NaiveDate::from_ymd_opt(2016, 11, 1); 5])),
        ])
        .unwrap()
    }

    #[test]
    fn numeric_statistics_skip_missing() {
        let s = &describe(&polls())[0];
        assert_eq!(s.data_type, DataType::Integer);
        assert_eq!(s.row_count, 5);
        assert_eq!(s.missing_count, 1);
        assert!((s.proportion_missing - 0.2).abs() < 1e-12);
        let n = s.numeric.as_ref().unwrap();
        assert_eq!(n.mean, 4.0);
        assert_eq!(n.min, 1.0);
        assert_eq!(n.median, 2.5);
        assert_eq!(n.max, 10.0);
        assert!((n.std_dev - (50.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(s.boolean.is_none() && s.text.is_none());
    }

    #[test]
    fn boolean_and_text_statistics() {
        let summaries = describe(&polls());
        let b = summaries[1].boolean.as_ref().unwrap();
        assert_eq!(b.true_count, 2);
        assert!((b.true_ratio - 2.0 / 3.0).abs() < 1e-12);

        // "b" and "a" both appear twice; "b" was seen first
        let t = summaries[2].text.as_ref().unwrap();
        assert_eq!(t.distinct_count, 2);
        assert_eq!(t.mode.as_deref(), Some("b"));
        assert_eq!(t.mode_count, 2);

        let d = &summaries[3];
        assert_eq!(d.missing_count, 0);
        assert!(d.numeric.is_none() && d.boolean.is_none() && d.text.is_none());
    }

    #[test]
    fn all_missing_column() {
        let s = describe_column("x", &Column::reals(vec![None, None]));
        assert_eq!(s.proportion_missing, 1.0);
        let n = s.numeric.unwrap();
        assert!(n.mean.is_nan() && n.median.is_nan() && n.min.is_nan());

        let empty = describe_column("x", &Column::texts::<&str>(vec![]));
        assert!(empty.proportion_missing.is_nan());
        assert_eq!(empty.text.unwrap().mode, None);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(&describe(&polls())[2]).unwrap();
        assert_eq!(json["name"], "pollster");
        assert_eq!(json["data_type"], "Text");
        assert_eq!(json["text"]["mode"], "b");
    }
}
