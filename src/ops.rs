//! Row and group transforms: grouping/aggregation, sorting, de-duplication.
//!
//! Reducers do **not** skip missing values unless asked to: [`Reducer::Mean`]
//! over a group containing a missing value is missing, while
//! [`Reducer::MeanSkipMissing`] averages the present values. Proportions
//! computed downstream of an aggregation depend on this choice, so it is
//! always spelled out at the call site.
//!
//! # Example
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::ops::{group_aggregate, Aggregation, Reducer};
//! use u_tidy::value::{DataType, Value};
//!
//! let df = DataFrame::from_columns(vec![
//!     ("g", Column::texts(vec![Some("a"), Some("a"), Some("b")])),
//!     ("x", Column::reals(vec![Some(1.0), None, Some(3.0)])),
//! ])
//! .unwrap();
//!
//! let out = group_aggregate(
//!     &df,
//!     &["g"],
//!     &[
//!         Aggregation::new("mean_x", "x", Reducer::Mean),
//!         Aggregation::new("mean_x_present", "x", Reducer::MeanSkipMissing),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(out.value(0, "mean_x").unwrap(), Value::Missing(DataType::Real));
//! assert_eq!(out.value(0, "mean_x_present").unwrap(), Value::Real(1.0));
//! assert_eq!(out.value(1, "mean_x").unwrap(), Value::Real(3.0));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use u_numflow::stats;

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::expr::Expr;
use crate::value::{DataType, Value};

// ── Row-level wrappers ────────────────────────────────────────────────

/// Keeps rows where `predicate` is true; see [`DataFrame::filter`].
pub fn filter_rows(df: &DataFrame, predicate: &Expr) -> Result<DataFrame> {
    df.filter(predicate)
}

/// Adds or overwrites a column; see [`DataFrame::derive`].
pub fn derive_column(df: &DataFrame, name: &str, expression: &Expr) -> Result<DataFrame> {
    df.derive(name, expression)
}

// ── Grouping ──────────────────────────────────────────────────────────

/// One partition of a [`GroupedFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Key values, one per key column. Missing keys hold typed missing markers.
    pub key: Vec<Value>,
    /// Row indices of the source frame, in ascending order.
    pub rows: Vec<usize>,
}

/// A DataFrame partitioned by the distinct values of its key columns.
///
/// Groups appear in the order their key combination is first seen. Rows
/// whose key contains a missing value are grouped together like any other
/// value; they are never dropped.
#[derive(Debug, Clone)]
pub struct GroupedFrame<'a> {
    df: &'a DataFrame,
    keys: Vec<String>,
    groups: Vec<Group>,
}

/// Partitions `df` by the distinct combinations of `keys`.
///
/// With no keys, the whole frame forms a single group.
pub fn group_by<'a>(df: &'a DataFrame, keys: &[&str]) -> Result<GroupedFrame<'a>> {
    let key_columns: Vec<&Column> = keys.iter().map(|k| df.column(k)).collect::<Result<_>>()?;

    let groups = if keys.is_empty() {
        vec![Group {
            key: Vec::new(),
            rows: (0..df.row_count()).collect(),
        }]
    } else {
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for row in 0..df.row_count() {
            let key: Vec<Value> = key_columns.iter().map(|c| c.get(row)).collect();
            match index.get(&key) {
                Some(&g) => groups[g].rows.push(row),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(Group {
                        key,
                        rows: vec![row],
                    });
                }
            }
        }
        groups
    };

    log::debug!(
        "group_by {:?}: {} rows -> {} groups",
        keys,
        df.row_count(),
        groups.len()
    );
    Ok(GroupedFrame {
        df,
        keys: keys.iter().map(|k| k.to_string()).collect(),
        groups,
    })
}

impl GroupedFrame<'_> {
    /// Returns the number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the groups in first-seen order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Returns the key column names.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Reduces every group to one row: key columns followed by one column
    /// per aggregation, in the order given.
    pub fn aggregate(&self, aggregations: &[Aggregation]) -> Result<DataFrame> {
        // Resolve every input and output type before reducing anything.
        let mut plans = Vec::with_capacity(aggregations.len());
        for agg in aggregations {
            let column = self.df.column(&agg.column)?;
            let out_type = agg.reducer.output_type(&agg.column, column.data_type())?;
            plans.push((agg, column, out_type));
        }

        let mut out = self.key_frame()?;
        for (agg, column, out_type) in plans {
            let cells = self
                .groups
                .iter()
                .map(|g| agg.reducer.reduce(column, &g.rows, out_type))
                .collect();
            out.add_column(agg.output.clone(), Column::from_values(out_type, cells)?)?;
        }
        Ok(out)
    }

    /// One row per group holding only the key columns.
    pub(crate) fn key_frame(&self) -> Result<DataFrame> {
        let mut out = DataFrame::with_rows(self.groups.len());
        for (k, name) in self.keys.iter().enumerate() {
            let dtype = self.df.data_type(name)?;
            let cells = self.groups.iter().map(|g| g.key[k].clone()).collect();
            out.add_column(name.clone(), Column::from_values(dtype, cells)?)?;
        }
        Ok(out)
    }
}

// ── Aggregation ───────────────────────────────────────────────────────

/// Reduces a sequence of column values to one summary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    /// Arithmetic mean; missing if any value is missing.
    Mean,
    /// Arithmetic mean of the present values.
    MeanSkipMissing,
    /// Sum; missing if any value is missing.
    Sum,
    /// Sum of the present values (0 when none are present).
    SumSkipMissing,
    /// Sample standard deviation; missing if any value is missing.
    StdDev,
    /// Sample standard deviation of the present values.
    StdDevSkipMissing,
    /// Minimum; missing if any value is missing.
    Min,
    /// Maximum; missing if any value is missing.
    Max,
    /// Number of rows in the group, missing or not.
    Count,
    /// Number of missing values in the group.
    CountMissing,
}

impl Reducer {
    fn skips_missing(self) -> bool {
        matches!(
            self,
            Self::MeanSkipMissing | Self::SumSkipMissing | Self::StdDevSkipMissing
        )
    }

    /// Output type for an input column of type `input`.
    fn output_type(self, column: &str, input: DataType) -> Result<DataType> {
        let numeric = input.is_numeric() || input == DataType::Null;
        match self {
            Self::Count | Self::CountMissing => Ok(DataType::Integer),
            Self::Mean
            | Self::MeanSkipMissing
            | Self::StdDev
            | Self::StdDevSkipMissing
                if numeric =>
            {
                Ok(DataType::Real)
            }
            Self::Sum | Self::SumSkipMissing if input == DataType::Integer => Ok(DataType::Integer),
            Self::Sum | Self::SumSkipMissing if numeric => Ok(DataType::Real),
            Self::Min | Self::Max
                if matches!(
                    input,
                    DataType::Integer | DataType::Real | DataType::Text | DataType::Date
                ) =>
            {
                Ok(input)
            }
            Self::Min | Self::Max => Err(TidyError::type_mismatch(
                format!("{self:?} of '{column}'"),
                "an ordered type",
                input,
            )),
            _ => Err(TidyError::type_mismatch(
                format!("{self:?} of '{column}'"),
                "numeric",
                input,
            )),
        }
    }

    fn reduce(self, column: &Column, rows: &[usize], out: DataType) -> Value {
        match self {
            Self::Count => return Value::Integer(rows.len() as i64),
            Self::CountMissing => {
                let missing = rows.iter().filter(|&&r| column.is_missing(r)).count();
                return Value::Integer(missing as i64);
            }
            _ => {}
        }

        let has_missing = rows.iter().any(|&r| column.is_missing(r));
        if has_missing && !self.skips_missing() {
            return Value::Missing(out);
        }
        let present: Vec<usize> = rows.iter().copied().filter(|&r| !column.is_missing(r)).collect();

        match self {
            Self::Min | Self::Max => {
                let pick = if self == Self::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                present
                    .iter()
                    .map(|&r| column.get(r))
                    .reduce(|best, v| if v.compare(&best) == Some(pick) { v } else { best })
                    .unwrap_or(Value::Missing(out))
            }
            Self::Sum | Self::SumSkipMissing if out == DataType::Integer => present
                .iter()
                .try_fold(0i64, |acc, &r| acc.checked_add(column.get(r).as_i64()?))
                .map_or(Value::Missing(out), Value::Integer),
            _ => {
                let values: Vec<f64> = present.iter().filter_map(|&r| column.numeric_at(r)).collect();
                match self {
                    Self::Sum | Self::SumSkipMissing => Value::Real(values.iter().sum()),
                    Self::Mean | Self::MeanSkipMissing => statistic(&values, 1, stats::mean, out),
                    _ => statistic(&values, 2, stats::std_dev, out),
                }
            }
        }
    }
}

/// Missing below `min_len` values; NaN when a value is not finite.
fn statistic(values: &[f64], min_len: usize, f: fn(&[f64]) -> Option<f64>, out: DataType) -> Value {
    if values.len() < min_len {
        Value::Missing(out)
    } else {
        Value::Real(f(values).unwrap_or(f64::NAN))
    }
}

/// One output column of [`group_aggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Name of the output column.
    pub output: String,
    /// Name of the input column.
    pub column: String,
    pub reducer: Reducer,
}

impl Aggregation {
    pub fn new(output: impl Into<String>, column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            output: output.into(),
            column: column.into(),
            reducer,
        }
    }
}

/// Groups `df` by `keys` and reduces each group.
///
/// Output has one row per distinct key combination (first-seen order),
/// including one row for each combination containing a missing key.
pub fn group_aggregate(
    df: &DataFrame,
    keys: &[&str],
    aggregations: &[Aggregation],
) -> Result<DataFrame> {
    group_by(df, keys)?.aggregate(aggregations)
}

/// Counts rows per distinct combination of `keys`, in a column named `n`.
pub fn count_by(df: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let grouped = group_by(df, keys)?;
    let mut out = grouped.key_frame()?;
    let counts = grouped
        .groups
        .iter()
        .map(|g| Some(g.rows.len() as i64))
        .collect();
    out.add_column("n", Column::integers(counts))?;
    Ok(out)
}

// ── Sorting and de-duplication ────────────────────────────────────────

/// One key of an [`arrange`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Sorts rows by `keys` (stable). Missing values sort last in either direction.
pub fn arrange(df: &DataFrame, keys: &[SortKey]) -> Result<DataFrame> {
    let columns: Vec<(&Column, bool)> = keys
        .iter()
        .map(|k| df.column(&k.column).map(|c| (c, k.descending)))
        .collect::<Result<_>>()?;

    let mut order: Vec<usize> = (0..df.row_count()).collect();
    order.sort_by(|&a, &b| {
        for &(column, descending) in &columns {
            let ord = match (column.is_missing(a), column.is_missing(b)) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = column.get(a).compare(&column.get(b)).unwrap_or(Ordering::Equal);
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let rows: Vec<Option<usize>> = order.into_iter().map(Some).collect();
    Ok(df.take(&rows))
}

/// Unique rows over `columns` (all columns when empty), first occurrence kept.
pub fn distinct(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let names: Vec<&str> = if columns.is_empty() {
        df.column_names().iter().map(String::as_str).collect()
    } else {
        columns.to_vec()
    };
    let selected = df.select(&names)?;
    let grouped = group_by(&selected, &names)?;
    // Without key columns an empty frame still forms one empty group.
    let first_rows: Vec<Option<usize>> = grouped
        .groups
        .iter()
        .filter_map(|g| g.rows.first().copied().map(Some))
        .collect();
    Ok(selected.take(&first_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, lit};

    fn scenario() -> DataFrame {
        DataFrame::from_columns(vec![
            ("g", Column::texts(vec![Some("a"), Some("a"), Some("b")])),
            ("x", Column::reals(vec![Some(1.0), None, Some(3.0)])),
        ])
        .expect("valid frame")
    }

    fn polls() -> DataFrame {
        DataFrame::from_columns(vec![
            (
                "state",
                Column::texts(vec![Some("OH"), Some("PA"), Some("OH"), None, Some("PA"), None]),
            ),
            (
                "spread",
                Column::reals(vec![Some(0.02), Some(0.04), Some(0.06), Some(0.01), None, Some(0.03)]),
            ),
            (
                "n",
                Column::integers(vec![Some(800), Some(1000), Some(1200), Some(500), Some(700), Some(600)]),
            ),
            (
                "won",
                Column::booleans(vec![Some(true), Some(false), Some(true), None, Some(true), Some(false)]),
            ),
        ])
        .expect("valid frame")
    }

    #[test]
    fn mean_propagates_missing_by_default() {
        let out = group_aggregate(
            &scenario(),
            &["g"],
            &[Aggregation::new("mean_x", "x", Reducer::Mean)],
        )
        .unwrap();
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.value(0, "g").unwrap(), Value::from("a"));
        assert_eq!(out.value(0, "mean_x").unwrap(), Value::Missing(DataType::Real));
        assert_eq!(out.value(1, "mean_x").unwrap(), Value::Real(3.0));
    }

    #[test]
    fn mean_skip_missing_opts_in() {
        let out = group_aggregate(
            &scenario(),
            &["g"],
            &[Aggregation::new("mean_x", "x", Reducer::MeanSkipMissing)],
        )
        .unwrap();
        assert_eq!(out.value(0, "mean_x").unwrap(), Value::Real(1.0));
        assert_eq!(out.value(1, "mean_x").unwrap(), Value::Real(3.0));
    }

    #[test]
    fn missing_keys_form_one_group() {
        let df = polls();
        let grouped = group_by(&df, &["state"]).unwrap();
        assert_eq!(grouped.group_count(), 3);
        let missing_group = &grouped.groups()[2];
        assert_eq!(missing_group.key, vec![Value::Missing(DataType::Text)]);
        assert_eq!(missing_group.rows, vec![3, 5]);

        let counts = count_by(&df, &["state"]).unwrap();
        assert_eq!(counts.row_count(), 3);
        assert_eq!(counts.value(2, "n").unwrap(), Value::Integer(2));
        assert!(counts.value(2, "state").unwrap().is_missing());
    }

    #[test]
    fn group_count_equals_distinct_combinations() {
        let df = polls();
        let out = group_aggregate(
            &df,
            &["state", "won"],
            &[Aggregation::new("rows", "n", Reducer::Count)],
        )
        .unwrap();
        // (OH,T) (PA,F) (NA,NA) (PA,T) (NA,F)
        assert_eq!(out.row_count(), 5);
        let total: i64 = (0..out.row_count())
            .map(|i| out.value(i, "rows").unwrap().as_i64().unwrap())
            .sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn sums_keep_integer_type() {
        let out = group_aggregate(
            &polls(),
            &["state"],
            &[
                Aggregation::new("total_n", "n", Reducer::Sum),
                Aggregation::new("spread_sum", "spread", Reducer::SumSkipMissing),
                Aggregation::new("spread_na", "spread", Reducer::CountMissing),
            ],
        )
        .unwrap();
        assert_eq!(out.data_type("total_n").unwrap(), DataType::Integer);
        assert_eq!(out.value(0, "total_n").unwrap(), Value::Integer(2000));
        assert_eq!(out.value(1, "spread_sum").unwrap(), Value::Real(0.04));
        assert_eq!(out.value(1, "spread_na").unwrap(), Value::Integer(1));
    }

    #[test]
    fn boolean_mean_requires_explicit_cast() {
        let df = polls();
        let err = group_aggregate(&df, &[], &[Aggregation::new("p", "won", Reducer::Mean)])
            .unwrap_err();
        assert!(matches!(
            err,
            TidyError::TypeMismatch {
                found: DataType::Boolean,
                ..
            }
        ));

        let df = df
            .derive("won_int", &col("won").cast(DataType::Integer))
            .unwrap();
        let out = group_aggregate(
            &df,
            &[],
            &[Aggregation::new("p", "won_int", Reducer::MeanSkipMissing)],
        )
        .unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.value(0, "p").unwrap(), Value::Real(0.6));
    }

    #[test]
    fn std_dev_min_max() {
        let df = polls().filter(&col("spread").is_not_missing()).unwrap();
        let out = group_aggregate(
            &df,
            &[],
            &[
                Aggregation::new("sd", "spread", Reducer::StdDev),
                Aggregation::new("lo", "state", Reducer::Min),
                Aggregation::new("hi", "n", Reducer::Max),
            ],
        )
        .unwrap();
        let sd = out.value(0, "sd").unwrap().as_f64().unwrap();
        assert!((sd - 0.019235384061671346).abs() < 1e-12, "sd={sd}");
        // state has missing values, so Min propagates
        assert!(out.value(0, "lo").unwrap().is_missing());
        assert_eq!(out.value(0, "hi").unwrap(), Value::Integer(1200));
    }

    #[test]
    fn non_finite_values_give_nan_statistics() {
        let df = DataFrame::from_columns(vec![(
            "x",
            Column::reals(vec![Some(1.0), Some(f64::INFINITY), Some(2.0)]),
        )])
        .unwrap();
        let out = group_aggregate(
            &df,
            &[],
            &[
                Aggregation::new("avg", "x", Reducer::Mean),
                Aggregation::new("sd", "x", Reducer::StdDev),
            ],
        )
        .unwrap();
        assert!(out.value(0, "avg").unwrap().as_f64().unwrap().is_nan());
        assert!(out.value(0, "sd").unwrap().as_f64().unwrap().is_nan());

        let single = group_aggregate(&df.head(1), &[], &[Aggregation::new("sd", "x", Reducer::StdDev)])
            .unwrap();
        assert_eq!(single.value(0, "sd").unwrap(), Value::Missing(DataType::Real));
    }

    #[test]
    fn unknown_columns_fail_fast() {
        let df = polls();
        assert_eq!(
            group_by(&df, &["county"]).unwrap_err(),
            TidyError::column_not_found("county")
        );
        let err = group_aggregate(&df, &["state"], &[Aggregation::new("m", "margin", Reducer::Mean)])
            .unwrap_err();
        assert_eq!(err, TidyError::column_not_found("margin"));
    }

    #[test]
    fn output_name_collision() {
        let err = group_aggregate(
            &polls(),
            &["state"],
            &[Aggregation::new("state", "n", Reducer::Count)],
        )
        .unwrap_err();
        assert!(matches!(err, TidyError::DuplicateColumn { .. }));
    }

    #[test]
    fn aggregate_on_empty_frame() {
        let df = polls().head(0);
        let grouped = group_aggregate(&df, &["state"], &[Aggregation::new("n", "n", Reducer::Count)])
            .unwrap();
        assert_eq!(grouped.row_count(), 0);

        let whole = group_aggregate(
            &df,
            &[],
            &[
                Aggregation::new("rows", "n", Reducer::Count),
                Aggregation::new("avg", "spread", Reducer::Mean),
            ],
        )
        .unwrap();
        assert_eq!(whole.row_count(), 1);
        assert_eq!(whole.value(0, "rows").unwrap(), Value::Integer(0));
        assert!(whole.value(0, "avg").unwrap().is_missing());
    }

    #[test]
    fn arrange_descending_with_missing_last() {
        let out = arrange(&polls(), &[SortKey::desc("spread")]).unwrap();
        let spreads: Vec<Value> = (0..6).map(|i| out.value(i, "spread").unwrap()).collect();
        assert_eq!(spreads[0], Value::Real(0.06));
        assert_eq!(spreads[4], Value::Real(0.01));
        assert!(spreads[5].is_missing());
    }

    #[test]
    fn arrange_multiple_keys_is_stable() {
        let out = arrange(&polls(), &[SortKey::asc("state"), SortKey::desc("n")]).unwrap();
        let states: Vec<String> = (0..6)
            .map(|i| out.value(i, "state").unwrap().to_string())
            .collect();
        assert_eq!(states, vec!["OH", "OH", "PA", "PA", "NA", "NA"]);
        assert_eq!(out.value(0, "n").unwrap(), Value::Integer(1200));
        assert_eq!(out.value(4, "n").unwrap(), Value::Integer(600));
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        let out = distinct(&polls(), &["state"]).unwrap();
        assert_eq!(out.column_names(), &["state"]);
        assert_eq!(out.row_count(), 3);

        let all = distinct(&polls(), &[]).unwrap();
        assert_eq!(all.row_count(), 6);
    }

    #[test]
    fn distinct_of_empty_frames() {
        let out = distinct(&DataFrame::new(), &[]).unwrap();
        assert_eq!(out.row_count(), 0);
        assert_eq!(out.column_count(), 0);

        let no_rows = distinct(&polls().head(0), &["state"]).unwrap();
        assert_eq!(no_rows.row_count(), 0);
        assert_eq!(no_rows.column_names(), &["state"]);
    }

    #[test]
    fn wrappers_match_dataframe_methods() {
        let df = polls();
        let pred = col("n").ge(lit(800));
        assert_eq!(filter_rows(&df, &pred).unwrap(), df.filter(&pred).unwrap());
        let expr = col("n") / lit(1000);
        assert_eq!(
            derive_column(&df, "k", &expr).unwrap(),
            df.derive("k", &expr).unwrap()
        );
    }
}
