//! Reshaping between long and wide layouts.
//!
//! - [`reshape_long_to_wide`] spreads the distinct values of one column into
//!   new column headers.
//! - [`reshape_wide_to_long`] gathers several columns into name/value pairs.
//!
//! Neither operation drops data unless asked: absent combinations in a
//! long-to-wide pivot are filled (with the missing marker by default), and a
//! wide-to-long pivot keeps rows with missing values unless `drop_missing`
//! is set.
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::reshape::reshape_long_to_wide;
//! use u_tidy::value::Value;
//!
//! let long = DataFrame::from_columns(vec![
//!     ("id", Column::integers(vec![Some(1), Some(2)])),
//!     ("k", Column::texts(vec![Some("A"), Some("B")])),
//!     ("v", Column::integers(vec![Some(10), Some(20)])),
//! ])
//! .unwrap();
//!
//! let wide = reshape_long_to_wide(&long, &["id"], "k", "v", Some(Value::Integer(0))).unwrap();
//! assert_eq!(wide.column_names(), &["id", "A", "B"]);
//! assert_eq!(wide.value(0, "A").unwrap(), Value::Integer(10));
//! assert_eq!(wide.value(0, "B").unwrap(), Value::Integer(0));
//! ```

use std::collections::HashMap;

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::ops::group_by;
use crate::value::{DataType, Value};

/// Pivots `values_from` into one column per distinct value of `names_from`.
///
/// Output columns are `key_columns` followed by the new columns in the order
/// their names are first seen. A missing name becomes a column called `NA`.
/// Columns other than the keys, `names_from` and `values_from` are dropped.
///
/// # Errors
///
/// - [`TidyError::KeyMismatch`] if a key/name combination occurs twice.
/// - [`TidyError::TypeMismatch`] if `fill` does not match the value type.
/// - [`TidyError::DuplicateColumn`] if a new column name equals a key column,
///   or two distinct names display alike (a missing name and the text `NA`).
pub fn reshape_long_to_wide(
    df: &DataFrame,
    key_columns: &[&str],
    names_from: &str,
    values_from: &str,
    fill: Option<Value>,
) -> Result<DataFrame> {
    let names = df.column(names_from)?;
    let values = df.column(values_from)?;
    let grouped = group_by(df, key_columns)?;

    let value_type = values.data_type();
    let out_type = match &fill {
        Some(f) => value_type.unify_strict(f.data_type()).ok_or_else(|| {
            TidyError::type_mismatch("pivot fill", value_type.to_string(), f.data_type())
        })?,
        None => value_type,
    };

    // Header order is first-seen over the whole frame. Headers are keyed by
    // cell value; display names are only formed when columns are added.
    let mut headers: Vec<Value> = Vec::new();
    let mut header_index: HashMap<Value, usize> = HashMap::new();
    let header_of_row: Vec<usize> = (0..df.row_count())
        .map(|row| {
            let header = names.get(row);
            *header_index.entry(header.clone()).or_insert_with(|| {
                headers.push(header);
                headers.len() - 1
            })
        })
        .collect();

    // cells[h][g] = source row holding header h for group g
    let mut cells: Vec<Vec<Option<usize>>> = vec![vec![None; grouped.group_count()]; headers.len()];
    for (g, group) in grouped.groups().iter().enumerate() {
        for &row in &group.rows {
            let slot = &mut cells[header_of_row[row]][g];
            if slot.is_some() {
                return Err(TidyError::KeyMismatch {
                    message: format!(
                        "values of '{values_from}' are not uniquely identified: \
                         name '{}' appears more than once for key {:?}",
                        headers[header_of_row[row]],
                        group.key.iter().map(Value::to_string).collect::<Vec<_>>()
                    ),
                });
            }
            *slot = Some(row);
        }
    }

    let mut out = grouped.key_frame()?;
    for (header, rows) in headers.into_iter().zip(cells) {
        let column = rows
            .iter()
            .map(|row| match row {
                Some(r) => values.get(*r),
                None => fill.clone().unwrap_or(Value::Missing(out_type)),
            })
            .collect();
        out.add_column(header.to_string(), Column::from_values(out_type, column)?)?;
    }

    log::debug!(
        "reshape_long_to_wide: {} rows -> {} rows x {} columns",
        df.row_count(),
        out.row_count(),
        out.column_count()
    );
    Ok(out)
}

/// Gathers `value_columns` into `names_to` / `values_to` pairs.
///
/// Produces one row per (input row, value column), in input-row order. The
/// value columns must share a type; integer and real columns combine as
/// real. With `drop_missing`, rows whose gathered value is missing are
/// omitted.
pub fn reshape_wide_to_long(
    df: &DataFrame,
    id_columns: &[&str],
    value_columns: &[&str],
    names_to: &str,
    values_to: &str,
    drop_missing: bool,
) -> Result<DataFrame> {
    if value_columns.is_empty() {
        return Err(TidyError::InvalidParameter {
            name: "value_columns".into(),
            message: "at least one column is required".into(),
        });
    }
    if let Some(overlap) = value_columns.iter().find(|c| id_columns.contains(c)) {
        return Err(TidyError::InvalidParameter {
            name: "value_columns".into(),
            message: format!("'{overlap}' is also an id column"),
        });
    }

    let ids = df.select(id_columns)?;
    let sources: Vec<&Column> = value_columns
        .iter()
        .map(|c| df.column(c))
        .collect::<Result<_>>()?;

    let mut value_type = DataType::Null;
    for (name, column) in value_columns.iter().zip(&sources) {
        let t = column.data_type();
        value_type = value_type.unify_numeric(t).ok_or_else(|| {
            TidyError::type_mismatch(format!("gathering '{name}'"), value_type.to_string(), t)
        })?;
    }

    let mut rows = Vec::new();
    let mut names = Vec::new();
    let mut cells = Vec::new();
    for row in 0..df.row_count() {
        for (name, column) in value_columns.iter().zip(&sources) {
            if drop_missing && column.is_missing(row) {
                continue;
            }
            let cell = match column.get(row) {
                Value::Integer(v) if value_type == DataType::Real => Value::Real(v as f64),
                other => other,
            };
            rows.push(Some(row));
            names.push(Some(name.to_string()));
            cells.push(cell);
        }
    }

    let mut out = ids.take(&rows);
    out.add_column(names_to, Column::texts(names))?;
    out.add_column(values_to, Column::from_values(value_type, cells)?)?;

    log::debug!(
        "reshape_wide_to_long: {} rows x {} value columns -> {} rows",
        df.row_count(),
        value_columns.len(),
        out.row_count()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_wide() -> DataFrame {
        DataFrame::from_columns(vec![
            ("state", Column::texts(vec![Some("FL"), Some("NC"), Some("WI")])),
            ("clinton", Column::reals(vec![Some(47.8), Some(46.2), None])),
            ("trump", Column::reals(vec![Some(49.0), Some(49.8), Some(47.2)])),
        ])
        .expect("valid frame")
    }

    #[test]
    fn long_to_wide_fills_absent_combinations() {
        let long = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1), Some(2)])),
            ("k", Column::texts(vec![Some("A"), Some("B")])),
            ("v", Column::integers(vec![Some(10), Some(20)])),
        ])
        .unwrap();

        let wide = reshape_long_to_wide(&long, &["id"], "k", "v", Some(Value::Integer(0))).unwrap();
        assert_eq!(wide.column_names(), &["id", "A", "B"]);
        assert_eq!(wide.value(0, "id").unwrap(), Value::Integer(1));
        assert_eq!(wide.value(0, "A").unwrap(), Value::Integer(10));
        assert_eq!(wide.value(0, "B").unwrap(), Value::Integer(0));
        assert_eq!(wide.value(1, "A").unwrap(), Value::Integer(0));
        assert_eq!(wide.value(1, "B").unwrap(), Value::Integer(20));

        let default_fill = reshape_long_to_wide(&long, &["id"], "k", "v", None).unwrap();
        assert_eq!(default_fill.value(0, "B").unwrap(), Value::Missing(DataType::Integer));
    }

    #[test]
    fn long_to_wide_rejects_duplicates() {
        let long = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1), Some(1)])),
            ("k", Column::texts(vec![Some("A"), Some("A")])),
            ("v", Column::integers(vec![Some(10), Some(11)])),
        ])
        .unwrap();
        let err = reshape_long_to_wide(&long, &["id"], "k", "v", None).unwrap_err();
        assert!(matches!(err, TidyError::KeyMismatch { .. }));
    }

    #[test]
    fn long_to_wide_fill_type_is_checked() {
        let long = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1)])),
            ("k", Column::texts(vec![Some("A")])),
            ("v", Column::integers(vec![Some(10)])),
        ])
        .unwrap();
        let err = reshape_long_to_wide(&long, &["id"], "k", "v", Some(Value::Real(0.0))).unwrap_err();
        assert!(matches!(err, TidyError::TypeMismatch { .. }));
    }

    #[test]
    fn long_to_wide_missing_name_becomes_na_column() {
        let long = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1), Some(1)])),
            ("k", Column::texts(vec![Some("A"), None])),
            ("v", Column::reals(vec![Some(1.5), Some(2.5)])),
        ])
        .unwrap();
        let wide = reshape_long_to_wide(&long, &["id"], "k", "v", None).unwrap();
        assert_eq!(wide.column_names(), &["id", "A", "NA"]);
        assert_eq!(wide.value(0, "NA").unwrap(), Value::Real(2.5));
    }

    #[test]
    fn long_to_wide_missing_name_and_na_text_collide() {
        let long = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1), Some(1)])),
            ("k", Column::texts(vec![Some("NA"), None])),
            ("v", Column::integers(vec![Some(10), Some(20)])),
        ])
        .unwrap();
        let err = reshape_long_to_wide(&long, &["id"], "k", "v", None).unwrap_err();
        assert_eq!(err, TidyError::DuplicateColumn { name: "NA".into() });
    }

    #[test]
    fn wide_to_long_keeps_missing_by_default() {
        let long = reshape_wide_to_long(
            &results_wide(),
            &["state"],
            &["clinton", "trump"],
            "candidate",
            "pct",
            false,
        )
        .unwrap();
        assert_eq!(long.row_count(), 6);
        assert_eq!(long.column_names(), &["state", "candidate", "pct"]);
        assert_eq!(long.value(1, "candidate").unwrap(), Value::from("trump"));
        assert_eq!(long.value(4, "state").unwrap(), Value::from("WI"));
        assert!(long.value(4, "pct").unwrap().is_missing());

        let dropped = reshape_wide_to_long(
            &results_wide(),
            &["state"],
            &["clinton", "trump"],
            "candidate",
            "pct",
            true,
        )
        .unwrap();
        assert_eq!(dropped.row_count(), 5);
    }

    #[test]
    fn wide_to_long_promotes_integer_and_real() {
        let df = DataFrame::from_columns(vec![
            ("id", Column::integers(vec![Some(1)])),
            ("a", Column::integers(vec![Some(2)])),
            ("b", Column::reals(vec![Some(0.5)])),
        ])
        .unwrap();
        let long = reshape_wide_to_long(&df, &["id"], &["a", "b"], "name", "value", false).unwrap();
        assert_eq!(long.data_type("value").unwrap(), DataType::Real);
        assert_eq!(long.value(0, "value").unwrap(), Value::Real(2.0));

        let mixed = DataFrame::from_columns(vec![
            ("a", Column::integers(vec![Some(2)])),
            ("b", Column::texts(vec![Some("x")])),
        ])
        .unwrap();
        let err = reshape_wide_to_long(&mixed, &[], &["a", "b"], "name", "value", false).unwrap_err();
        assert!(matches!(err, TidyError::TypeMismatch { .. }));
    }

    #[test]
    fn wide_long_wide_round_trip() {
        let wide = results_wide();
        let long = reshape_wide_to_long(
            &wide,
            &["state"],
            &["clinton", "trump"],
            "candidate",
            "pct",
            false,
        )
        .unwrap();
        let back = reshape_long_to_wide(&long, &["state"], "candidate", "pct", None).unwrap();
        assert_eq!(back, wide);
    }

    #[test]
    fn wide_to_long_parameter_checks() {
        let df = results_wide();
        assert!(reshape_wide_to_long(&df, &["state"], &[], "n", "v", false).is_err());
        assert!(reshape_wide_to_long(&df, &["state"], &["state"], "n", "v", false).is_err());
        let err = reshape_wide_to_long(&df, &["state"], &["johnson"], "n", "v", false).unwrap_err();
        assert_eq!(err, TidyError::column_not_found("johnson"));
    }
}
