//! Key-based joins of two DataFrames.
//!
//! Rows match when every key column holds equal, present values. A missing
//! key never matches anything, including another missing key.
//!
//! # Output layout
//!
//! For [`Inner`](JoinKind::Inner), [`Left`](JoinKind::Left),
//! [`Right`](JoinKind::Right) and [`Full`](JoinKind::Full) joins the result
//! holds the key columns, then the left non-key columns, then the right
//! non-key columns. [`Semi`](JoinKind::Semi) and [`Anti`](JoinKind::Anti)
//! joins filter the left frame and keep its columns unchanged.
//!
//! Rows appear in left order, each followed by its matches in right order;
//! right-only rows of a right or full join come last.
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::join::{join, JoinConfig, JoinKind};
//!
//! let polls = DataFrame::from_columns(vec![
//!     ("state", Column::texts(vec![Some("OH"), Some("PA"), None])),
//!     ("poll", Column::reals(vec![Some(3.5), Some(-1.0), Some(0.4)])),
//! ])
//! .unwrap();
//! let results = DataFrame::from_columns(vec![
//!     ("state", Column::texts(vec![Some("PA"), Some("OH")])),
//!     ("actual", Column::reals(vec![Some(0.7), Some(8.1)])),
//! ])
//! .unwrap();
//!
//! let joined = join(&polls, &results, &["state"], JoinKind::Inner, &JoinConfig::default()).unwrap();
//! assert_eq!(joined.column_names(), &["state", "poll", "actual"]);
//! assert_eq!(joined.row_count(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::value::Value;

// ── Configuration ─────────────────────────────────────────────────────

/// Which rows a join keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// Matched pairs only.
    Inner,
    /// Every left row; unmatched rows get missing right columns.
    Left,
    /// Every right row; unmatched rows get missing left columns.
    Right,
    /// Every row of both sides.
    Full,
    /// Left rows with at least one match, left columns only.
    Semi,
    /// Left rows with no match, left columns only.
    Anti,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Full => "full",
            Self::Semi => "semi",
            Self::Anti => "anti",
        };
        f.write_str(name)
    }
}

/// Configuration for [`join`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Suffixes appended to colliding non-key column names, left then right.
    /// Default: `None` (collisions are an error).
    pub suffixes: Option<(String, String)>,
}

impl JoinConfig {
    /// Creates a config with no suffixes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the suffixes used to disambiguate colliding column names.
    pub fn suffixes(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.suffixes = Some((left.into(), right.into()));
        self
    }
}

// ── Join ──────────────────────────────────────────────────────────────

/// Joins `left` and `right` on the key columns `on`.
///
/// # Errors
///
/// - [`TidyError::InvalidParameter`] if `on` is empty.
/// - [`TidyError::ColumnNotFound`] if a key is absent from either side.
/// - [`TidyError::KeyMismatch`] if a key column has different types on the
///   two sides.
/// - [`TidyError::AmbiguousColumn`] if a non-key column exists on both sides
///   and no suffixes were configured.
pub fn join(
    left: &DataFrame,
    right: &DataFrame,
    on: &[&str],
    kind: JoinKind,
    config: &JoinConfig,
) -> Result<DataFrame> {
    if on.is_empty() {
        return Err(TidyError::InvalidParameter {
            name: "on".into(),
            message: "at least one key column is required".into(),
        });
    }

    let mut key_types = Vec::with_capacity(on.len());
    for key in on {
        let lt = left.data_type(key)?;
        let rt = right.data_type(key)?;
        let unified = lt.unify_strict(rt).ok_or_else(|| TidyError::KeyMismatch {
            message: format!("key '{key}' is {lt} on the left but {rt} on the right"),
        })?;
        key_types.push(unified);
    }

    let left_keys: Vec<&Column> = on.iter().map(|k| left.column(k)).collect::<Result<_>>()?;
    let right_keys: Vec<&Column> = on.iter().map(|k| right.column(k)).collect::<Result<_>>()?;

    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for row in 0..right.row_count() {
        if let Some(key) = present_key(&right_keys, row) {
            index.entry(key).or_default().push(row);
        }
    }

    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    let mut right_matched = vec![false; right.row_count()];
    for row in 0..left.row_count() {
        let matches = present_key(&left_keys, row).and_then(|key| index.get(&key));
        match (kind, matches) {
            (JoinKind::Semi, Some(_)) => pairs.push((Some(row), None)),
            (JoinKind::Anti, None) => pairs.push((Some(row), None)),
            (JoinKind::Semi | JoinKind::Anti, _) => {}
            (_, Some(rows)) => {
                for &r in rows {
                    right_matched[r] = true;
                    pairs.push((Some(row), Some(r)));
                }
            }
            (JoinKind::Left | JoinKind::Full, None) => pairs.push((Some(row), None)),
            (_, None) => {}
        }
    }
    if matches!(kind, JoinKind::Right | JoinKind::Full) {
        pairs.extend(
            right_matched
                .iter()
                .enumerate()
                .filter(|(_, matched)| !**matched)
                .map(|(r, _)| (None, Some(r))),
        );
    }

    log::debug!(
        "{kind} join on {:?}: {} x {} rows -> {} rows",
        on,
        left.row_count(),
        right.row_count(),
        pairs.len()
    );

    let left_rows: Vec<Option<usize>> = pairs.iter().map(|p| p.0).collect();
    if matches!(kind, JoinKind::Semi | JoinKind::Anti) {
        return Ok(left.take(&left_rows));
    }
    let right_rows: Vec<Option<usize>> = pairs.iter().map(|p| p.1).collect();

    let mut out = DataFrame::new();
    for ((name, dtype), (lcol, rcol)) in on
        .iter()
        .zip(&key_types)
        .zip(left_keys.iter().zip(&right_keys))
    {
        let cells = pairs
            .iter()
            .map(|pair| match pair {
                (Some(l), _) => lcol.get(*l),
                (None, Some(r)) => rcol.get(*r),
                (None, None) => Value::Missing(*dtype),
            })
            .collect();
        out.add_column(*name, Column::from_values(*dtype, cells)?)?;
    }

    let left_rest = non_keys(left, on);
    let right_rest = non_keys(right, on);
    for (name, column) in &left_rest {
        let out_name = output_name(name, &right_rest, config, Side::Left)?;
        out.add_column(out_name, column.take(&left_rows))?;
    }
    for (name, column) in &right_rest {
        let out_name = output_name(name, &left_rest, config, Side::Right)?;
        out.add_column(out_name, column.take(&right_rows))?;
    }
    Ok(out)
}

/// Key values of `row`, or `None` if any of them is missing.
fn present_key(columns: &[&Column], row: usize) -> Option<Vec<Value>> {
    columns
        .iter()
        .map(|c| (!c.is_missing(row)).then(|| c.get(row)))
        .collect()
}

fn non_keys<'a>(df: &'a DataFrame, on: &[&str]) -> Vec<(&'a str, &'a Column)> {
    df.iter().filter(|(name, _)| !on.contains(name)).collect()
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

fn output_name(
    name: &str,
    other: &[(&str, &Column)],
    config: &JoinConfig,
    side: Side,
) -> Result<String> {
    if !other.iter().any(|(n, _)| *n == name) {
        return Ok(name.to_string());
    }
    match (&config.suffixes, side) {
        (Some((suffix, _)), Side::Left) => Ok(format!("{name}{suffix}")),
        (Some((_, suffix)), Side::Right) => Ok(format!("{name}{suffix}")),
        (None, _) => Err(TidyError::AmbiguousColumn {
            name: name.to_string(),
        }),
    }
}
