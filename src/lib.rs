//! # u-tidy
//!
//! Typed, immutable tabular data with missing values, composable column
//! expressions, and tidy transforms for exploratory analysis.
//!
//! Every column has one of a closed set of types and carries its own
//! missing marker. Missing values propagate through arithmetic, comparison
//! and aggregation unless an operation explicitly opts out; nothing is
//! coerced between types without a `cast`.
//!
//! ## Modules
//!
//! - [`value`] — Cell values and type tags (Value, DataType)
//! - [`dataframe`] — Column-major immutable DataFrame with validity bitmaps
//! - [`expr`] — Column expressions: arithmetic, comparison, logic, `when`, `cast`
//! - [`ops`] — filter, derive, group/aggregate, arrange, distinct, count
//! - [`reshape`] — Long-to-wide and wide-to-long pivots
//! - [`join`] — Inner, left, right, full, semi and anti joins
//! - [`model`] — Ordinary least squares with treatment-coded text predictors
//! - [`clustering`] — K-Means++ over numeric columns
//! - [`summary`] — Per-column descriptive summaries
//! - [`error`] — Error types
//!
//! ## Quick Start
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::expr::{col, lit};
//! use u_tidy::ops::{group_aggregate, Aggregation, Reducer};
//! use u_tidy::value::Value;
//!
//! let polls = DataFrame::from_columns(vec![
//!     ("state", Column::texts(vec![Some("OH"), Some("OH"), Some("PA"), Some("PA")])),
//!     ("clinton", Column::reals(vec![Some(44.0), Some(46.0), Some(48.0), None])),
//!     ("trump", Column::reals(vec![Some(47.0), Some(45.0), Some(45.0), Some(44.0)])),
//! ])
//! .unwrap();
//!
//! let spread = polls.derive("spread", &(col("clinton") - col("trump"))).unwrap();
//! let by_state = group_aggregate(
//!     &spread,
//!     &["state"],
//!     &[
//!         Aggregation::new("avg", "spread", Reducer::Mean),
//!         Aggregation::new("avg_known", "spread", Reducer::MeanSkipMissing),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(by_state.value(0, "avg").unwrap(), Value::Real(-1.0));
//! assert!(by_state.value(1, "avg").unwrap().is_missing());
//! assert_eq!(by_state.value(1, "avg_known").unwrap(), Value::Real(3.0));
//!
//! let leads = spread.filter(&col("spread").gt(lit(0.0))).unwrap();
//! assert_eq!(leads.row_count(), 2);
//! ```

pub mod clustering;
pub mod dataframe;
pub mod error;
pub mod expr;
pub mod join;
pub mod model;
pub mod ops;
pub mod reshape;
pub mod summary;
pub mod value;

pub use dataframe::{Column, DataFrame};
pub use error::{Result, TidyError};
pub use value::{DataType, Value};

/// Routes `log` output to the test harness.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
