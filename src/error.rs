//! Error types for u-tidy.

use thiserror::Error;

use crate::value::DataType;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, TidyError>;

/// All errors produced by u-tidy operations.
///
/// Operations fail fast: an error is returned from the call that detects it
/// and no partial result is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TidyError {
    /// Column not found in the DataFrame.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },

    /// A column name would appear twice in the result.
    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },

    /// Non-key columns collide in a join and no suffixes were supplied.
    #[error("column '{name}' exists on both sides of the join; supply suffixes")]
    AmbiguousColumn { name: String },

    /// Insufficient data for the requested operation.
    #[error("need at least {min_required} usable rows, got {actual}")]
    InsufficientData { min_required: usize, actual: usize },

    /// Operation applied to a column or expression of an incompatible type.
    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: DataType,
    },

    /// Key sets are inconsistent across the inputs of a reshape or join.
    #[error("key mismatch: {message}")]
    KeyMismatch { message: String },

    /// Dimension mismatch.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A parameter is outside its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The model design matrix is rank deficient.
    #[error("design matrix is singular: {reason}")]
    SingularMatrix { reason: String },

    /// A categorical predictor holds a level that was not seen when fitting.
    #[error("column '{column}' has level '{level}' not seen during fitting")]
    UnknownLevel { column: String, level: String },
}

impl TidyError {
    pub(crate) fn column_not_found(name: &str) -> Self {
        Self::ColumnNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn type_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: DataType,
    ) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found,
        }
    }
}
