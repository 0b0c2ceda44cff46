//! Scalar values and column type tags.
//!
//! A [`Value`] is one cell of a [`DataFrame`](crate::dataframe::DataFrame).
//! Missing cells are represented by [`Value::Missing`], which carries the
//! [`DataType`] of the column it came from. Two missing markers are equal
//! only when their types match, which lets a missing key form its own group
//! while keeping integer and text missingness apart.
//!
//! ```
//! use u_tidy::value::{DataType, Value};
//!
//! let na = Value::Missing(DataType::Integer);
//! assert!(na.is_missing());
//! assert_eq!(na.data_type(), DataType::Integer);
//! assert_eq!(na.to_string(), "NA");
//! assert_eq!(Value::from(2.5).to_string(), "2.5");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── DataType ──────────────────────────────────────────────────────────

/// Semantic type tag of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integers.
    Integer,
    /// 64-bit floating point values.
    Real,
    /// True/false values.
    Boolean,
    /// Strings and categorical labels.
    Text,
    /// Calendar dates without time zone.
    Date,
    /// Untyped column where every cell is missing.
    ///
    /// Unifies with any other type when combined.
    Null,
}

impl DataType {
    /// Returns `true` for [`Integer`](Self::Integer) and [`Real`](Self::Real).
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Unifies two types without numeric promotion.
    ///
    /// Identical types unify to themselves and [`Null`](Self::Null) adopts the
    /// other type. Anything else is `None`.
    pub fn unify_strict(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Self::Null, b) => Some(b),
            (a, Self::Null) => Some(a),
            _ => None,
        }
    }

    /// Unifies two types, promoting `Integer` and `Real` to `Real`.
    pub fn unify_numeric(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::Integer, Self::Real) | (Self::Real, Self::Integer) => Some(Self::Real),
            (a, b) => a.unify_strict(b),
        }
    }

    /// Returns `true` if values of the two types can be ordered against each other.
    pub fn comparable_with(self, other: Self) -> bool {
        (self.is_numeric() && other.is_numeric()) || self.unify_strict(other).is_some()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Real => write!(f, "Real"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Text => write!(f, "Text"),
            Self::Date => write!(f, "Date"),
            Self::Null => write!(f, "Null"),
        }
    }
}

// ── Value ─────────────────────────────────────────────────────────────

/// A single typed cell.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Date(NaiveDate),
    /// Missing marker for a column of the given type.
    Missing(DataType),
}

impl Value {
    /// Returns the type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Integer,
            Self::Real(_) => DataType::Real,
            Self::Boolean(_) => DataType::Boolean,
            Self::Text(_) => DataType::Text,
            Self::Date(_) => DataType::Date,
            Self::Missing(t) => *t,
        }
    }

    /// Returns `true` if this is a missing marker.
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// Returns the numeric value as `f64` for integer and real cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer payload.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the date payload.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Orders two non-missing values of comparable types.
    ///
    /// Integers and reals compare numerically. Returns `None` when either
    /// side is missing, the types are not comparable, or a real is NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Missing(a), Self::Missing(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Integer(v) => v.hash(state),
            Self::Real(v) => v.to_bits().hash(state),
            Self::Boolean(v) => v.hash(state),
            Self::Text(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
            Self::Missing(t) => t.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::Text(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Missing(_) => write!(f, "NA"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

macro_rules! impl_from_option {
    ($ty:ty, $dtype:expr) => {
        impl From<Option<$ty>> for Value {
            fn from(v: Option<$ty>) -> Self {
                v.map_or(Self::Missing($dtype), Self::from)
            }
        }
    };
}

impl_from_option!(i64, DataType::Integer);
impl_from_option!(f64, DataType::Real);
impl_from_option!(bool, DataType::Boolean);
impl_from_option!(&str, DataType::Text);
impl_from_option!(String, DataType::Text);
impl_from_option!(NaiveDate, DataType::Date);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn missing_markers_are_typed() {
        assert_eq!(Value::Missing(DataType::Text), Value::Missing(DataType::Text));
        assert_ne!(Value::Missing(DataType::Text), Value::Missing(DataType::Integer));
        assert_eq!(Value::from(None::<i64>), Value::Missing(DataType::Integer));
    }

    #[test]
    fn real_equality_uses_bits() {
        let mut set = HashSet::new();
        set.insert(Value::Real(f64::NAN));
        set.insert(Value::Real(f64::NAN));
        set.insert(Value::Real(1.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn numeric_compare_crosses_integer_and_real() {
        assert_eq!(Value::Integer(2).compare(&Value::Real(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Text("a".into()).compare(&Value::Integer(1)), None);
        assert_eq!(Value::Missing(DataType::Integer).compare(&Value::Integer(1)), None);
    }

    #[test]
    fn unify_rules() {
        assert_eq!(DataType::Integer.unify_strict(DataType::Real), None);
        assert_eq!(DataType::Integer.unify_numeric(DataType::Real), Some(DataType::Real));
        assert_eq!(DataType::Null.unify_strict(DataType::Date), Some(DataType::Date));
        assert_eq!(DataType::Text.unify_numeric(DataType::Real), None);
        assert!(DataType::Integer.comparable_with(DataType::Real));
        assert!(!DataType::Text.comparable_with(DataType::Boolean));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
        let d = NaiveDate::from_ymd_opt(2016, 11, 8).expect("valid date");
        assert_eq!(Value::Date(d).to_string(), "2016-11-08");
    }
}
