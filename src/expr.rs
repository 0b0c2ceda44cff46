//! Element-wise expressions for [`DataFrame::filter`] and [`DataFrame::derive`].
//!
//! An [`Expr`] is resolved against a frame's schema before any row is
//! touched, so type errors surface as [`TidyError::TypeMismatch`] up front
//! instead of part-way through a column. Missing operands propagate: unless
//! an expression is explicitly missing-aware ([`Expr::is_missing`],
//! [`Expr::coalesce`]), a row with a missing input yields the result type's
//! missing marker.
//!
//! # Example
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::expr::{col, lit, when};
//! use u_tidy::value::{DataType, Value};
//!
//! let df = DataFrame::from_columns(vec![
//!     ("clinton", Column::reals(vec![Some(47.0), Some(44.0), None])),
//!     ("trump", Column::reals(vec![Some(43.0), Some(46.0), Some(40.0)])),
//! ])
//! .unwrap();
//!
//! let spread = (col("clinton") - col("trump")) / lit(100.0);
//! let df = df.derive("spread", &spread).unwrap();
//! let df = df
//!     .derive("leader", &when(col("spread").gt(lit(0.0)), lit("D"), lit("R")))
//!     .unwrap();
//!
//! assert_eq!(df.value(0, "leader").unwrap(), Value::from("D"));
//! assert_eq!(df.value(2, "leader").unwrap(), Value::Missing(DataType::Text));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops;

use chrono::NaiveDate;

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::value::{DataType, Value};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "&",
            Self::Or => "|",
        };
        f.write_str(symbol)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Abs,
    Ln,
    Sqrt,
}

/// An element-wise expression over the columns of a [`DataFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a column by name.
    Column(String),
    /// A constant broadcast to every row.
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `true` where the operand is missing. Never missing itself.
    IsMissing(Box<Expr>),
    /// First operand where present, otherwise the second.
    Coalesce(Box<Expr>, Box<Expr>),
    /// Explicit type conversion.
    Cast { operand: Box<Expr>, to: DataType },
    /// Typed conditional selection.
    When {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// References a column by name.
pub fn col(name: &str) -> Expr {
    Expr::Column(name.to_string())
}

/// A literal value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// A literal missing marker of type `dtype`.
pub fn missing(dtype: DataType) -> Expr {
    Expr::Literal(Value::Missing(dtype))
}

/// Selects `then` where `condition` is true and `otherwise` where it is false.
///
/// Both branches must have the same type; an untyped missing branch
/// ([`DataType::Null`]) adopts the other branch's type. A missing condition
/// yields the missing marker of that type.
pub fn when(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
    Expr::When {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }
}

impl Expr {
    fn binary(self, op: BinaryOp, other: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    fn unary(self, op: UnaryOp) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(self),
        }
    }

    pub fn equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn not_equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        self.binary(BinaryOp::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        self.binary(BinaryOp::GtEq, other)
    }

    /// Logical AND. A missing operand yields missing.
    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    /// Logical OR. A missing operand yields missing.
    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    pub fn abs(self) -> Expr {
        self.unary(UnaryOp::Abs)
    }

    /// Natural logarithm.
    pub fn ln(self) -> Expr {
        self.unary(UnaryOp::Ln)
    }

    pub fn sqrt(self) -> Expr {
        self.unary(UnaryOp::Sqrt)
    }

    pub fn is_missing(self) -> Expr {
        Expr::IsMissing(Box::new(self))
    }

    pub fn is_not_missing(self) -> Expr {
        !self.is_missing()
    }

    /// Replaces missing cells with `fallback`. Types must match exactly.
    pub fn coalesce(self, fallback: Expr) -> Expr {
        Expr::Coalesce(Box::new(self), Box::new(fallback))
    }

    /// Converts to `to`. This is the only way values change type.
    pub fn cast(self, to: DataType) -> Expr {
        Expr::Cast {
            operand: Box::new(self),
            to,
        }
    }

    /// Resolves the result type against `df`'s schema.
    pub fn data_type(&self, df: &DataFrame) -> Result<DataType> {
        match self {
            Expr::Column(name) => df.data_type(name),
            Expr::Literal(v) => Ok(v.data_type()),
            Expr::Binary { op, left, right } => {
                binary_type(*op, left.data_type(df)?, right.data_type(df)?)
            }
            Expr::Unary { op, operand } => unary_type(*op, operand.data_type(df)?),
            Expr::IsMissing(operand) => {
                operand.data_type(df)?;
                Ok(DataType::Boolean)
            }
            Expr::Coalesce(first, fallback) => {
                let (a, b) = (first.data_type(df)?, fallback.data_type(df)?);
                a.unify_strict(b)
                    .ok_or_else(|| TidyError::type_mismatch("coalesce", a.to_string(), b))
            }
            Expr::Cast { operand, to } => {
                let from = operand.data_type(df)?;
                if cast_allowed(from, *to) {
                    Ok(*to)
                } else {
                    Err(TidyError::type_mismatch(
                        format!("cast to {to}"),
                        "a convertible type",
                        from,
                    ))
                }
            }
            Expr::When {
                condition,
                then,
                otherwise,
            } => {
                let cond = condition.data_type(df)?;
                if !matches!(cond, DataType::Boolean | DataType::Null) {
                    return Err(TidyError::type_mismatch("when condition", "Boolean", cond));
                }
                let (a, b) = (then.data_type(df)?, otherwise.data_type(df)?);
                a.unify_strict(b)
                    .ok_or_else(|| TidyError::type_mismatch("when branches", a.to_string(), b))
            }
        }
    }

    /// Evaluates the expression to a column with one entry per row of `df`.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Column> {
        let dtype = self.data_type(df)?;
        let n = df.row_count();
        let cells: Vec<Value> = match self {
            Expr::Column(name) => return df.column(name).cloned(),
            Expr::Literal(v) => vec![v.clone(); n],
            Expr::Binary { op, left, right } => {
                let (a, b) = (left.evaluate(df)?, right.evaluate(df)?);
                (0..n)
                    .map(|i| apply_binary(*op, a.get(i), b.get(i), dtype))
                    .collect()
            }
            Expr::Unary { op, operand } => {
                let a = operand.evaluate(df)?;
                (0..n).map(|i| apply_unary(*op, a.get(i), dtype)).collect()
            }
            Expr::IsMissing(operand) => {
                let a = operand.evaluate(df)?;
                (0..n).map(|i| Value::Boolean(a.is_missing(i))).collect()
            }
            Expr::Coalesce(first, fallback) => {
                let (a, b) = (first.evaluate(df)?, fallback.evaluate(df)?);
                (0..n)
                    .map(|i| if a.is_missing(i) { b.get(i) } else { a.get(i) })
                    .collect()
            }
            Expr::Cast { operand, to } => {
                let a = operand.evaluate(df)?;
                a.iter().map(|v| cast_value(v, *to)).collect()
            }
            Expr::When {
                condition,
                then,
                otherwise,
            } => {
                let c = condition.evaluate(df)?;
                let (t, o) = (then.evaluate(df)?, otherwise.evaluate(df)?);
                (0..n)
                    .map(|i| match c.get(i) {
                        Value::Boolean(true) => t.get(i),
                        Value::Boolean(false) => o.get(i),
                        _ => Value::Missing(dtype),
                    })
                    .collect()
            }
        };
        Column::from_values(dtype, cells)
    }
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Sub, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Mul, rhs)
    }
}

impl ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}

impl ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        self.unary(UnaryOp::Not)
    }
}

// ── Type resolution ───────────────────────────────────────────────────

fn numeric_or_null(t: DataType) -> bool {
    t.is_numeric() || t == DataType::Null
}

fn binary_type(op: BinaryOp, l: DataType, r: DataType) -> Result<DataType> {
    let context = || format!("operator '{op}'");
    let offending = if numeric_or_null(l) { r } else { l };
    match op {
        BinaryOp::Sub if l == DataType::Date && r == DataType::Date => Ok(DataType::Integer),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            if numeric_or_null(l) && numeric_or_null(r) {
                Ok(l.unify_numeric(r).unwrap_or(DataType::Real))
            } else {
                Err(TidyError::type_mismatch(context(), "numeric", offending))
            }
        }
        BinaryOp::Div => {
            if numeric_or_null(l) && numeric_or_null(r) {
                Ok(DataType::Real)
            } else {
                Err(TidyError::type_mismatch(context(), "numeric", offending))
            }
        }
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq => {
            if l.comparable_with(r) {
                Ok(DataType::Boolean)
            } else {
                Err(TidyError::type_mismatch(context(), l.to_string(), r))
            }
        }
        BinaryOp::And | BinaryOp::Or => {
            let logical = |t: DataType| matches!(t, DataType::Boolean | DataType::Null);
            if logical(l) && logical(r) {
                Ok(DataType::Boolean)
            } else {
                let found = if logical(l) { r } else { l };
                Err(TidyError::type_mismatch(context(), "Boolean", found))
            }
        }
    }
}

fn unary_type(op: UnaryOp, t: DataType) -> Result<DataType> {
    match op {
        UnaryOp::Neg | UnaryOp::Abs if numeric_or_null(t) => Ok(t),
        UnaryOp::Ln | UnaryOp::Sqrt if numeric_or_null(t) => Ok(DataType::Real),
        UnaryOp::Not if matches!(t, DataType::Boolean | DataType::Null) => Ok(DataType::Boolean),
        UnaryOp::Not => Err(TidyError::type_mismatch("logical not", "Boolean", t)),
        _ => Err(TidyError::type_mismatch(format!("{op:?}"), "numeric", t)),
    }
}

fn cast_allowed(from: DataType, to: DataType) -> bool {
    use DataType::*;
    if from == to || from == Null || to == Text {
        return true;
    }
    matches!(
        (from, to),
        (Boolean, Integer | Real)
            | (Integer | Real, Integer | Real | Boolean)
            | (Text, Integer | Real | Boolean | Date)
    )
}

// ── Row evaluation ────────────────────────────────────────────────────

fn apply_binary(op: BinaryOp, a: Value, b: Value, out: DataType) -> Value {
    if a.is_missing() || b.is_missing() {
        return Value::Missing(out);
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            if let (Value::Date(x), Value::Date(y)) = (&a, &b) {
                return Value::Integer((*x - *y).num_days());
            }
            match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) if out == DataType::Integer => {
                    let result = match op {
                        BinaryOp::Add => x.checked_add(y),
                        BinaryOp::Sub => x.checked_sub(y),
                        _ => x.checked_mul(y),
                    };
                    // integer overflow becomes missing
                    result.map_or(Value::Missing(out), Value::Integer)
                }
                _ => {
                    let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                    Value::Real(match op {
                        BinaryOp::Add => x + y,
                        BinaryOp::Sub => x - y,
                        _ => x * y,
                    })
                }
            }
        }
        BinaryOp::Div => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Real(x / y),
            _ => Value::Missing(out),
        },
        BinaryOp::And | BinaryOp::Or => match (a.as_bool(), b.as_bool()) {
            (Some(x), Some(y)) => Value::Boolean(if op == BinaryOp::And { x && y } else { x || y }),
            _ => Value::Missing(out),
        },
        _ => match a.compare(&b) {
            Some(ord) => Value::Boolean(match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            // NaN compares as missing
            None => Value::Missing(out),
        },
    }
}

fn apply_unary(op: UnaryOp, a: Value, out: DataType) -> Value {
    match (op, a) {
        (_, Value::Missing(_)) => Value::Missing(out),
        (UnaryOp::Not, Value::Boolean(v)) => Value::Boolean(!v),
        (UnaryOp::Neg, Value::Integer(v)) => v.checked_neg().map_or(Value::Missing(out), Value::Integer),
        (UnaryOp::Abs, Value::Integer(v)) => v.checked_abs().map_or(Value::Missing(out), Value::Integer),
        (UnaryOp::Neg, Value::Real(v)) => Value::Real(-v),
        (UnaryOp::Abs, Value::Real(v)) => Value::Real(v.abs()),
        (UnaryOp::Ln, v) => v.as_f64().map_or(Value::Missing(out), |x| Value::Real(x.ln())),
        (UnaryOp::Sqrt, v) => v.as_f64().map_or(Value::Missing(out), |x| Value::Real(x.sqrt())),
        _ => Value::Missing(out),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "TRUE" | "true" | "True" | "T" => Some(true),
        "FALSE" | "false" | "False" | "F" => Some(false),
        _ => None,
    }
}

/// Converts one cell; unparseable text becomes missing.
/// Truncates toward zero; `None` for NaN and values outside `i64`.
fn real_to_integer(x: f64) -> Option<i64> {
    // 2^63; every finite f64 below it truncates into range
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let t = x.trunc();
    (t >= -LIMIT && t < LIMIT).then_some(t as i64)
}

fn cast_value(v: Value, to: DataType) -> Value {
    if v.data_type() == to {
        return v;
    }
    let converted = match (&v, to) {
        (Value::Missing(_), _) => None,
        (_, DataType::Text) => Some(Value::Text(v.to_string())),
        (Value::Boolean(b), DataType::Integer) => Some(Value::Integer(i64::from(*b))),
        (Value::Boolean(b), DataType::Real) => Some(Value::Real(if *b { 1.0 } else { 0.0 })),
        (Value::Integer(i), DataType::Real) => Some(Value::Real(*i as f64)),
        (Value::Real(x), DataType::Integer) => real_to_integer(*x).map(Value::Integer),
        (Value::Integer(i), DataType::Boolean) => Some(Value::Boolean(*i != 0)),
        (Value::Real(x), DataType::Boolean) if !x.is_nan() => Some(Value::Boolean(*x != 0.0)),
        (Value::Text(s), DataType::Integer) => s.trim().parse().ok().map(Value::Integer),
        (Value::Text(s), DataType::Real) => s.trim().parse().ok().map(Value::Real),
        (Value::Text(s), DataType::Boolean) => parse_bool(s).map(Value::Boolean),
        (Value::Text(s), DataType::Date) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .map(Value::Date),
        _ => None,
    };
    converted.unwrap_or(Value::Missing(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> DataFrame {
        DataFrame::from_columns(vec![
            ("age", Column::integers(vec![Some(34), None, Some(61), Some(19)])),
            ("income", Column::reals(vec![Some(52.5), Some(40.0), None, Some(12.0)])),
            ("voted", Column::booleans(vec![Some(true), Some(false), None, Some(true)])),
            ("party", Column::texts(vec![Some("D"), Some("R"), Some("I"), None])),
        ])
        .expect("valid frame")
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let df = survey();
        let out = (col("age") + lit(1)).evaluate(&df).unwrap();
        assert_eq!(out.data_type(), DataType::Integer);
        assert_eq!(out.get(0), Value::Integer(35));
        assert!(out.is_missing(1));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_real() {
        let df = survey();
        let out = (col("age") * col("income")).evaluate(&df).unwrap();
        assert_eq!(out.data_type(), DataType::Real);
        assert_eq!(out.get(3), Value::Real(228.0));
        assert!(out.is_missing(1));
        assert!(out.is_missing(2));
    }

    #[test]
    fn integer_overflow_is_missing() {
        let df = survey();
        let out = (col("age") * lit(i64::MAX)).evaluate(&df).unwrap();
        assert!(out.is_missing(0));
    }

    #[test]
    fn arithmetic_on_text_is_type_mismatch() {
        let err = (col("party") + lit(1)).evaluate(&survey()).unwrap_err();
        assert!(matches!(
            err,
            TidyError::TypeMismatch {
                found: DataType::Text,
                ..
            }
        ));
    }

    #[test]
    fn comparisons_propagate_missing() {
        let df = survey();
        let out = col("party").equals(lit("D")).evaluate(&df).unwrap();
        assert_eq!(out.get(0), Value::Boolean(true));
        assert_eq!(out.get(1), Value::Boolean(false));
        assert!(out.is_missing(3));

        assert!(col("party").gt(lit(3)).evaluate(&df).is_err());
    }

    #[test]
    fn boolean_logic_is_strict() {
        let df = survey();
        let out = col("voted").and(lit(false)).evaluate(&df).unwrap();
        assert_eq!(out.get(0), Value::Boolean(false));
        assert!(out.is_missing(2));
    }

    #[test]
    fn missing_aware_helpers() {
        let df = survey();
        let flags = col("income").is_missing().evaluate(&df).unwrap();
        assert_eq!(flags.missing_count(), 0);
        assert_eq!(flags.get(2), Value::Boolean(true));

        let filled = col("income").coalesce(lit(0.0)).evaluate(&df).unwrap();
        assert_eq!(filled.get(2), Value::Real(0.0));

        // coalesce does not promote integer to real
        assert!(col("income").coalesce(lit(0)).evaluate(&df).is_err());
    }

    #[test]
    fn when_keeps_branch_type_for_missing_condition() {
        let df = survey();
        let out = when(col("voted"), lit(1), lit(0)).evaluate(&df).unwrap();
        assert_eq!(out.data_type(), DataType::Integer);
        assert_eq!(out.get(2), Value::Missing(DataType::Integer));

        let out = when(col("voted"), col("party"), missing(DataType::Null))
            .evaluate(&df)
            .unwrap();
        assert_eq!(out.data_type(), DataType::Text);
        assert_eq!(out.get(1), Value::Missing(DataType::Text));
    }

    #[test]
    fn when_rejects_mixed_branches() {
        let err = when(col("voted"), lit(1), lit("no")).evaluate(&survey()).unwrap_err();
        assert!(matches!(err, TidyError::TypeMismatch { .. }));
        let err = when(col("age"), lit(1), lit(0)).evaluate(&survey()).unwrap_err();
        assert!(matches!(err, TidyError::TypeMismatch { .. }));
    }

    #[test]
    fn explicit_casts() {
        let df = survey();
        let as_int = col("voted").cast(DataType::Integer).evaluate(&df).unwrap();
        assert_eq!(as_int.get(0), Value::Integer(1));
        assert_eq!(as_int.get(1), Value::Integer(0));
        assert!(as_int.is_missing(2));

        let text = DataFrame::from_columns(vec![(
            "raw",
            Column::texts(vec![Some("12"), Some("n/a"), Some("2016-11-08")]),
        )])
        .unwrap();
        let parsed = col("raw").cast(DataType::Integer).evaluate(&text).unwrap();
        assert_eq!(parsed.get(0), Value::Integer(12));
        assert!(parsed.is_missing(1));
        let dates = col("raw").cast(DataType::Date).evaluate(&text).unwrap();
        assert_eq!(dates.missing_count(), 2);

        assert!(col("party").cast(DataType::Date).evaluate(&df).is_ok());
        let dates_df = DataFrame::from_columns(vec![(
            "d",
            Column::dates(vec![NaiveDate::from_ymd_opt(2016, 11, 8)]),
        )])
        .unwrap();
        assert!(col("d").cast(DataType::Integer).evaluate(&dates_df).is_err());
    }

    #[test]
    fn real_to_integer_out_of_range_is_missing() {
        let df = DataFrame::from_columns(vec![(
            "x",
            Column::reals(vec![
                Some(-2.7),
                Some(1e20),
                Some(-1e20),
                Some(f64::NAN),
                Some(f64::INFINITY),
                Some(-9_223_372_036_854_775_808.0),
            ]),
        )])
        .unwrap();
        let out = col("x").cast(DataType::Integer).evaluate(&df).unwrap();
        assert_eq!(out.get(0), Value::Integer(-2));
        assert_eq!(out.get(1), Value::Missing(DataType::Integer));
        assert!(out.is_missing(2));
        assert!(out.is_missing(3));
        assert!(out.is_missing(4));
        assert_eq!(out.get(5), Value::Integer(i64::MIN));
        assert!(lit(1e20).cast(DataType::Integer).evaluate(&df).unwrap().is_missing(0));
    }

    #[test]
    fn date_difference_in_days() {
        let df = DataFrame::from_columns(vec![
            ("start", Column::dates(vec![NaiveDate::from_ymd_opt(2016, 10, 31)])),
            ("end", Column::dates(vec![NaiveDate::from_ymd_opt(2016, 11, 8)])),
        ])
        .unwrap();
        let days = (col("end") - col("start")).evaluate(&df).unwrap();
        assert_eq!(days.get(0), Value::Integer(8));
    }

    #[test]
    fn unary_math() {
        let df = survey();
        let out = col("income").ln().evaluate(&df).unwrap();
        assert!((out.numeric_at(1).unwrap() - 40f64.ln()).abs() < 1e-12);
        let neg = (-col("age")).evaluate(&df).unwrap();
        assert_eq!(neg.get(0), Value::Integer(-34));
        assert!((!col("age")).evaluate(&df).is_err());
    }

    #[test]
    fn literal_on_empty_frame() {
        let df = survey().head(0);
        let out = lit(1.5).evaluate(&df).unwrap();
        assert_eq!(out.len(), 0);
        assert_eq!(out.data_type(), DataType::Real);
    }
}
