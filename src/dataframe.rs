//! Column-major, immutable DataFrame.
//!
//! The [`DataFrame`] stores named, typed columns. Each column keeps its
//! values in a dense array next to a compact [`ValidityBitmap`]; a cleared
//! bit is that column's missing marker. Operations never modify a frame in
//! place: [`select`](DataFrame::select), [`filter`](DataFrame::filter),
//! [`derive`](DataFrame::derive) and every transform in [`ops`](crate::ops),
//! [`reshape`](crate::reshape) and [`join`](crate::join) return a new frame.
//!
//! # Column Types
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Integer`](Column::Integer) | `Vec<i64>` + bitmap | Counts, identifiers |
//! | [`Real`](Column::Real) | `Vec<f64>` + bitmap | Measurements |
//! | [`Boolean`](Column::Boolean) | `Vec<bool>` + bitmap | Flags, predicates |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | Strings and categories |
//! | [`Date`](Column::Date) | `Vec<NaiveDate>` + bitmap | Calendar dates |
//! | [`Null`](Column::Null) | bitmap only | Untyped all-missing column |
//!
//! # Example
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::expr::{col, lit};
//!
//! let df = DataFrame::from_columns(vec![
//!     ("state", Column::texts(vec![Some("OH"), Some("PA"), None])),
//!     ("margin", Column::reals(vec![Some(8.1), None, Some(-0.7)])),
//! ])
//! .unwrap();
//!
//! assert_eq!(df.count_missing("margin").unwrap(), 1);
//! let positive = df.filter(&col("margin").gt(lit(0.0))).unwrap();
//! assert_eq!(positive.row_count(), 1); // missing margin is excluded
//! ```

use std::fmt;

use chrono::NaiveDate;

use crate::error::{Result, TidyError};
use crate::expr::Expr;
use crate::value::{DataType, Value};

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row holds a value (1) or
/// the missing marker (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_missing(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap with room for `capacity` rows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity.div_ceil(64)),
            len: 0,
        }
    }

    /// Returns `true` if the value at `idx` is present.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_missing(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        self.bits[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// Appends a new position.
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        if idx / 64 >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[idx / 64] |= 1u64 << (idx % 64);
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of missing positions.
    pub fn missing_count(&self) -> usize {
        let valid: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid
    }

    /// Counts the number of present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.missing_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with a validity bitmap for missing values.
///
/// Missing positions hold a placeholder value (0, 0.0, false, empty string
/// or `NaiveDate::MIN`) that is never observed through the public API.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer {
        values: Vec<i64>,
        validity: ValidityBitmap,
    },
    Real {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    Boolean {
        values: Vec<bool>,
        validity: ValidityBitmap,
    },
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
    Date {
        values: Vec<NaiveDate>,
        validity: ValidityBitmap,
    },
    /// Every cell missing; no domain type declared.
    Null { validity: ValidityBitmap },
}

fn from_options<T>(items: Vec<Option<T>>, placeholder: T) -> (Vec<T>, ValidityBitmap)
where
    T: Clone,
{
    let mut validity = ValidityBitmap::with_capacity(items.len());
    let values = items
        .into_iter()
        .map(|item| {
            validity.push(item.is_some());
            item.unwrap_or_else(|| placeholder.clone())
        })
        .collect();
    (values, validity)
}

fn gather<T: Clone>(
    values: &[T],
    validity: &ValidityBitmap,
    indices: &[Option<usize>],
    placeholder: T,
) -> (Vec<T>, ValidityBitmap) {
    let mut out_validity = ValidityBitmap::with_capacity(indices.len());
    let out = indices
        .iter()
        .map(|idx| match idx {
            Some(i) if validity.is_valid(*i) => {
                out_validity.push(true);
                values[*i].clone()
            }
            _ => {
                out_validity.push(false);
                placeholder.clone()
            }
        })
        .collect();
    (out, out_validity)
}

fn check_lengths(values: usize, validity: &ValidityBitmap) -> Result<()> {
    if values == validity.len() {
        Ok(())
    } else {
        Err(TidyError::DimensionMismatch {
            expected: validity.len(),
            actual: values,
        })
    }
}

impl Column {
    /// Creates an integer column from dense values and a validity bitmap.
    ///
    /// Fails with [`TidyError::DimensionMismatch`] unless both have the same
    /// length; the same holds for the other dense constructors.
    pub fn integer(values: Vec<i64>, validity: ValidityBitmap) -> Result<Self> {
        check_lengths(values.len(), &validity)?;
        Ok(Self::Integer { values, validity })
    }

    /// Creates a real column from dense values and a validity bitmap.
    pub fn real(values: Vec<f64>, validity: ValidityBitmap) -> Result<Self> {
        check_lengths(values.len(), &validity)?;
        Ok(Self::Real { values, validity })
    }

    pub fn boolean(values: Vec<bool>, validity: ValidityBitmap) -> Result<Self> {
        check_lengths(values.len(), &validity)?;
        Ok(Self::Boolean { values, validity })
    }

    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Result<Self> {
        check_lengths(values.len(), &validity)?;
        Ok(Self::Text { values, validity })
    }

    pub fn date(values: Vec<NaiveDate>, validity: ValidityBitmap) -> Result<Self> {
        check_lengths(values.len(), &validity)?;
        Ok(Self::Date { values, validity })
    }

    /// Creates an integer column from optional values (`None` is missing).
    pub fn integers(items: Vec<Option<i64>>) -> Self {
        let (values, validity) = from_options(items, 0);
        Self::Integer { values, validity }
    }

    /// Creates a real column from optional values (`None` is missing).
    pub fn reals(items: Vec<Option<f64>>) -> Self {
        let (values, validity) = from_options(items, 0.0);
        Self::Real { values, validity }
    }

    /// Creates a boolean column from optional values (`None` is missing).
    pub fn booleans(items: Vec<Option<bool>>) -> Self {
        let (values, validity) = from_options(items, false);
        Self::Boolean { values, validity }
    }

    /// Creates a text column from optional values (`None` is missing).
    pub fn texts<S: Into<String>>(items: Vec<Option<S>>) -> Self {
        let items = items.into_iter().map(|s| s.map(Into::into)).collect();
        let (values, validity) = from_options(items, String::new());
        Self::Text { values, validity }
    }

    /// Creates a date column from optional values (`None` is missing).
    pub fn dates(items: Vec<Option<NaiveDate>>) -> Self {
        let (values, validity) = from_options(items, NaiveDate::MIN);
        Self::Date { values, validity }
    }

    /// Creates a column of `len` missing markers of type `dtype`.
    pub fn missing(dtype: DataType, len: usize) -> Self {
        let validity = ValidityBitmap::all_missing(len);
        match dtype {
            DataType::Integer => Self::Integer {
                values: vec![0; len],
                validity,
            },
            DataType::Real => Self::Real {
                values: vec![0.0; len],
                validity,
            },
            DataType::Boolean => Self::Boolean {
                values: vec![false; len],
                validity,
            },
            DataType::Text => Self::Text {
                values: vec![String::new(); len],
                validity,
            },
            DataType::Date => Self::Date {
                values: vec![NaiveDate::MIN; len],
                validity,
            },
            DataType::Null => Self::Null { validity },
        }
    }

    /// Creates a column of type `dtype` from cell values.
    ///
    /// Any missing marker is accepted and stored as this column's missing
    /// marker. A present value of another type fails with
    /// [`TidyError::TypeMismatch`]; integers are not promoted to reals.
    pub fn from_values(dtype: DataType, items: Vec<Value>) -> Result<Self> {
        let mismatch = |v: &Value| {
            TidyError::type_mismatch("column construction", dtype.to_string(), v.data_type())
        };
        macro_rules! build {
            ($variant:ident, $placeholder:expr) => {{
                let mut opts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::$variant(v) => opts.push(Some(v)),
                        Value::Missing(_) => opts.push(None),
                        other => return Err(mismatch(&other)),
                    }
                }
                let (values, validity) = from_options(opts, $placeholder);
                Self::$variant { values, validity }
            }};
        }
        let column = match dtype {
            DataType::Integer => build!(Integer, 0),
            DataType::Real => build!(Real, 0.0),
            DataType::Boolean => build!(Boolean, false),
            DataType::Text => build!(Text, String::new()),
            DataType::Date => build!(Date, NaiveDate::MIN),
            DataType::Null => {
                if let Some(present) = items.iter().find(|v| !v.is_missing()) {
                    return Err(mismatch(present));
                }
                Self::Null {
                    validity: ValidityBitmap::all_missing(items.len()),
                }
            }
        };
        Ok(column)
    }

    /// Returns the data type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer { .. } => DataType::Integer,
            Self::Real { .. } => DataType::Real,
            Self::Boolean { .. } => DataType::Boolean,
            Self::Text { .. } => DataType::Text,
            Self::Date { .. } => DataType::Date,
            Self::Null { .. } => DataType::Null,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the dense value array; `None` for a Null column.
    fn value_count(&self) -> Option<usize> {
        match self {
            Self::Integer { values, .. } => Some(values.len()),
            Self::Real { values, .. } => Some(values.len()),
            Self::Boolean { values, .. } => Some(values.len()),
            Self::Text { values, .. } => Some(values.len()),
            Self::Date { values, .. } => Some(values.len()),
            Self::Null { .. } => None,
        }
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Integer { validity, .. }
            | Self::Real { validity, .. }
            | Self::Boolean { validity, .. }
            | Self::Text { validity, .. }
            | Self::Date { validity, .. }
            | Self::Null { validity } => validity,
        }
    }

    /// Returns the number of missing values.
    pub fn missing_count(&self) -> usize {
        self.validity().missing_count()
    }

    /// Returns `true` if the value at `idx` is missing.
    #[inline]
    pub fn is_missing(&self, idx: usize) -> bool {
        !self.validity().is_valid(idx)
    }

    /// Returns the cell at `idx`, or the typed missing marker.
    pub fn get(&self, idx: usize) -> Value {
        if self.is_missing(idx) {
            return Value::Missing(self.data_type());
        }
        match self {
            Self::Integer { values, .. } => Value::Integer(values[idx]),
            Self::Real { values, .. } => Value::Real(values[idx]),
            Self::Boolean { values, .. } => Value::Boolean(values[idx]),
            Self::Text { values, .. } => Value::Text(values[idx].clone()),
            Self::Date { values, .. } => Value::Date(values[idx]),
            Self::Null { .. } => Value::Missing(DataType::Null),
        }
    }

    /// Returns the numeric cell at `idx` as `f64`.
    ///
    /// `None` for missing cells and for non-numeric columns.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        if self.is_missing(idx) {
            return None;
        }
        match self {
            Self::Integer { values, .. } => Some(values[idx] as f64),
            Self::Real { values, .. } => Some(values[idx]),
            _ => None,
        }
    }

    /// Returns the text cell at `idx`.
    pub fn text_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Text { values, validity } if validity.is_valid(idx) => Some(&values[idx]),
            _ => None,
        }
    }

    /// Iterates over all cells in row order.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Builds a new column by gathering rows.
    ///
    /// `None` entries produce this column's missing marker.
    pub fn take(&self, indices: &[Option<usize>]) -> Self {
        match self {
            Self::Integer { values, validity } => {
                let (values, validity) = gather(values, validity, indices, 0);
                Self::Integer { values, validity }
            }
            Self::Real { values, validity } => {
                let (values, validity) = gather(values, validity, indices, 0.0);
                Self::Real { values, validity }
            }
            Self::Boolean { values, validity } => {
                let (values, validity) = gather(values, validity, indices, false);
                Self::Boolean { values, validity }
            }
            Self::Text { values, validity } => {
                let (values, validity) = gather(values, validity, indices, String::new());
                Self::Text { values, validity }
            }
            Self::Date { values, validity } => {
                let (values, validity) = gather(values, validity, indices, NaiveDate::MIN);
                Self::Date { values, validity }
            }
            Self::Null { .. } => Self::Null {
                validity: ValidityBitmap::all_missing(indices.len()),
            },
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// Names are unique and every column has exactly [`row_count`](Self::row_count)
/// entries. Columns are attached only while building the frame; every
/// operation afterwards returns a new, independently owned frame.
///
/// ```
/// use u_tidy::dataframe::{Column, DataFrame};
/// use u_tidy::value::DataType;
///
/// let mut df = DataFrame::new();
/// df.add_column("x", Column::integers(vec![Some(1), Some(2), None])).unwrap();
/// df.add_column("label", Column::texts(vec![Some("a"), Some("b"), Some("c")])).unwrap();
///
/// assert_eq!(df.row_count(), 3);
/// assert_eq!(df.schema(), vec![("x", DataType::Integer), ("label", DataType::Text)]);
/// assert!(df.add_column("x", Column::integers(vec![None, None, None])).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self::with_rows(0)
    }

    /// Creates a DataFrame with no columns and a fixed row count.
    pub(crate) fn with_rows(row_count: usize) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count,
        }
    }

    /// Builds a DataFrame from named columns.
    pub fn from_columns<N, I>(columns: I) -> Result<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Column)>,
    {
        let mut df = Self::new();
        for (name, column) in columns {
            df.add_column(name, column)?;
        }
        Ok(df)
    }

    /// Adds a named column to the DataFrame being built.
    ///
    /// Returns an error if the name is taken, the column's values and
    /// bitmap differ in length, or the column length doesn't match the
    /// existing row count (unless this is the first column).
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(TidyError::DuplicateColumn { name });
        }
        if let Some(values) = column.value_count() {
            check_lengths(values, column.validity())?;
        }
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(TidyError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns the index of the column with the given `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns the column with the given `name`.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.column_index(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TidyError::column_not_found(name))
    }

    /// Returns the column at `index`.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the cell at (`row`, `name`).
    pub fn value(&self, row: usize, name: &str) -> Result<Value> {
        let column = self.column(name)?;
        if row >= self.row_count {
            return Err(TidyError::InvalidParameter {
                name: "row".into(),
                message: format!("{row} out of bounds for {} rows", self.row_count),
            });
        }
        Ok(column.get(row))
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Returns a summary of column data types.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(name, col)| (name, col.data_type())).collect()
    }

    /// Returns the type of the named column.
    pub fn data_type(&self, name: &str) -> Result<DataType> {
        self.column(name).map(Column::data_type)
    }

    /// Returns the total number of missing values across all columns.
    pub fn total_missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Returns a new DataFrame with only the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let mut out = Self::with_rows(self.row_count);
        for &name in columns {
            out.add_column(name, self.column(name)?.clone())?;
        }
        Ok(out)
    }

    /// Returns the rows for which `predicate` is true.
    ///
    /// The predicate must be boolean. Rows where it evaluates to missing are
    /// excluded. Kept rows preserve their original order.
    pub fn filter(&self, predicate: &Expr) -> Result<Self> {
        let mask = predicate.evaluate(self)?;
        let keep: Vec<Option<usize>> = match &mask {
            Column::Boolean { values, validity } => (0..self.row_count)
                .filter(|&i| validity.is_valid(i) && values[i])
                .map(Some)
                .collect(),
            Column::Null { .. } => Vec::new(),
            other => {
                return Err(TidyError::type_mismatch(
                    "filter predicate",
                    "Boolean",
                    other.data_type(),
                ))
            }
        };
        log::debug!("filter: kept {} of {} rows", keep.len(), self.row_count);
        Ok(self.take(&keep))
    }

    /// Adds or overwrites column `name` with the result of `expression`.
    ///
    /// An existing column keeps its position; a new column is appended.
    pub fn derive(&self, name: &str, expression: &Expr) -> Result<Self> {
        let column = expression.evaluate(self)?;
        let mut out = self.clone();
        match out.column_index(name) {
            Some(i) => out.columns[i] = column,
            None => out.add_column(name, column)?,
        }
        Ok(out)
    }

    /// Number of rows where `column` holds the missing marker.
    pub fn count_missing(&self, column: &str) -> Result<usize> {
        Ok(self.column(column)?.missing_count())
    }

    /// Fraction of rows where `column` holds the missing marker.
    ///
    /// Returns `NaN` for a DataFrame with zero rows, since the proportion is
    /// undefined there.
    pub fn proportion_missing(&self, column: &str) -> Result<f64> {
        let missing = self.count_missing(column)?;
        if self.row_count == 0 {
            return Ok(f64::NAN);
        }
        Ok(missing as f64 / self.row_count as f64)
    }

    /// Returns a copy with column `from` renamed to `to`.
    pub fn rename(&self, from: &str, to: &str) -> Result<Self> {
        let idx = self
            .column_index(from)
            .ok_or_else(|| TidyError::column_not_found(from))?;
        if from != to && self.column_index(to).is_some() {
            return Err(TidyError::DuplicateColumn { name: to.into() });
        }
        let mut out = self.clone();
        out.names[idx] = to.to_string();
        Ok(out)
    }

    /// Returns the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let rows: Vec<Option<usize>> = (0..n.min(self.row_count)).map(Some).collect();
        self.take(&rows)
    }

    /// Builds a new DataFrame by gathering rows; `None` produces a row of
    /// missing markers.
    pub fn take(&self, rows: &[Option<usize>]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Stacks `other` below this DataFrame.
    ///
    /// Columns are matched by name. Columns present on only one side are
    /// filled with missing markers for the other side's rows. Types must
    /// agree; an untyped [`Null`](Column::Null) column adopts the other
    /// side's type.
    pub fn bind_rows(&self, other: &DataFrame) -> Result<Self> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        for name in &other.names {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        let mut out = Self::with_rows(self.row_count + other.row_count);
        for name in names {
            let top = self.column(name).ok();
            let bottom = other.column(name).ok();
            let top_type = top.map_or(DataType::Null, Column::data_type);
            let bottom_type = bottom.map_or(DataType::Null, Column::data_type);
            let dtype = top_type.unify_strict(bottom_type).ok_or_else(|| {
                TidyError::type_mismatch(format!("bind_rows column '{name}'"), top_type.to_string(), bottom_type)
            })?;

            let mut cells = Vec::with_capacity(out.row_count);
            match top {
                Some(c) => cells.extend(c.iter()),
                None => cells.extend((0..self.row_count).map(|_| Value::Missing(dtype))),
            }
            match bottom {
                Some(c) => cells.extend(c.iter()),
                None => cells.extend((0..other.row_count).map(|_| Value::Missing(dtype))),
            }
            out.add_column(name, Column::from_values(dtype, cells)?)?;
        }
        log::debug!(
            "bind_rows: {} + {} rows -> {} columns",
            self.row_count,
            other.row_count,
            out.column_count()
        );
        Ok(out)
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

const DISPLAY_ROWS: usize = 20;

fn type_abbrev(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Integer => "<int>",
        DataType::Real => "<dbl>",
        DataType::Boolean => "<lgl>",
        DataType::Text => "<chr>",
        DataType::Date => "<date>",
        DataType::Null => "<null>",
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    label_width: usize,
    widths: &[usize],
    label: &str,
    items: &[&str],
) -> fmt::Result {
    write!(f, "{label:>label_width$}")?;
    for (item, width) in items.iter().zip(widths) {
        write!(f, " {item:>width$}")?;
    }
    writeln!(f)
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# A data frame: {} x {}", self.row_count, self.column_count())?;
        let shown = self.row_count.min(DISPLAY_ROWS);

        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| (0..shown).map(|i| c.get(i).to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .iter()
            .zip(&cells)
            .map(|((name, col), cells)| {
                cells
                    .iter()
                    .map(String::len)
                    .chain([name.len(), type_abbrev(col.data_type()).len()])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let label_width = shown.to_string().len();
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        write_row(f, label_width, &widths, "", &names)?;
        let types: Vec<&str> = self.columns.iter().map(|c| type_abbrev(c.data_type())).collect();
        write_row(f, label_width, &widths, "", &types)?;
        for row in 0..shown {
            let items: Vec<&str> = cells.iter().map(|c| c[row].as_str()).collect();
            write_row(f, label_width, &widths, &(row + 1).to_string(), &items)?;
        }
        if self.row_count > shown {
            writeln!(f, "# ... with {} more rows", self.row_count - shown)?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
