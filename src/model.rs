//! Linear regression over DataFrame columns.
//!
//! [`LinearModel::fit`] estimates an ordinary least squares model from a
//! response column and predictor columns and returns an immutable
//! [`LinearFit`]. A fit can then predict on new frames, report residuals and
//! coefficients, or be joined back onto its data with
//! [`augment`](LinearFit::augment).
//!
//! Rows with a missing response or predictor are excluded before fitting;
//! [`row_indices`](LinearFit::row_indices) records which source rows were
//! used, and residuals and fitted values align with those rows only.
//!
//! Text predictors are treatment coded: the first level in sorted order is
//! the baseline and every other level gets an indicator column named
//! `<column><level>`.
//!
//! ```
//! use u_tidy::dataframe::{Column, DataFrame};
//! use u_tidy::model::{FitConfig, LinearModel};
//!
//! let df = DataFrame::from_columns(vec![
//!     ("x", Column::reals(vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)])),
//!     ("y", Column::reals(vec![Some(5.0), Some(8.0), Some(9.0), Some(14.0), Some(17.0)])),
//! ])
//! .unwrap();
//!
//! let fit = LinearModel::fit(&df, "y", &["x"], &FitConfig::default()).unwrap();
//! assert_eq!(fit.residuals().len(), 4);
//! assert!((fit.coefficient("x").unwrap() - 3.0).abs() < 1e-9);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use u_numflow::matrix::Matrix;
use u_numflow::{special, stats};

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::value::DataType;

const INTERCEPT: &str = "(Intercept)";

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for [`LinearModel::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Include an intercept term. Default: true.
    pub intercept: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self { intercept: true }
    }
}

impl FitConfig {
    /// Creates a config with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether an intercept term is estimated.
    pub fn intercept(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }
}

// ── Design ────────────────────────────────────────────────────────────

/// How one predictor column expands into design-matrix columns.
#[derive(Debug, Clone, PartialEq)]
enum Term {
    Numeric { column: String },
    /// `levels[0]` is the baseline.
    Categorical { column: String, levels: Vec<String> },
}

impl Term {
    fn column(&self) -> &str {
        match self {
            Self::Numeric { column } | Self::Categorical { column, .. } => column,
        }
    }

    fn coefficient_names(&self) -> Vec<String> {
        match self {
            Self::Numeric { column } => vec![column.clone()],
            Self::Categorical { column, levels } => {
                levels.iter().skip(1).map(|l| format!("{column}{l}")).collect()
            }
        }
    }

    /// Appends this term's design values for `row`. Returns `Ok(false)` when
    /// the cell is missing.
    fn encode(&self, column: &Column, row: usize, out: &mut Vec<f64>) -> Result<bool> {
        match self {
            Self::Numeric { .. } => match column.numeric_at(row) {
                Some(v) => {
                    out.push(v);
                    Ok(true)
                }
                None => Ok(false),
            },
            Self::Categorical { column: name, levels } => {
                let Some(level) = column.text_at(row) else {
                    return Ok(false);
                };
                let position = levels.iter().position(|l| l == level).ok_or_else(|| {
                    TidyError::UnknownLevel {
                        column: name.clone(),
                        level: level.to_string(),
                    }
                })?;
                out.extend((1..levels.len()).map(|i| if i == position { 1.0 } else { 0.0 }));
                Ok(true)
            }
        }
    }

    fn check_type(&self, column: &Column) -> Result<()> {
        let found = column.data_type();
        match self {
            Self::Numeric { column: name } if !found.is_numeric() && found != DataType::Null => Err(
                TidyError::type_mismatch(format!("predictor '{name}'"), "numeric", found),
            ),
            Self::Categorical { column: name, .. } if !matches!(found, DataType::Text | DataType::Null) => Err(
                TidyError::type_mismatch(format!("predictor '{name}'"), "Text", found),
            ),
            _ => Ok(()),
        }
    }
}

/// Design row for `row`, or `None` if any predictor is missing.
fn design_row(
    terms: &[Term],
    columns: &[&Column],
    intercept: bool,
    row: usize,
) -> Result<Option<Vec<f64>>> {
    let mut out = Vec::new();
    if intercept {
        out.push(1.0);
    }
    for (term, column) in terms.iter().zip(columns) {
        if !term.encode(column, row, &mut out)? {
            return Ok(None);
        }
    }
    Ok(Some(out))
}

// ── Fitting ───────────────────────────────────────────────────────────

/// Ordinary least squares estimator.
#[derive(Debug, Clone, Copy)]
pub struct LinearModel;

impl LinearModel {
    /// Fits `response ~ predictors` on the complete rows of `df`.
    ///
    /// # Errors
    ///
    /// - [`TidyError::TypeMismatch`] if the response is not numeric or a
    ///   predictor is neither numeric nor text.
    /// - [`TidyError::InsufficientData`] if fewer complete rows remain than
    ///   parameters to estimate.
    /// - [`TidyError::SingularMatrix`] if the design is rank deficient.
    /// - [`TidyError::InvalidParameter`] if a used value is not finite.
    pub fn fit(
        df: &DataFrame,
        response: &str,
        predictors: &[&str],
        config: &FitConfig,
    ) -> Result<LinearFit> {
        let y_column = df.column(response)?;
        let y_type = y_column.data_type();
        if !y_type.is_numeric() && y_type != DataType::Null {
            return Err(TidyError::type_mismatch(
                format!("response '{response}'"),
                "numeric",
                y_type,
            ));
        }

        let x_columns: Vec<&Column> = predictors
            .iter()
            .map(|p| df.column(p))
            .collect::<Result<_>>()?;
        for (name, column) in predictors.iter().zip(&x_columns) {
            let t = column.data_type();
            if !(t.is_numeric() || matches!(t, DataType::Text | DataType::Null)) {
                return Err(TidyError::type_mismatch(
                    format!("predictor '{name}'"),
                    "numeric or Text",
                    t,
                ));
            }
        }

        let rows: Vec<usize> = (0..df.row_count())
            .filter(|&r| !y_column.is_missing(r) && x_columns.iter().all(|c| !c.is_missing(r)))
            .collect();
        if rows.len() < df.row_count() {
            log::debug!(
                "lm {response}: excluded {} of {} rows with missing values",
                df.row_count() - rows.len(),
                df.row_count()
            );
        }

        let terms: Vec<Term> = predictors
            .iter()
            .zip(&x_columns)
            .map(|(name, column)| match column.data_type() {
                DataType::Text => {
                    let levels: BTreeSet<&str> =
                        rows.iter().filter_map(|&r| column.text_at(r)).collect();
                    Term::Categorical {
                        column: name.to_string(),
                        levels: levels.into_iter().map(str::to_string).collect(),
                    }
                }
                _ => Term::Numeric {
                    column: name.to_string(),
                },
            })
            .collect();

        let mut names = Vec::new();
        if config.intercept {
            names.push(INTERCEPT.to_string());
        }
        for term in &terms {
            names.extend(term.coefficient_names());
        }
        let p = names.len();
        if p == 0 {
            return Err(TidyError::InvalidParameter {
                name: "predictors".into(),
                message: "a model without intercept needs at least one predictor".into(),
            });
        }
        let constant = terms
            .iter()
            .find(|t| matches!(t, Term::Categorical { levels, .. } if levels.len() < 2));
        if let (Some(term), false) = (constant, rows.is_empty()) {
            return Err(TidyError::SingularMatrix {
                reason: format!("predictor '{}' has fewer than two levels", term.column()),
            });
        }
        if rows.len() < p {
            return Err(TidyError::InsufficientData {
                min_required: p,
                actual: rows.len(),
            });
        }

        let mut z = Vec::with_capacity(rows.len());
        let mut y = Vec::with_capacity(rows.len());
        for &r in &rows {
            if let Some(design) = design_row(&terms, &x_columns, false, r)? {
                z.push(design);
            }
            y.push(y_column.numeric_at(r).unwrap_or(f64::NAN));
        }
        if z.iter().flatten().chain(&y).any(|v| !v.is_finite()) {
            return Err(TidyError::InvalidParameter {
                name: "data".into(),
                message: "response and predictors must be finite".into(),
            });
        }
        log::trace!("lm {response}: design matrix {} x {p}", z.len());

        let predictor_names = &names[usize::from(config.intercept)..];
        let ols = solve_ols(&z, &y, config.intercept, predictor_names)?;
        let n = rows.len();
        let df_resid = n - p;

        let fitted = ols.fitted;
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(yi, fi)| yi - fi).collect();
        let rss: f64 = residuals.iter().map(|r| r * r).sum();
        let tss: f64 = if config.intercept {
            let y_mean = stats::mean(&y).unwrap_or(f64::NAN);
            y.iter().map(|v| (v - y_mean).powi(2)).sum()
        } else {
            y.iter().map(|v| v * v).sum()
        };

        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
        let (sigma, adj_r_squared) = if df_resid > 0 {
            let baseline = n - usize::from(config.intercept);
            (
                (rss / df_resid as f64).sqrt(),
                1.0 - (1.0 - r_squared) * baseline as f64 / df_resid as f64,
            )
        } else {
            (f64::NAN, f64::NAN)
        };
        let std_errors: Vec<f64> = ols
            .unscaled_variances
            .iter()
            .map(|v| (sigma * sigma * v).sqrt())
            .collect();
        let t_values: Vec<f64> = ols
            .coefficients
            .iter()
            .zip(&std_errors)
            .map(|(b, se)| b / se)
            .collect();
        let p_values = t_values
            .iter()
            .map(|t| {
                if df_resid > 0 {
                    2.0 * (1.0 - special::t_distribution_cdf(t.abs(), df_resid as f64))
                } else {
                    f64::NAN
                }
            })
            .collect();

        log::debug!("lm {response}: {n} rows, {p} parameters, R² = {r_squared:.4}");

        Ok(LinearFit {
            response: response.to_string(),
            intercept: config.intercept,
            terms,
            names,
            coefficients: ols.coefficients,
            std_errors,
            t_values,
            p_values,
            vif: ols.vif,
            fitted,
            residuals,
            rows,
            source_rows: df.row_count(),
            r_squared,
            adj_r_squared,
            sigma,
        })
    }
}

// ── Fit ───────────────────────────────────────────────────────────────

/// A fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    response: String,
    intercept: bool,
    terms: Vec<Term>,
    names: Vec<String>,
    coefficients: Vec<f64>,
    std_errors: Vec<f64>,
    t_values: Vec<f64>,
    p_values: Vec<f64>,
    vif: Option<Vec<f64>>,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    rows: Vec<usize>,
    source_rows: usize,
    r_squared: f64,
    adj_r_squared: f64,
    sigma: f64,
}

impl LinearFit {
    /// Name of the response column.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Coefficients in design order, starting with `(Intercept)` when the
    /// model has one.
    pub fn coefficients(&self) -> Vec<(String, f64)> {
        self.names
            .iter()
            .cloned()
            .zip(self.coefficients.iter().copied())
            .collect()
    }

    /// Looks up one coefficient by name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.coefficients[i])
    }

    /// Standard errors, aligned with [`coefficients`](Self::coefficients).
    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    /// t statistics, aligned with [`coefficients`](Self::coefficients).
    pub fn t_values(&self) -> &[f64] {
        &self.t_values
    }

    /// Two-sided p values for the t statistics. NaN when there are no
    /// residual degrees of freedom.
    pub fn p_values(&self) -> &[f64] {
        &self.p_values
    }

    /// Variance inflation factor of every non-intercept coefficient.
    ///
    /// `None` for a model without intercept, or when there are no more rows
    /// than predictors.
    pub fn vif(&self) -> Option<Vec<(String, f64)>> {
        let names = &self.names[usize::from(self.intercept)..];
        self.vif
            .as_ref()
            .map(|v| names.iter().cloned().zip(v.iter().copied()).collect())
    }

    /// Residuals for the rows used in fitting.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Fitted values for the rows used in fitting.
    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    /// Source-frame indices of the rows used in fitting.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// Number of rows used in fitting.
    pub fn n_obs(&self) -> usize {
        self.rows.len()
    }

    /// Coefficient of determination.
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn adj_r_squared(&self) -> f64 {
        self.adj_r_squared
    }

    /// Residual standard error. NaN when there are no residual degrees of
    /// freedom.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Predicts the response for every row of `df`.
    ///
    /// Rows with a missing predictor yield `None`.
    ///
    /// # Errors
    ///
    /// - [`TidyError::ColumnNotFound`] if a predictor column is absent.
    /// - [`TidyError::TypeMismatch`] if a predictor changed type.
    /// - [`TidyError::UnknownLevel`] if a text predictor holds a level not
    ///   seen while fitting.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<Option<f64>>> {
        let columns: Vec<&Column> = self
            .terms
            .iter()
            .map(|t| df.column(t.column()))
            .collect::<Result<_>>()?;
        for (term, column) in self.terms.iter().zip(&columns) {
            term.check_type(column)?;
        }
        (0..df.row_count())
            .map(|r| {
                let design = design_row(&self.terms, &columns, self.intercept, r)?;
                Ok(design.map(|x| dot(&x, &self.coefficients)))
            })
            .collect()
    }

    /// Adds `.fitted` and `.resid` columns to the frame the model was fit
    /// on. Rows excluded from fitting hold missing markers.
    pub fn augment(&self, df: &DataFrame) -> Result<DataFrame> {
        if df.row_count() != self.source_rows {
            return Err(TidyError::DimensionMismatch {
                expected: self.source_rows,
                actual: df.row_count(),
            });
        }
        let mut fitted = vec![None; self.source_rows];
        let mut resid = vec![None; self.source_rows];
        for (i, &r) in self.rows.iter().enumerate() {
            fitted[r] = Some(self.fitted[i]);
            resid[r] = Some(self.residuals[i]);
        }
        let mut out = df.clone();
        out.add_column(".fitted", Column::reals(fitted))?;
        out.add_column(".resid", Column::reals(resid))?;
        Ok(out)
    }
}

// ── Linear algebra ────────────────────────────────────────────────────

/// A column whose spread is below this share of its magnitude is constant.
const CONSTANT_TOLERANCE: f64 = 1e-10;
/// Smallest admissible 1 - R² of a predictor on the predictors before it.
const RANK_TOLERANCE: f64 = 1e-10;

struct Ols {
    coefficients: Vec<f64>,
    /// diag((XᵀX)⁻¹), aligned with `coefficients`.
    unscaled_variances: Vec<f64>,
    fitted: Vec<f64>,
    vif: Option<Vec<f64>>,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn singular(reason: impl Into<String>) -> TidyError {
    TidyError::SingularMatrix {
        reason: reason.into(),
    }
}

/// Least squares of `y` on the predictor rows `z`, plus an intercept when
/// `intercept` is set.
///
/// Predictors are centred (with an intercept) and scaled to unit length
/// before the cross-product is factored, so the rank test compares each
/// column with the others rather than with an absolute threshold.
fn solve_ols(z: &[Vec<f64>], y: &[f64], intercept: bool, names: &[String]) -> Result<Ols> {
    let n = y.len();
    let q = names.len();
    let column = |j: usize| -> Vec<f64> { z.iter().map(|row| row[j]).collect() };

    let y_center = if intercept {
        stats::mean(y).unwrap_or(0.0)
    } else {
        0.0
    };
    let mut centers = Vec::with_capacity(q);
    let mut centred: Vec<Vec<f64>> = Vec::with_capacity(q);
    let mut scales = Vec::with_capacity(q);
    for (j, name) in names.iter().enumerate() {
        let raw = column(j);
        let center = if intercept {
            stats::mean(&raw).unwrap_or(0.0)
        } else {
            0.0
        };
        let c: Vec<f64> = raw.iter().map(|v| v - center).collect();
        let magnitude = dot(&raw, &raw).sqrt();
        let scale = dot(&c, &c).sqrt();
        if scale == 0.0 || scale <= CONSTANT_TOLERANCE * magnitude {
            return Err(singular(format!(
                "design column '{name}' is constant among the rows used"
            )));
        }
        centers.push(center);
        centred.push(c);
        scales.push(scale);
    }

    // Correlation-scaled cross-product: unit diagonal.
    let mut cross = vec![0.0; q * q];
    for j in 0..q {
        cross[j * q + j] = 1.0;
        for k in 0..j {
            let v = dot(&centred[j], &centred[k]) / (scales[j] * scales[k]);
            cross[j * q + k] = v;
            cross[k * q + j] = v;
        }
    }
    let y_c: Vec<f64> = y.iter().map(|v| v - y_center).collect();
    let rhs: Vec<f64> = (0..q).map(|j| dot(&centred[j], &y_c) / scales[j]).collect();

    let (gamma, inverse) = if q == 0 {
        (Vec::new(), Matrix::zeros(0, 0))
    } else {
        let s = Matrix::new(q, q, cross).map_err(|e| singular(e.to_string()))?;
        let l = s
            .cholesky()
            .map_err(|_| singular("design columns are linearly dependent"))?;
        if let Some(j) = (0..q).find(|&j| l.get(j, j).powi(2) < RANK_TOLERANCE) {
            return Err(singular(format!(
                "design column '{}' is linearly dependent on earlier columns",
                names[j]
            )));
        }
        let gamma = s.cholesky_solve(&rhs).map_err(|e| singular(e.to_string()))?;
        let inverse = s.inverse().map_err(|e| singular(e.to_string()))?;
        (gamma, inverse)
    };

    let slopes: Vec<f64> = gamma.iter().zip(&scales).map(|(g, s)| g / s).collect();
    let covariance = |j: usize, k: usize| inverse.get(j, k) / (scales[j] * scales[k]);
    let fitted = (0..n)
        .map(|i| y_center + (0..q).map(|j| slopes[j] * centred[j][i]).sum::<f64>())
        .collect();

    let mut coefficients = Vec::with_capacity(q + 1);
    let mut unscaled_variances = Vec::with_capacity(q + 1);
    if intercept {
        coefficients.push(y_center - dot(&slopes, &centers));
        let spread: f64 = (0..q)
            .flat_map(|j| (0..q).map(move |k| (j, k)))
            .map(|(j, k)| centers[j] * covariance(j, k) * centers[k])
            .sum();
        unscaled_variances.push(1.0 / n as f64 + spread);
    }
    coefficients.extend_from_slice(&slopes);
    unscaled_variances.extend((0..q).map(|j| covariance(j, j)));

    // VIF is invariant to centring and scaling.
    let vif = if intercept && q > 0 {
        let standardized: Vec<Vec<f64>> = centred
            .iter()
            .zip(&scales)
            .map(|(c, s)| c.iter().map(|v| v / s).collect())
            .collect();
        let refs: Vec<&[f64]> = standardized.iter().map(Vec::as_slice).collect();
        u_analytics::regression::vif(&refs)
    } else {
        None
    };

    Ok(Ols {
        coefficients,
        unscaled_variances,
        fitted,
        vif,
    })
}
