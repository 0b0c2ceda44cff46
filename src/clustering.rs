//! K-Means clustering over numeric DataFrame columns.
//!
//! K-Means++ initialization (Arthur & Vassilvitskii, 2007) followed by
//! Lloyd's iterative refinement. The whole procedure is restarted
//! `n_init` times from seeds derived from [`KMeansConfig::seed`] and the run
//! with the lowest within-cluster sum of squares is kept, so results are
//! reproducible for a fixed seed.
//!
//! Rows with a missing value in any feature column are excluded before
//! fitting and receive no label.
//!
//! # Example
//!
//! ```
//! use u_tidy::clustering::{KMeansConfig, KMeansModel};
//! use u_tidy::dataframe::{Column, DataFrame};
//!
//! let df = DataFrame::from_columns(vec![
//!     ("x", Column::reals(vec![Some(1.0), Some(1.5), Some(8.0), Some(8.5), None])),
//!     ("y", Column::reals(vec![Some(1.0), Some(1.5), Some(8.0), Some(8.5), Some(3.0)])),
//! ])
//! .unwrap();
//!
//! let fit = KMeansModel::fit(&df, &["x", "y"], &KMeansConfig::new(2)).unwrap();
//! assert_eq!(fit.labels().len(), 4);
//! assert_eq!(fit.labels()[0], fit.labels()[1]);
//! assert_ne!(fit.labels()[0], fit.labels()[2]);
//! assert!(fit.wcss() < 1.0); // tight clusters
//! ```

use serde::{Deserialize, Serialize};

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, TidyError};
use crate::value::DataType;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for K-Means clustering.
///
/// Only `k` is required when deserializing; every other field falls back to
/// its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Maximum iterations. Default: 300.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Convergence tolerance (centroid movement). Default: 1e-6.
    #[serde(default = "default_tol")]
    pub tol: f64,
    /// Number of random restarts (best result kept). Default: 10.
    #[serde(default = "default_n_init")]
    pub n_init: usize,
    /// Random seed. `None` uses a fixed internal stream. Default: Some(42).
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
}

fn default_max_iter() -> usize {
    300
}

fn default_tol() -> f64 {
    1e-6
}

fn default_n_init() -> usize {
    10
}

fn default_seed() -> Option<u64> {
    Some(42)
}

impl KMeansConfig {
    /// Creates a config for a fixed number of clusters with default parameters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: default_max_iter(),
            tol: default_tol(),
            n_init: default_n_init(),
            seed: default_seed(),
        }
    }

    /// Sets the maximum number of iterations.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the number of random restarts.
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(TidyError::InvalidParameter {
                name: "k".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.n_init == 0 {
            return Err(TidyError::InvalidParameter {
                name: "n_init".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.tol.is_nan() || self.tol < 0.0 {
            return Err(TidyError::InvalidParameter {
                name: "tol".into(),
                message: format!("must be non-negative, got {}", self.tol),
            });
        }
        Ok(())
    }
}

// ── Model ─────────────────────────────────────────────────────────────

/// K-Means estimator.
#[derive(Debug, Clone, Copy)]
pub struct KMeansModel;

impl KMeansModel {
    /// Clusters the complete rows of `df` on the numeric `columns`.
    ///
    /// # Errors
    ///
    /// - [`TidyError::InvalidParameter`] for an invalid config, an empty
    ///   column list or a non-finite feature value.
    /// - [`TidyError::TypeMismatch`] if a feature column is not numeric.
    /// - [`TidyError::InsufficientData`] if fewer complete rows than `k`
    ///   remain.
    pub fn fit(df: &DataFrame, columns: &[&str], config: &KMeansConfig) -> Result<KMeansFit> {
        config.validate()?;
        if columns.is_empty() {
            return Err(TidyError::InvalidParameter {
                name: "columns".into(),
                message: "at least one feature column is required".into(),
            });
        }
        let features = feature_columns(df, columns)?;

        let mut rows = Vec::new();
        let mut data = Vec::new();
        for r in 0..df.row_count() {
            if let Some(point) = point_at(&features, r) {
                if let Some(j) = point.iter().position(|v| !v.is_finite()) {
                    return Err(TidyError::InvalidParameter {
                        name: columns[j].to_string(),
                        message: format!("non-finite value at row {r}"),
                    });
                }
                rows.push(r);
                data.push(point);
            }
        }
        if rows.len() < df.row_count() {
            log::debug!(
                "kmeans: excluded {} of {} rows with missing values",
                df.row_count() - rows.len(),
                df.row_count()
            );
        }
        if data.len() < config.k {
            return Err(TidyError::InsufficientData {
                min_required: config.k,
                actual: data.len(),
            });
        }

        let mut best: Option<Run> = None;
        for init_idx in 0..config.n_init {
            let seed = config.seed.map(|s| s.wrapping_add(init_idx as u64));
            let run = kmeans_single(&data, config, seed);
            log::trace!(
                "kmeans restart {init_idx}: wcss = {:.6} after {} iterations",
                run.wcss,
                run.iterations
            );
            if best.as_ref().is_none_or(|b| run.wcss < b.wcss) {
                best = Some(run);
            }
        }
        let best = best.ok_or_else(|| TidyError::InvalidParameter {
            name: "n_init".into(),
            message: "must be at least 1".into(),
        })?;

        log::debug!(
            "kmeans k={}: {} rows, wcss = {:.4}, {} iterations",
            config.k,
            data.len(),
            best.wcss,
            best.iterations
        );

        Ok(KMeansFit {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            centroids: best.centroids,
            labels: best.labels,
            rows,
            wcss: best.wcss,
            iterations: best.iterations,
            cluster_sizes: best.cluster_sizes,
        })
    }
}

/// A fitted K-Means clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    columns: Vec<String>,
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    rows: Vec<usize>,
    wcss: f64,
    iterations: usize,
    cluster_sizes: Vec<usize>,
}

impl KMeansFit {
    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Cluster centroids (k × d, in feature column order).
    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Cluster label (0..k) of each fitted row.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Source-frame indices of the fitted rows, aligned with
    /// [`labels`](Self::labels).
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    /// Within-cluster sum of squares.
    pub fn wcss(&self) -> f64 {
        self.wcss
    }

    /// Lloyd iterations of the kept run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn cluster_sizes(&self) -> &[usize] {
        &self.cluster_sizes
    }

    /// Assigns every row of `df` to its nearest centroid. Rows with a missing
    /// feature yield `None`.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<Option<usize>>> {
        let names: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let features = feature_columns(df, &names)?;
        Ok((0..df.row_count())
            .map(|r| point_at(&features, r).map(|p| nearest(&p, &self.centroids).0))
            .collect())
    }

    /// Adds an integer cluster column called `name` to `df`.
    pub fn augment(&self, df: &DataFrame, name: &str) -> Result<DataFrame> {
        let labels = self
            .predict(df)?
            .into_iter()
            .map(|l| l.map(|c| c as i64))
            .collect();
        let mut out = df.clone();
        out.add_column(name, Column::integers(labels))?;
        Ok(out)
    }
}

fn feature_columns<'a>(df: &'a DataFrame, columns: &[&str]) -> Result<Vec<&'a Column>> {
    columns
        .iter()
        .map(|name| {
            let column = df.column(name)?;
            let t = column.data_type();
            if t.is_numeric() || t == DataType::Null {
                Ok(column)
            } else {
                Err(TidyError::type_mismatch(
                    format!("kmeans feature '{name}'"),
                    "numeric",
                    t,
                ))
            }
        })
        .collect()
}

fn point_at(features: &[&Column], row: usize) -> Option<Vec<f64>> {
    features.iter().map(|c| c.numeric_at(row)).collect()
}

// ── Internal K-Means ──────────────────────────────────────────────────

struct Run {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    wcss: f64,
    iterations: usize,
    cluster_sizes: Vec<usize>,
}

fn kmeans_single(data: &[Vec<f64>], config: &KMeansConfig, seed: Option<u64>) -> Run {
    let k = config.k;
    let d = data.first().map_or(0, Vec::len);

    let mut centroids = kmeans_plus_plus(data, k, seed);
    let mut labels = vec![0usize; data.len()];
    let mut iterations = 0;

    for iter in 0..config.max_iter {
        iterations = iter + 1;

        for (label, point) in labels.iter_mut().zip(data) {
            *label = nearest(point, &centroids).0;
        }

        let mut sums = vec![vec![0.0; d]; k];
        let mut counts = vec![0usize; k];
        for (&c, point) in labels.iter().zip(data) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(point) {
                *s += v;
            }
        }
        // An empty cluster keeps its previous centroid.
        let updated: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .zip(&centroids)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        let max_shift = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| euclidean_dist_sq(old, new).sqrt())
            .fold(0.0_f64, f64::max);
        centroids = updated;
        if max_shift < config.tol {
            break;
        }
    }

    let mut wcss = 0.0;
    let mut cluster_sizes = vec![0usize; k];
    for (label, point) in labels.iter_mut().zip(data) {
        let (c, dist) = nearest(point, &centroids);
        *label = c;
        cluster_sizes[c] += 1;
        wcss += dist;
    }

    Run {
        centroids,
        labels,
        wcss,
        iterations,
        cluster_sizes,
    }
}

/// Linear congruential generator yielding uniforms in `[0, 1)`.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as f64 / (1u64 << 31) as f64
    }

    fn next_index(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

/// K-Means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen centroid.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, seed: Option<u64>) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut rng = Lcg(seed.unwrap_or(12345));
    let mut centroids = vec![data[rng.next_index(n)].clone()];
    let mut min_dists = vec![f64::INFINITY; n];

    while centroids.len() < k {
        let last = &centroids[centroids.len() - 1];
        for (dist, point) in min_dists.iter_mut().zip(data) {
            *dist = dist.min(euclidean_dist_sq(point, last));
        }

        let total: f64 = min_dists.iter().sum();
        let chosen = if total < 1e-15 {
            // all points coincide with a centroid
            rng.next_index(n)
        } else {
            let target = rng.next_f64() * total;
            let mut cumulative = 0.0;
            min_dists
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative >= target
                })
                .unwrap_or(n - 1)
        };
        centroids.push(data[chosen].clone());
    }
    centroids
}

/// Index of and squared distance to the closest centroid.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .map(|c| euclidean_dist_sq(point, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

#[inline]
fn euclidean_dist_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&ai, &bi)| {
            let diff = ai - bi;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn three_blobs() -> DataFrame {
        let xs = [0.0, 0.5, 0.2, 10.0, 10.5, 10.2, 5.0, 5.5, 5.2];
        let ys = [0.0, 0.5, 0.3, 0.0, 0.5, 0.3, 10.0, 10.5, 10.3];
        DataFrame::from_columns(vec![
            ("x", Column::reals(xs.iter().map(|&v| Some(v)).collect())),
            ("y", Column::reals(ys.iter().map(|&v| Some(v)).collect())),
        ])
        .unwrap()
    }

    #[test]
    fn finds_three_clusters() {
        crate::init_test_logging();
        let fit = KMeansModel::fit(&three_blobs(), &["x", "y"], &KMeansConfig::new(3)).unwrap();
        let l = fit.labels();
        assert_eq!(fit.k(), 3);
        assert_eq!(l[0], l[1]);
        assert_eq!(l[0], l[2]);
        assert_eq!(l[3], l[4]);
        assert_eq!(l[6], l[8]);
        assert_ne!(l[0], l[3]);
        assert_ne!(l[0], l[6]);
        assert_ne!(l[3], l[6]);

        let mut sizes = fit.cluster_sizes().to_vec();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![3, 3, 3]);
        assert!(fit.iterations() >= 1);
    }

    #[test]
    fn same_seed_same_result() {
        let config = KMeansConfig::new(2).seed(Some(7)).n_init(3);
        let a = KMeansModel::fit(&three_blobs(), &["x", "y"], &config).unwrap();
        let b = KMeansModel::fit(&three_blobs(), &["x", "y"], &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wcss_single_cluster_is_total_variance() {
        let df = DataFrame::from_columns(vec![(
            "x",
            Column::integers(vec![Some(1), Some(2), Some(3), None]),
        )])
        .unwrap();
        let fit = KMeansModel::fit(&df, &["x"], &KMeansConfig::new(1)).unwrap();
        assert_eq!(fit.row_indices(), &[0, 1, 2]);
        assert!((fit.centroids()[0][0] - 2.0).abs() < 1e-12);
        assert!((fit.wcss() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn predict_and_augment() {
        let df = three_blobs();
        let fit = KMeansModel::fit(&df, &["x", "y"], &KMeansConfig::new(3)).unwrap();

        let new = DataFrame::from_columns(vec![
            ("x", Column::reals(vec![Some(0.1), None, Some(10.1)])),
            ("y", Column::reals(vec![Some(0.1), Some(1.0), Some(0.1)])),
        ])
        .unwrap();
        let preds = fit.predict(&new).unwrap();
        assert_eq!(preds[0], Some(fit.labels()[0]));
        assert_eq!(preds[1], None);
        assert_eq!(preds[2], Some(fit.labels()[3]));

        let out = fit.augment(&df, "cluster").unwrap();
        assert_eq!(out.data_type("cluster").unwrap(), DataType::Integer);
        assert_eq!(out.value(4, "cluster").unwrap(), Value::Integer(fit.labels()[4] as i64));
        assert!(fit.augment(&out, "cluster").is_err());
    }

    #[test]
    fn error_cases() {
        let df = three_blobs();
        let err = KMeansModel::fit(&df, &["x"], &KMeansConfig::new(10)).unwrap_err();
        assert_eq!(
            err,
            TidyError::InsufficientData {
                min_required: 10,
                actual: 9
            }
        );
        assert!(KMeansModel::fit(&df, &["x"], &KMeansConfig::new(0)).is_err());
        assert!(KMeansModel::fit(&df, &[], &KMeansConfig::new(2)).is_err());

        let labelled = df.derive("label", &crate::expr::lit("a")).unwrap();
        let err = KMeansModel::fit(&labelled, &["label"], &KMeansConfig::new(2)).unwrap_err();
        assert!(matches!(err, TidyError::TypeMismatch { .. }));
    }

    #[test]
    fn config_from_json() {
        let config: KMeansConfig = serde_json::from_str(r#"{"k":4}"#).unwrap();
        assert_eq!(config, KMeansConfig::new(4));
        let config: KMeansConfig = serde_json::from_str(r#"{"k":2,"n_init":1,"seed":null}"#).unwrap();
        assert_eq!(config, KMeansConfig::new(2).n_init(1).seed(None));
        assert!(serde_json::from_str::<KMeansConfig>("{}").is_err());
    }
}
