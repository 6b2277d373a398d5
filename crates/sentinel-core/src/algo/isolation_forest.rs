//! Isolation Forest for Batch-Fitted Multivariate Anomaly Scoring
//!
//! Anomalies are few and different, so random axis-aligned cuts separate them
//! from the bulk of the data in fewer steps than normal points. The forest
//! averages the isolation depth of a point over many randomized trees and
//! normalizes it by the expected depth of an unsuccessful BST search.
//!
//! Key properties:
//! - Fitted once on a batch, then read-only (`Send + Sync`)
//! - Deterministic for a given seed and training set
//! - Score in (-1, 0]; lower means more anomalous
//! - Decision threshold calibrated from the contamination rate
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou, ICDM 2008)

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Subsample cap used when `max_samples` is left on auto
pub const AUTO_MAX_SAMPLES: usize = 256;

/// A node in an isolation tree
#[derive(Serialize, Deserialize, Clone, Debug)]
enum IsoNode {
    /// Internal node splitting on one feature
    Internal {
        split_dim: usize,
        split_value: f64,
        left: Box<IsoNode>,
        right: Box<IsoNode>,
    },
    /// External node; remembers how many training points reached it
    Leaf { size: usize },
}

/// A single isolation tree
#[derive(Serialize, Deserialize, Clone, Debug)]
struct IsoTree {
    root: IsoNode,
}

impl IsoTree {
    fn grow(rows: &[&[f64]], indices: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_recursive(rows, indices, 0, max_depth, rng),
        }
    }

    /// Depth at which `point` lands, plus the expected depth of the
    /// unbuilt subtree below that leaf
    fn path_length(&self, point: &[f64]) -> f64 {
        path_length_recursive(&self.root, point, 0.0)
    }
}

/// Recursive tree growth
fn grow_recursive(
    rows: &[&[f64]],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsoNode {
    if depth >= max_depth || indices.len() <= 1 {
        return IsoNode::Leaf {
            size: indices.len(),
        };
    }

    // Only features with spread inside this node can isolate anything
    let dims = rows[indices[0]].len();
    let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(dims);
    for dim in 0..dims {
        let (lo, hi) = indices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][dim]), hi.max(rows[i][dim]))
            });
        if hi > lo {
            candidates.push((dim, lo, hi));
        }
    }

    if candidates.is_empty() {
        return IsoNode::Leaf {
            size: indices.len(),
        };
    }

    let (split_dim, lo, hi) = candidates[rng.random_range(0..candidates.len())];
    // Uniform in [lo, hi): both sides stay non-empty
    let split_value = lo + rng.random::<f64>() * (hi - lo);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][split_dim] <= split_value);

    IsoNode::Internal {
        split_dim,
        split_value,
        left: Box::new(grow_recursive(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(grow_recursive(rows, right, depth + 1, max_depth, rng)),
    }
}

/// Recursive path length calculation
fn path_length_recursive(node: &IsoNode, point: &[f64], depth: f64) -> f64 {
    match node {
        IsoNode::Leaf { size } => depth + average_path_length(*size),
        IsoNode::Internal {
            split_dim,
            split_value,
            left,
            right,
        } => {
            if point[*split_dim] <= *split_value {
                path_length_recursive(left, point, depth + 1.0)
            } else {
                path_length_recursive(right, point, depth + 1.0)
            }
        }
    }
}

/// Expected path length of an unsuccessful search in a BST of `n` nodes,
/// c(n) = 2H(n-1) - 2(n-1)/n
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Label assigned by the fitted decision threshold
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLabel {
    Normal,
    Anomalous,
}

/// Fitting parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IsolationForestParams {
    n_estimators: usize,
    /// `None` means min(256, n_samples)
    max_samples: Option<usize>,
    contamination: f64,
    seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: None,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl IsolationForestParams {
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Grow the forest and calibrate its threshold on `rows`
    pub fn fit<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<IsolationForest, ForestError> {
        if self.n_estimators == 0 {
            return Err(ForestError::NoEstimators);
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ForestError::InvalidContamination(self.contamination));
        }
        if self.max_samples == Some(0) {
            return Err(ForestError::InvalidMaxSamples);
        }

        let rows: Vec<&[f64]> = rows.iter().map(AsRef::as_ref).collect();
        let first = rows.first().ok_or(ForestError::Empty)?;
        let dimensions = first.len();
        if dimensions == 0 {
            return Err(ForestError::Empty);
        }
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != dimensions {
                return Err(ForestError::DimensionMismatch {
                    expected: dimensions,
                    found: row.len(),
                });
            }
            if let Some(column) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFinite {
                    row: row_idx,
                    column,
                });
            }
        }

        let n = rows.len();
        let sample_size = self.max_samples.unwrap_or(AUTO_MAX_SAMPLES).min(n);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees: Vec<IsoTree> = (0..self.n_estimators)
            .map(|_| {
                let subsample = index::sample(&mut rng, n, sample_size).into_vec();
                IsoTree::grow(&rows, subsample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            trees,
            params: self.clone(),
            sample_size,
            dimensions,
            offset: 0.0,
        };

        let mut training_scores: Vec<f64> = rows.iter().map(|row| forest.raw_score(row)).collect();
        forest.offset = percentile(&mut training_scores, 100.0 * self.contamination);

        Ok(forest)
    }
}

/// A fitted isolation forest
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IsolationForest {
    trees: Vec<IsoTree>,
    params: IsolationForestParams,
    /// Subsample size actually used per tree
    sample_size: usize,
    dimensions: usize,
    /// Scores below this are labelled anomalous
    offset: f64,
}

impl IsolationForest {
    pub fn params() -> IsolationForestParams {
        IsolationForestParams::default()
    }

    /// Anomaly score of `point`: -2^(-E[h(x)] / c(sample_size)).
    /// Lower (more negative) means more anomalous.
    pub fn score(&self, point: &[f64]) -> Result<f64, ForestError> {
        self.check_width(point)?;
        Ok(self.raw_score(point))
    }

    /// Score relative to the fitted threshold; negative means anomalous
    pub fn decision_function(&self, point: &[f64]) -> Result<f64, ForestError> {
        Ok(self.score(point)? - self.offset)
    }

    pub fn predict(&self, point: &[f64]) -> Result<IsolationLabel, ForestError> {
        Ok(self.score_and_label(point)?.1)
    }

    /// Single traversal returning both the raw score and the label
    pub fn score_and_label(&self, point: &[f64]) -> Result<(f64, IsolationLabel), ForestError> {
        let score = self.score(point)?;
        let label = if score < self.offset {
            IsolationLabel::Anomalous
        } else {
            IsolationLabel::Normal
        };
        Ok((score, label))
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn contamination(&self) -> f64 {
        self.params.contamination
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn raw_score(&self, point: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(point)).sum();
        let mean_depth = total / self.trees.len() as f64;

        let norm = average_path_length(self.sample_size);
        let norm = if norm > 0.0 { norm } else { 1.0 };

        -(2.0f64).powf(-mean_depth / norm)
    }

    fn check_width(&self, point: &[f64]) -> Result<(), ForestError> {
        if point.len() != self.dimensions {
            return Err(ForestError::DimensionMismatch {
                expected: self.dimensions,
                found: point.len(),
            });
        }
        Ok(())
    }
}

/// Linear-interpolated percentile (`q` in [0, 100]); sorts `values` in place
fn percentile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    values[lo] + (values[hi] - values[lo]) * frac
}

/// Errors that can occur while fitting or querying the forest
#[derive(Debug, Clone, PartialEq)]
pub enum ForestError {
    Empty,
    NoEstimators,
    InvalidMaxSamples,
    InvalidContamination(f64),
    NonFinite { row: usize, column: usize },
    DimensionMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for ForestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Cannot fit forest on an empty training set"),
            Self::NoEstimators => write!(f, "Forest needs at least one estimator"),
            Self::InvalidMaxSamples => write!(f, "max_samples must be positive"),
            Self::InvalidContamination(c) => {
                write!(f, "Contamination must be in (0, 0.5], got {}", c)
            }
            Self::NonFinite { row, column } => {
                write!(f, "Non-finite training value at row {}, column {}", row, column)
            }
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "Feature width mismatch: expected {}, found {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for ForestError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_rows() -> Vec<Vec<f64>> {
        // Dense grid around the origin
        let mut rows = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                rows.push(vec![i as f64 * 0.05, j as f64 * 0.05]);
            }
        }
        rows
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) is the usual normalizer, roughly 10.24
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.01, "c(256) = {}", c256);
    }

    #[test]
    fn test_outlier_scores_lower() {
        let mut rows = clustered_rows();
        rows.push(vec![25.0, -30.0]);
        let forest = IsolationForest::params().n_estimators(50).fit(&rows).unwrap();

        let inlier = forest.score(&[0.5, 0.5]).unwrap();
        let outlier = forest.score(&[25.0, -30.0]).unwrap();

        assert!(outlier < inlier, "outlier {} vs inlier {}", outlier, inlier);
        assert!(outlier > -1.0 && outlier <= 0.0);
        assert_eq!(forest.predict(&[25.0, -30.0]).unwrap(), IsolationLabel::Anomalous);
    }

    #[test]
    fn test_contamination_calibrates_training_labels() {
        let rows = clustered_rows();
        let forest = IsolationForest::params().contamination(0.1).fit(&rows).unwrap();

        let flagged = rows
            .iter()
            .filter(|row| forest.predict(row).unwrap() == IsolationLabel::Anomalous)
            .count();

        // 10% of 400 with interpolation slack
        assert!((30..=45).contains(&flagged), "flagged {}", flagged);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let rows = clustered_rows();
        let a = IsolationForest::params().seed(7).fit(&rows).unwrap();
        let b = IsolationForest::params().seed(7).fit(&rows).unwrap();

        assert_eq!(a.offset(), b.offset());
        assert_eq!(a.score(&[3.0, 3.0]).unwrap(), b.score(&[3.0, 3.0]).unwrap());
    }

    #[test]
    fn test_sample_size_and_defaults() {
        let rows = clustered_rows();
        let forest = IsolationForest::params().fit(&rows).unwrap();
        assert_eq!(forest.n_estimators(), 100);
        assert_eq!(forest.sample_size(), 256);
        assert_eq!(forest.contamination(), 0.05);

        let small = IsolationForest::params().fit(&rows[..10]).unwrap();
        assert_eq!(small.sample_size(), 10);
    }

    #[test]
    fn test_constant_training_set_does_not_panic() {
        let rows = vec![vec![1.0, 1.0]; 32];
        let forest = IsolationForest::params().n_estimators(5).fit(&rows).unwrap();
        let score = forest.score(&[1.0, 1.0]).unwrap();
        assert!(score.is_finite());
    }

    #[test]
    fn test_fit_errors() {
        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(IsolationForest::params().fit(&empty).unwrap_err(), ForestError::Empty);

        let rows = clustered_rows();
        assert_eq!(
            IsolationForest::params().n_estimators(0).fit(&rows).unwrap_err(),
            ForestError::NoEstimators
        );
        assert!(matches!(
            IsolationForest::params().contamination(0.7).fit(&rows),
            Err(ForestError::InvalidContamination(_))
        ));

        let bad = vec![vec![1.0, f64::NAN]];
        assert_eq!(
            IsolationForest::params().fit(&bad).unwrap_err(),
            ForestError::NonFinite { row: 0, column: 1 }
        );
    }

    #[test]
    fn test_query_width_is_checked() {
        let forest = IsolationForest::params()
            .n_estimators(3)
            .fit(&clustered_rows())
            .unwrap();
        assert!(matches!(
            forest.score(&[1.0]),
            Err(ForestError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&mut values, 0.0), 1.0);
        assert_eq!(percentile(&mut values, 100.0), 4.0);
        assert!((percentile(&mut values, 50.0) - 2.5).abs() < 1e-12);
    }
}
