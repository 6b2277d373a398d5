//! Training Sources
//!
//! The training stage fits on whatever a [`TrainingSource`] produces:
//! - **synthetic**: reproducible bootstrap population with injected anomalies
//! - **json_lines**: historical feature rows loaded from a file
//! - **static**: an in-memory batch supplied by the caller

use crate::transaction::FeatureVector;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Poisson};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for training-set providers
///
/// Swapping the source changes what the model learns without touching the
/// scoring path.
pub trait TrainingSource: Send + Sync {
    /// Human-readable name of the source
    fn name(&self) -> &str;

    /// Produce the full training batch in feature order
    fn produce(&self) -> Result<Vec<FeatureVector>, BootstrapError>;
}

// ============================================================================
// Synthetic bootstrap
// ============================================================================

/// Distribution contract of the synthetic bootstrap population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub samples: usize,
    pub seed: u64,
    /// Scale (mean) of the exponential amount distribution
    pub amount_scale: f64,
    pub amount_min: f64,
    pub amount_max: f64,
    /// Poisson mean of prior transaction counts
    pub history_mean: f64,
    /// Scale (mean) of the exponential account age distribution
    pub account_age_scale: f64,
    /// Rows overwritten with extreme values
    pub anomalies: usize,
    pub anomaly_amount_min: f64,
    pub anomaly_amount_max: f64,
    pub anomaly_history_mean: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 42,
            amount_scale: 500.0,
            amount_min: 1.0,
            amount_max: 10_000.0,
            history_mean: 20.0,
            account_age_scale: 200.0,
            anomalies: 50,
            anomaly_amount_min: 8_000.0,
            anomaly_amount_max: 10_000.0,
            anomaly_history_mean: 2.0,
        }
    }
}

/// Seeded synthetic population: exponential amounts clipped to
/// [amount_min, amount_max], Poisson history counts, exponential account
/// ages, then a random subset overwritten with large amounts and short
/// histories.
#[derive(Debug, Clone)]
pub struct SyntheticBootstrap {
    config: BootstrapConfig,
}

impl SyntheticBootstrap {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn validate(&self) -> Result<(), BootstrapError> {
        let c = &self.config;
        if c.samples == 0 {
            return Err(BootstrapError::InvalidConfig("samples must be positive".into()));
        }
        if c.anomalies > c.samples {
            return Err(BootstrapError::InvalidConfig(format!(
                "cannot inject {} anomalies into {} samples",
                c.anomalies, c.samples
            )));
        }
        if !(c.amount_min <= c.amount_max) {
            return Err(BootstrapError::InvalidConfig(format!(
                "amount clip range [{}, {}] is empty",
                c.amount_min, c.amount_max
            )));
        }
        if c.anomalies > 0 && !(c.anomaly_amount_min < c.anomaly_amount_max) {
            return Err(BootstrapError::InvalidConfig(format!(
                "anomaly amount range [{}, {}) is empty",
                c.anomaly_amount_min, c.anomaly_amount_max
            )));
        }
        Ok(())
    }
}

impl Default for SyntheticBootstrap {
    fn default() -> Self {
        Self::new(BootstrapConfig::default())
    }
}

impl TrainingSource for SyntheticBootstrap {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn produce(&self) -> Result<Vec<FeatureVector>, BootstrapError> {
        self.validate()?;
        let c = &self.config;
        let mut rng = StdRng::seed_from_u64(c.seed);

        let amount_dist = Exp::new(1.0 / c.amount_scale)
            .map_err(|e| BootstrapError::InvalidDistribution(format!("amount: {}", e)))?;
        let history_dist = Poisson::new(c.history_mean)
            .map_err(|e| BootstrapError::InvalidDistribution(format!("history: {}", e)))?;
        let age_dist = Exp::new(1.0 / c.account_age_scale)
            .map_err(|e| BootstrapError::InvalidDistribution(format!("account age: {}", e)))?;

        // Column by column so each feature consumes one contiguous run of the stream
        let amounts: Vec<f64> = (0..c.samples)
            .map(|_| amount_dist.sample(&mut rng).clamp(c.amount_min, c.amount_max))
            .collect();
        let histories: Vec<f64> = (0..c.samples)
            .map(|_| Distribution::<f64>::sample(&history_dist, &mut rng))
            .collect();
        let ages: Vec<f64> = (0..c.samples).map(|_| age_dist.sample(&mut rng)).collect();

        let mut rows: Vec<FeatureVector> = amounts
            .into_iter()
            .zip(histories)
            .zip(ages)
            .map(|((amount, history), age)| FeatureVector::new(amount, history, age))
            .collect();

        if c.anomalies > 0 {
            let anomaly_history = Poisson::new(c.anomaly_history_mean).map_err(|e| {
                BootstrapError::InvalidDistribution(format!("anomaly history: {}", e))
            })?;
            let picked = index::sample(&mut rng, c.samples, c.anomalies).into_vec();

            let anomaly_amounts: Vec<f64> = picked
                .iter()
                .map(|_| rng.random_range(c.anomaly_amount_min..c.anomaly_amount_max))
                .collect();
            let anomaly_histories: Vec<f64> = picked
                .iter()
                .map(|_| Distribution::<f64>::sample(&anomaly_history, &mut rng))
                .collect();

            for ((&idx, amount), history) in picked.iter().zip(anomaly_amounts).zip(anomaly_histories) {
                rows[idx].set_amount(amount);
                rows[idx].set_previous_transaction_count(history);
            }
        }

        debug!(
            samples = rows.len(),
            anomalies = c.anomalies,
            seed = c.seed,
            "Synthetic bootstrap generated"
        );
        Ok(rows)
    }
}

// ============================================================================
// File-backed and in-memory sources
// ============================================================================

/// Historical rows, one JSON object per line.
///
/// Each line needs `amount` and may carry `previous_transaction_count`
/// (alias `transaction_count`) and `account_age_days`; full transaction
/// records work too since extra fields are ignored. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse(text: &str) -> Result<Vec<FeatureVector>, BootstrapError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<FeatureVector>(line).map_err(|e| BootstrapError::Parse {
                    line: idx + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

impl TrainingSource for JsonLinesSource {
    fn name(&self) -> &str {
        "json_lines"
    }

    fn produce(&self) -> Result<Vec<FeatureVector>, BootstrapError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| BootstrapError::Io(format!("{}: {}", self.path.display(), e)))?;
        let rows = Self::parse(&text)?;
        debug!(path = %self.path.display(), rows = rows.len(), "Training rows loaded");
        Ok(rows)
    }
}

/// Caller-supplied batch
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    rows: Vec<FeatureVector>,
}

impl StaticSource {
    pub fn new(rows: Vec<FeatureVector>) -> Self {
        Self { rows }
    }
}

impl TrainingSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn produce(&self) -> Result<Vec<FeatureVector>, BootstrapError> {
        Ok(self.rows.clone())
    }
}

/// Errors that can occur while producing a training set
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapError {
    InvalidConfig(String),
    InvalidDistribution(String),
    Io(String),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(e) => write!(f, "Invalid bootstrap config: {}", e),
            Self::InvalidDistribution(e) => write!(f, "Invalid distribution parameter: {}", e),
            Self::Io(e) => write!(f, "Cannot read training data: {}", e),
            Self::Parse { line, message } => {
                write!(f, "Malformed training row at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for BootstrapError {}
