//! Training and Scoring Engine
//!
//! [`FraudModel`] is the immutable context every scoring call reads from.
//! It is built once by running a [`TrainingSource`] through the scaler and
//! the isolation forest, then shared by clone (the fitted state sits behind
//! an `Arc`). Nothing mutates it afterwards, so concurrent callers need no
//! locking.
//!
//! When training fails the model stays untrained and every prediction
//! returns the fixed fallback answer instead of an error.

use crate::algo::{ForestError, IsolationForest, IsolationLabel, ScalerError, StandardScaler};
use crate::bootstrap::{BootstrapError, TrainingSource};
use crate::config::{ModelConfig, SentinelConfig};
use crate::policy::{Recommendation, RuleThresholds, risk_factors};
use crate::signal::{
    Assessment, BatchPrediction, ModelInfo, PredictionResult, bounded_risk, sigmoid,
};
use crate::transaction::{FEATURE_NAMES, FeatureVector, TransactionRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

pub const MODEL_TYPE: &str = "Isolation Forest";

// --- Fitted state ---

/// Scaler and forest fitted on the same training batch
#[derive(Debug, Clone)]
pub struct TrainedModel {
    scaler: StandardScaler,
    forest: IsolationForest,
}

impl TrainedModel {
    /// Fit the scaler on raw rows, then the forest on the scaled rows
    pub fn fit(rows: &[FeatureVector], config: &ModelConfig) -> Result<Self, TrainingError> {
        let scaler = StandardScaler::fit(rows)?;
        let scaled = scaler.transform_all(rows)?;

        let forest = IsolationForest::params()
            .n_estimators(config.n_estimators)
            .max_samples(config.max_samples)
            .contamination(config.contamination)
            .seed(config.seed)
            .fit(&scaled)?;

        Ok(Self { scaler, forest })
    }

    /// Raw anomaly score and label for one feature vector
    pub fn anomaly(&self, features: &FeatureVector) -> Result<(f64, IsolationLabel), ScoringFault> {
        let scaled = self
            .scaler
            .transform(features.as_slice())
            .map_err(ScoringFault::Scaling)?;
        self.forest
            .score_and_label(&scaled)
            .map_err(ScoringFault::Forest)
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }
}

// --- The shared model context ---

/// Frozen fraud model. Cheap to clone; clones share the fitted state.
#[derive(Debug, Clone)]
pub struct FraudModel {
    trained: Option<Arc<TrainedModel>>,
    model: ModelConfig,
    rules: RuleThresholds,
}

impl FraudModel {
    /// Run the training stage once. Failures are logged and leave the
    /// model untrained; they are never surfaced to scoring callers.
    pub fn train(source: &dyn TrainingSource, config: &SentinelConfig) -> Self {
        match Self::try_train(source, config) {
            Ok(model) => model,
            Err(e) => {
                error!(
                    source = source.name(),
                    error = %e,
                    "Model training failed, serving fallback predictions"
                );
                Self::untrained(config)
            }
        }
    }

    /// Training stage with the failure made visible
    pub fn try_train(
        source: &dyn TrainingSource,
        config: &SentinelConfig,
    ) -> Result<Self, TrainingError> {
        let started = Instant::now();
        info!(
            source = source.name(),
            n_estimators = config.model.n_estimators,
            contamination = config.model.contamination,
            "Training fraud detection model"
        );

        let rows = source.produce()?;
        let trained = TrainedModel::fit(&rows, &config.model)?;

        info!(
            samples = rows.len(),
            offset = trained.forest.offset(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fraud detection model trained successfully"
        );

        Ok(Self {
            trained: Some(Arc::new(trained)),
            model: config.model.clone(),
            rules: config.rules.clone(),
        })
    }

    pub fn untrained(config: &SentinelConfig) -> Self {
        Self {
            trained: None,
            model: config.model.clone(),
            rules: config.rules.clone(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn trained_model(&self) -> Option<&TrainedModel> {
        self.trained.as_deref()
    }

    pub fn rules(&self) -> &RuleThresholds {
        &self.rules
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_type: MODEL_TYPE.to_string(),
            trained: self.is_trained(),
            contamination: self.model.contamination,
            n_estimators: self.model.n_estimators,
            features: FEATURE_NAMES.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Scoring stage for one record, without a correlation id
    pub fn assess(&self, record: &TransactionRecord) -> Result<Assessment, PredictionError> {
        let Some(trained) = self.trained.as_deref() else {
            return Ok(Assessment::fallback());
        };

        let features = FeatureVector::from_record(record);
        let (anomaly_score, label) = trained.anomaly(&features).map_err(|fault| {
            error!(user_id = %record.user_id, error = %fault, "Scoring failed");
            PredictionError::Failed {
                stage: fault.stage(),
            }
        })?;

        let is_fraud = label == IsolationLabel::Anomalous;
        let risk_score = bounded_risk(sigmoid(anomaly_score));
        let confidence = if anomaly_score.is_nan() {
            0.0
        } else {
            anomaly_score.abs()
        };
        let factors = risk_factors(record, is_fraud, &self.rules);
        let recommendation = Recommendation::decide(is_fraud, risk_score, &self.rules);

        debug!(
            user_id = %record.user_id,
            anomaly_score,
            risk_score,
            is_fraud,
            recommendation = %recommendation,
            "Transaction scored"
        );

        Ok(Assessment {
            anomaly_score,
            risk_score,
            is_fraud,
            risk_factors: factors,
            confidence,
            recommendation,
        })
    }

    pub fn predict(
        &self,
        transaction_id: impl Into<String>,
        record: &TransactionRecord,
    ) -> Result<PredictionResult, PredictionError> {
        let assessment = self.assess(record)?;
        Ok(PredictionResult::from_assessment(transaction_id, assessment))
    }

    /// Score each record independently; output order follows input order
    pub fn predict_batch(
        &self,
        records: &[TransactionRecord],
    ) -> Result<Vec<BatchPrediction>, PredictionError> {
        records
            .iter()
            .map(|record| {
                self.assess(record)
                    .map(|a| BatchPrediction::from_assessment(record.user_id.clone(), a))
            })
            .collect()
    }
}

// --- Errors ---

/// Where a prediction broke down. Safe to show to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStage {
    Scaling,
    Scoring,
}

/// Internal scoring failure; logged, then reduced to a [`PredictionError`]
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringFault {
    Scaling(ScalerError),
    Forest(ForestError),
}

impl ScoringFault {
    pub fn stage(&self) -> ScoringStage {
        match self {
            Self::Scaling(_) => ScoringStage::Scaling,
            Self::Forest(_) => ScoringStage::Scoring,
        }
    }
}

impl std::fmt::Display for ScoringFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scaling(e) => write!(f, "scaling: {}", e),
            Self::Forest(e) => write!(f, "forest: {}", e),
        }
    }
}

impl std::error::Error for ScoringFault {}

/// Error crossing the scoring boundary. Carries no internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionError {
    Failed { stage: ScoringStage },
}

impl std::fmt::Display for PredictionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { .. } => write!(f, "prediction failed"),
        }
    }
}

impl std::error::Error for PredictionError {}

/// Errors that can occur while training
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    Bootstrap(BootstrapError),
    Scaling(ScalerError),
    Forest(ForestError),
}

impl From<BootstrapError> for TrainingError {
    fn from(e: BootstrapError) -> Self {
        Self::Bootstrap(e)
    }
}

impl From<ScalerError> for TrainingError {
    fn from(e: ScalerError) -> Self {
        Self::Scaling(e)
    }
}

impl From<ForestError> for TrainingError {
    fn from(e: ForestError) -> Self {
        Self::Forest(e)
    }
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrap(e) => write!(f, "Training data unavailable: {}", e),
            Self::Scaling(e) => write!(f, "Scaler fit failed: {}", e),
            Self::Forest(e) => write!(f, "Forest fit failed: {}", e),
        }
    }
}

impl std::error::Error for TrainingError {}
