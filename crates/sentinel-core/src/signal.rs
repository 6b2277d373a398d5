//! Scoring Output
//!
//! What the scoring stage hands back to its caller. Field names match the
//! wire shape existing integrations consume (`risk_score`, `is_fraud`,
//! `risk_factors`, `confidence`, `recommendation`).

use crate::policy::{Recommendation, RiskFactor};
use serde::{Deserialize, Serialize};

/// Risk score returned when no model is trained
pub const FALLBACK_RISK_SCORE: f64 = 0.3;

/// Logistic squashing of a raw anomaly score into (0, 1).
///
/// Monotonic in the forest score, not a calibrated fraud probability.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Keep the risk score inside [0, 1]. NaN maps to the upper bound so a
/// broken score is reviewed rather than waved through.
pub fn bounded_risk(score: f64) -> f64 {
    if score.is_nan() {
        1.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Full result of the scoring stage for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Raw forest score; lower is more anomalous
    pub anomaly_score: f64,
    pub risk_score: f64,
    pub is_fraud: bool,
    pub risk_factors: Vec<RiskFactor>,
    /// |anomaly_score|; unbounded above, not a probability
    pub confidence: f64,
    pub recommendation: Recommendation,
}

impl Assessment {
    /// Answer given while no model is trained. Confidence is 0.0 because
    /// nothing was scored.
    pub fn fallback() -> Self {
        Self {
            anomaly_score: 0.0,
            risk_score: FALLBACK_RISK_SCORE,
            is_fraud: false,
            risk_factors: Vec::new(),
            confidence: 0.0,
            recommendation: Recommendation::Approve,
        }
    }
}

/// Single-record response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub transaction_id: String,
    pub risk_score: f64,
    pub is_fraud: bool,
    pub risk_factors: Vec<RiskFactor>,
    pub confidence: f64,
    pub recommendation: Recommendation,
}

impl PredictionResult {
    pub fn from_assessment(transaction_id: impl Into<String>, assessment: Assessment) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            risk_score: assessment.risk_score,
            is_fraud: assessment.is_fraud,
            risk_factors: assessment.risk_factors,
            confidence: assessment.confidence,
            recommendation: assessment.recommendation,
        }
    }
}

/// One entry of a batch response, keyed by user rather than transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub user_id: String,
    pub risk_score: f64,
    pub is_fraud: bool,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendation: Recommendation,
}

impl BatchPrediction {
    pub fn from_assessment(user_id: impl Into<String>, assessment: Assessment) -> Self {
        Self {
            user_id: user_id.into(),
            risk_score: assessment.risk_score,
            is_fraud: assessment.is_fraud,
            risk_factors: assessment.risk_factors,
            recommendation: assessment.recommendation,
        }
    }
}

/// Model descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    #[serde(rename = "model_trained")]
    pub trained: bool,
    pub contamination: f64,
    pub n_estimators: usize,
    pub features: Vec<String>,
}
