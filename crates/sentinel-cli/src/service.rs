//! Request handling around a trained model
//!
//! Each operation mirrors one endpoint of the scoring service: health,
//! model descriptor, single prediction and batch prediction.

use crate::audit;
use crate::error::CliError;
use crate::metrics;
use crate::shard::ShardPool;
use sentinel_core::{BatchPrediction, FraudModel, ModelInfo, PredictionResult, TransactionRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "sentinelpay-ai";

/// Batches smaller than this are scored on the calling thread
pub const MIN_SHARDED_BATCH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub model_trained: bool,
}

/// Envelope for a batch of predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub status: String,
    pub count: usize,
    pub predictions: Vec<BatchPrediction>,
}

/// The scoring service: one frozen model plus the batch fan-out setting
#[derive(Debug, Clone)]
pub struct ScoringService {
    model: FraudModel,
    workers: usize,
}

impl ScoringService {
    pub fn new(model: FraudModel) -> Self {
        metrics::set_model_trained(model.is_trained());
        if !model.is_trained() {
            warn!("No trained model loaded, predictions use the fallback answer");
        }
        Self { model, workers: 1 }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn model(&self) -> &FraudModel {
        &self.model
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            model_trained: self.model.is_trained(),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.model.model_info()
    }

    /// Score one transaction under `request_id`, or a generated id
    pub fn predict(
        &self,
        record: &TransactionRecord,
        request_id: Option<&str>,
    ) -> Result<PredictionResult, CliError> {
        let transaction_id = audit::correlation_id(request_id);
        let timer = metrics::SCORING_LATENCY.start_timer();

        let result = self.model.predict(transaction_id, record).inspect_err(|_| {
            metrics::record_failure();
        })?;

        timer.observe_duration();
        metrics::record_prediction(result.recommendation, self.model.is_trained());
        audit::log_prediction(&record.user_id, record.amount, &result);
        Ok(result)
    }

    /// Score a batch; all-or-nothing, output order follows input order
    pub fn predict_batch(&self, records: &[TransactionRecord]) -> Result<BatchResponse, CliError> {
        let timer = metrics::SCORING_LATENCY.start_timer();

        let scored = if self.workers > 1 && records.len() >= MIN_SHARDED_BATCH {
            ShardPool::new(self.model.clone(), self.workers).score(records)
        } else {
            self.model.predict_batch(records).map_err(CliError::from)
        };
        let predictions = scored.inspect_err(|_| metrics::record_failure())?;

        timer.observe_duration();
        for p in &predictions {
            metrics::record_prediction(p.recommendation, self.model.is_trained());
        }
        info!(
            count = predictions.len(),
            flagged = predictions.iter().filter(|p| p.is_fraud).count(),
            workers = self.workers,
            "Batch scored"
        );

        Ok(BatchResponse {
            status: "success".to_string(),
            count: predictions.len(),
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{Recommendation, SentinelConfig, SyntheticBootstrap};

    fn service() -> ScoringService {
        let mut config = SentinelConfig::default();
        config.model.n_estimators = 30;
        let model = FraudModel::train(&SyntheticBootstrap::new(config.bootstrap.clone()), &config);
        ScoringService::new(model)
    }

    #[test]
    fn test_health_shape() {
        let value = serde_json::to_value(service().health()).unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["service"], "sentinelpay-ai");
        assert_eq!(value["model_trained"], true);
    }

    #[test]
    fn test_predict_uses_request_id() {
        let svc = service();
        let record = TransactionRecord::new("u1", 40.0, "USD")
            .with_history(25)
            .with_account_age(300);

        let result = svc.predict(&record, Some("txn_fixed")).unwrap();
        assert_eq!(result.transaction_id, "txn_fixed");

        let generated = svc.predict(&record, None).unwrap();
        assert!(generated.transaction_id.starts_with("txn_"));
        assert_eq!(generated.risk_score, result.risk_score);
    }

    #[test]
    fn test_batch_envelope() {
        let svc = service().with_workers(3);
        let records: Vec<_> = (0..100)
            .map(|i| TransactionRecord::new(format!("u{}", i), 10.0 * i as f64, "USD").with_history(10))
            .collect();

        let response = svc.predict_batch(&records).unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.count, 100);
        for (record, prediction) in records.iter().zip(&response.predictions) {
            assert_eq!(prediction.user_id, record.user_id);
        }

        let sequential = svc.model().predict_batch(&records).unwrap();
        assert_eq!(response.predictions, sequential);
    }

    #[test]
    fn test_empty_batch() {
        let response = service().predict_batch(&[]).unwrap();
        assert_eq!(response.count, 0);
        assert!(response.predictions.is_empty());
    }

    #[test]
    fn test_untrained_service() {
        let svc = ScoringService::new(FraudModel::untrained(&SentinelConfig::default()));
        assert!(!svc.health().model_trained);
        let result = svc
            .predict(&TransactionRecord::new("u", 9_000.0, "USD"), None)
            .unwrap();
        assert_eq!(result.recommendation, Recommendation::Approve);
        assert_eq!(result.risk_score, 0.3);
    }
}
