//! Correlation ids and the prediction audit trail
//!
//! Audit events go to the `audit` tracing target so they can be routed
//! separately, e.g. `RUST_LOG=audit=info`.

use chrono::{DateTime, Utc};
use sentinel_core::PredictionResult;
use tracing::info;

/// Use the caller's id when it has one, otherwise derive `txn_<secs>.<micros>`
/// from the current wall clock
pub fn correlation_id(requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => timestamp_id(Utc::now()),
    }
}

pub fn timestamp_id(at: DateTime<Utc>) -> String {
    format!("txn_{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Record one scored transaction
pub fn log_prediction(user_id: &str, amount: f64, result: &PredictionResult) {
    info!(
        target: "audit",
        transaction_id = %result.transaction_id,
        user_id,
        amount,
        risk_score = result.risk_score,
        is_fraud = result.is_fraud,
        recommendation = %result.recommendation,
        "Prediction"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_requested_id_is_kept() {
        assert_eq!(correlation_id(Some("txn_abc")), "txn_abc");
    }

    #[test]
    fn test_missing_id_is_generated() {
        let id = correlation_id(None);
        assert!(id.starts_with("txn_"));
        assert_eq!(correlation_id(Some("  ")).len(), id.len());
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.timestamp_opt(1_700_000_000, 42_000).unwrap();
        assert_eq!(timestamp_id(at), "txn_1700000000.000042");
    }
}
