use crate::error::CliError;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder,
};
use sentinel_core::Recommendation;

// --- Process-wide metrics, registered in the default registry ---

pub static PREDICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new("sentinel_predictions_total", "Predictions served by recommendation"),
        &["recommendation"],
    )
    .expect("valid metric definition");
    prometheus::register(Box::new(c.clone())).expect("metric registered once");
    c
});

pub static PREDICTION_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("sentinel_prediction_failures_total", "Predictions that failed")
        .expect("valid metric definition");
    prometheus::register(Box::new(c.clone())).expect("metric registered once");
    c
});

pub static FALLBACK_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "sentinel_fallback_predictions_total",
        "Predictions answered without a trained model",
    )
    .expect("valid metric definition");
    prometheus::register(Box::new(c.clone())).expect("metric registered once");
    c
});

pub static MODEL_TRAINED: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("sentinel_model_trained", "1 when a trained model is loaded")
        .expect("valid metric definition");
    prometheus::register(Box::new(g.clone())).expect("metric registered once");
    g
});

pub static SCORING_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(HistogramOpts::new(
        "sentinel_scoring_duration_seconds",
        "Histogram of scoring latency per request",
    ))
    .expect("valid metric definition");
    prometheus::register(Box::new(h.clone())).expect("metric registered once");
    h
});

/// Touch every metric so the exposition lists them even before the first
/// prediction
pub fn init() {
    Lazy::force(&PREDICTIONS_TOTAL);
    Lazy::force(&PREDICTION_FAILURES);
    Lazy::force(&FALLBACK_TOTAL);
    Lazy::force(&MODEL_TRAINED);
    Lazy::force(&SCORING_LATENCY);
}

pub fn record_prediction(recommendation: Recommendation, trained: bool) {
    PREDICTIONS_TOTAL
        .with_label_values(&[recommendation.as_str()])
        .inc();
    if !trained {
        FALLBACK_TOTAL.inc();
    }
}

pub fn record_failure() {
    PREDICTION_FAILURES.inc();
}

pub fn set_model_trained(trained: bool) {
    MODEL_TRAINED.set(i64::from(trained));
}

/// Prometheus text exposition of the default registry
pub fn render() -> Result<String, CliError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| CliError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_prediction_counts_by_label() {
        let before = PREDICTIONS_TOTAL.with_label_values(&["BLOCK"]).get();
        let fallback_before = FALLBACK_TOTAL.get();

        record_prediction(Recommendation::Block, true);
        record_prediction(Recommendation::Block, false);

        assert!(PREDICTIONS_TOTAL.with_label_values(&["BLOCK"]).get() >= before + 2);
        assert!(FALLBACK_TOTAL.get() > fallback_before);
    }

    #[test]
    fn test_render_lists_metrics() {
        init();
        set_model_trained(true);
        let text = render().unwrap();
        assert!(text.contains("sentinel_model_trained"));
        assert!(text.contains("sentinel_scoring_duration_seconds"));
    }
}
