use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_sentinel");

const RISKY: &str = r#"{"user_id": "user_risky", "amount": 9500.0, "currency": "USD", "previous_transaction_count": 1, "account_age_days": 5}"#;
const TYPICAL: &str = r#"{"user_id": "user_typical", "amount": 50.0, "currency": "USD", "previous_transaction_count": 30, "account_age_days": 400}"#;

fn run(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(BIN)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start sentinel");

    {
        let mut pipe = child.stdin.take().expect("stdin piped");
        if let Some(body) = stdin {
            pipe.write_all(body.as_bytes()).expect("write stdin");
        }
    }

    child.wait_with_output().expect("sentinel did not finish")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "sentinel failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_health() {
    let value = json(&run(&["health"], None));
    assert_eq!(value["status"], "healthy");
    assert_eq!(value["service"], "sentinelpay-ai");
    assert_eq!(value["model_trained"], true);
}

#[test]
fn test_info() {
    let value = json(&run(&["info"], None));
    assert_eq!(value["model_type"], "Isolation Forest");
    assert_eq!(value["model_trained"], true);
    assert_eq!(value["contamination"], 0.05);
    assert_eq!(value["n_estimators"], 100);
    assert_eq!(
        value["features"],
        serde_json::json!(["amount", "transaction_count", "account_age_days"])
    );
}

#[test]
fn test_predict_from_stdin() {
    let value = json(&run(&["predict", "--request-id", "txn_cli"], Some(RISKY)));

    assert_eq!(value["transaction_id"], "txn_cli");
    let risk = value["risk_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&risk));

    let factors: Vec<&str> = value["risk_factors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap())
        .collect();
    assert_eq!(
        &factors[..3],
        &[
            "High transaction amount",
            "New account with limited history",
            "Very recent account creation"
        ]
    );
}

#[test]
fn test_predict_typical_is_approved() {
    let value = json(&run(&["predict"], Some(TYPICAL)));
    assert_eq!(value["recommendation"], "APPROVE");
    assert!(value["transaction_id"].as_str().unwrap().starts_with("txn_"));
}

#[test]
fn test_batch_preserves_order() {
    let body = format!("[{}, {}, {}]", TYPICAL, RISKY, TYPICAL);
    let value = json(&run(&["batch", "--workers", "3"], Some(&body)));

    assert_eq!(value["status"], "success");
    assert_eq!(value["count"], 3);
    let users: Vec<&str> = value["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["user_id"].as_str().unwrap())
        .collect();
    assert_eq!(users, vec!["user_typical", "user_risky", "user_typical"]);
}

#[test]
fn test_empty_batch() {
    let value = json(&run(&["batch"], Some("[]")));
    assert_eq!(value["count"], 0);
    assert_eq!(value["predictions"], serde_json::json!([]));
}

#[test]
fn test_malformed_request_fails() {
    let output = run(&["predict"], Some("{\"user_id\": 1"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid request"));
}

#[test]
fn test_bad_training_data_serves_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.jsonl");
    std::fs::write(&path, "not json\n").unwrap();

    let value = json(&run(
        &["predict", "--training-data", path.to_str().unwrap()],
        Some(RISKY),
    ));
    assert_eq!(value["risk_score"], 0.3);
    assert_eq!(value["is_fraud"], false);
    assert_eq!(value["risk_factors"], serde_json::json!([]));
    assert_eq!(value["confidence"], 0.0);
    assert_eq!(value["recommendation"], "APPROVE");
}

#[test]
fn test_bootstrap_round_trips_as_training_data() {
    let dir = tempfile::tempdir().unwrap();
    let train = dir.path().join("train.jsonl");
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"bootstrap": {"samples": 300, "anomalies": 15}}"#).unwrap();

    let output = run(
        &[
            "bootstrap",
            "--config",
            config.to_str().unwrap(),
            "--output",
            train.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success());
    let text = std::fs::read_to_string(&train).unwrap();
    assert_eq!(text.lines().count(), 300);

    let value = json(&run(
        &["health", "--training-data", train.to_str().unwrap()],
        None,
    ));
    assert_eq!(value["model_trained"], true);
}

#[test]
fn test_metrics_flag_writes_exposition() {
    let output = run(&["predict", "--metrics"], Some(TYPICAL));
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sentinel_predictions_total{recommendation="));
    assert!(stderr.contains("sentinel_model_trained 1"));
}
