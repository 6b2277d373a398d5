//! # sentinel-core - Transaction Fraud Scoring
//!
//! Unsupervised anomaly scoring for payment transactions, mapped to an
//! actionable recommendation.
//!
//! ## Pipeline
//!
//! ```text
//! TransactionRecord
//!        │
//!        ▼
//!  FeatureVector (amount, previous_transaction_count, account_age_days)
//!        │
//!        ▼
//!  StandardScaler ──► IsolationForest ──► (label, anomaly score)
//!                                               │
//!                                               ▼
//!                              sigmoid ──► risk score ──► Recommendation
//!                                               │
//!                                               ▼
//!                                   rule-based risk factors
//! ```
//!
//! The scaler and the forest are fitted once from a [`TrainingSource`] and
//! frozen inside a [`FraudModel`]. Every scoring call reads that frozen state
//! only, so one model can be cloned across threads and scored concurrently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinel_core::{FraudModel, SentinelConfig, SyntheticBootstrap, TransactionRecord};
//!
//! let config = SentinelConfig::default();
//! let source = SyntheticBootstrap::new(config.bootstrap.clone());
//! let model = FraudModel::train(&source, &config);
//!
//! let record = TransactionRecord::new("user_42", 9_500.0, "USD")
//!     .with_history(1)
//!     .with_account_age(5);
//!
//! match model.predict("txn_1", &record) {
//!     Ok(result) => println!("{} -> {}", result.risk_score, result.recommendation),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! The risk score is a sigmoid squashing of the raw forest score. It orders
//! transactions by how isolable they are but is not calibrated against real
//! fraud base rates and must not be read as a probability of fraud.

pub mod algo;
pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod policy;
pub mod signal;
pub mod transaction;

pub use algo::{IsolationForest, IsolationLabel, StandardScaler};
pub use bootstrap::{
    BootstrapConfig, BootstrapError, JsonLinesSource, StaticSource, SyntheticBootstrap,
    TrainingSource,
};
pub use config::{ConfigError, ModelConfig, SentinelConfig};
pub use engine::{FraudModel, PredictionError, ScoringStage, TrainedModel, TrainingError};
pub use policy::{Recommendation, RiskFactor, RuleThresholds};
pub use signal::{Assessment, BatchPrediction, ModelInfo, PredictionResult};
pub use transaction::{FEATURE_NAMES, FeatureVector, TransactionRecord};
