//! sentinel-cli - Command-line front end for SentinelPay fraud scoring
//!
//! Wraps a trained [`sentinel_core::FraudModel`] with the pieces a caller
//! needs around it: request parsing, correlation ids, an audit trail,
//! sharded batch scoring and process-wide metrics.

pub mod audit;
pub mod error;
pub mod input;
pub mod metrics;
pub mod service;
pub mod shard;

pub use error::CliError;
pub use service::{BatchResponse, HealthStatus, ScoringService};
pub use shard::ShardPool;
