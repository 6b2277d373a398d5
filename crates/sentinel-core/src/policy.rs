//! Risk-Factor Rules and Recommendation Policy
//!
//! Deterministic annotations layered on top of the forest output. Rules are
//! simple thresholds on the raw record and do not feed back into the score.

use crate::transaction::TransactionRecord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Thresholds for the risk-factor rules and the review cut-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Amounts strictly above this are flagged
    pub high_amount: f64,
    /// Histories strictly below this are flagged
    pub min_history: u64,
    /// Accounts younger than this many days are flagged
    pub recent_account_days: u64,
    /// Risk scores strictly above this go to manual review
    pub manual_review_score: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            high_amount: 5_000.0,
            min_history: 5,
            recent_account_days: 30,
            manual_review_score: 0.7,
        }
    }
}

/// Human-readable reason attached to a prediction.
///
/// Serialized as its description string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskFactor {
    HighAmount,
    LimitedHistory,
    RecentAccount,
    AnomalousPattern,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 4] = [
        Self::HighAmount,
        Self::LimitedHistory,
        Self::RecentAccount,
        Self::AnomalousPattern,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Self::HighAmount => "High transaction amount",
            Self::LimitedHistory => "New account with limited history",
            Self::RecentAccount => "Very recent account creation",
            Self::AnomalousPattern => "Anomalous transaction pattern detected",
        }
    }

    pub fn from_description(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.description() == text)
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

impl Serialize for RiskFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.description())
    }
}

impl<'de> Deserialize<'de> for RiskFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_description(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown risk factor: {}", text)))
    }
}

/// Evaluate every rule independently, in fixed order:
/// amount, history, account age, anomaly flag
pub fn risk_factors(
    record: &TransactionRecord,
    is_fraud: bool,
    thresholds: &RuleThresholds,
) -> Vec<RiskFactor> {
    let mut factors = Vec::with_capacity(RiskFactor::ALL.len());

    if record.amount > thresholds.high_amount {
        factors.push(RiskFactor::HighAmount);
    }
    if record.previous_transaction_count < thresholds.min_history {
        factors.push(RiskFactor::LimitedHistory);
    }
    if record.account_age_days < thresholds.recent_account_days {
        factors.push(RiskFactor::RecentAccount);
    }
    if is_fraud {
        factors.push(RiskFactor::AnomalousPattern);
    }

    factors
}

/// Action the caller should take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    ManualReview,
    Block,
}

impl Recommendation {
    /// First match wins: anomalous blocks, a high score goes to review,
    /// everything else is approved
    pub fn decide(is_fraud: bool, risk_score: f64, thresholds: &RuleThresholds) -> Self {
        if is_fraud {
            Self::Block
        } else if risk_score > thresholds.manual_review_score {
            Self::ManualReview
        } else {
            Self::Approve
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::ManualReview => "MANUAL_REVIEW",
            Self::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: f64, history: u64, age: u64) -> TransactionRecord {
        TransactionRecord::new("u", amount, "USD")
            .with_history(history)
            .with_account_age(age)
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let factors = risk_factors(&record(9_500.0, 1, 5), true, &RuleThresholds::default());
        assert_eq!(factors, RiskFactor::ALL.to_vec());
    }

    #[test]
    fn test_no_rules_fire() {
        let factors = risk_factors(&record(50.0, 30, 400), false, &RuleThresholds::default());
        assert!(factors.is_empty());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let t = RuleThresholds::default();
        // Exactly on each boundary: nothing fires
        assert!(risk_factors(&record(5_000.0, 5, 30), false, &t).is_empty());
        assert_eq!(
            risk_factors(&record(5_000.01, 4, 29), false, &t),
            vec![
                RiskFactor::HighAmount,
                RiskFactor::LimitedHistory,
                RiskFactor::RecentAccount
            ]
        );
    }

    #[test]
    fn test_subset_keeps_relative_order() {
        let factors = risk_factors(&record(10.0, 2, 400), true, &RuleThresholds::default());
        assert_eq!(
            factors,
            vec![RiskFactor::LimitedHistory, RiskFactor::AnomalousPattern]
        );
    }

    #[test]
    fn test_recommendation_precedence() {
        let t = RuleThresholds::default();
        assert_eq!(Recommendation::decide(true, 0.1, &t), Recommendation::Block);
        assert_eq!(Recommendation::decide(true, 0.9, &t), Recommendation::Block);
        assert_eq!(Recommendation::decide(false, 0.71, &t), Recommendation::ManualReview);
        assert_eq!(Recommendation::decide(false, 0.7, &t), Recommendation::Approve);
        assert_eq!(Recommendation::decide(false, 0.2, &t), Recommendation::Approve);
    }

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Recommendation::ManualReview).unwrap(),
            "\"MANUAL_REVIEW\""
        );
        assert_eq!(
            serde_json::to_string(&RiskFactor::RecentAccount).unwrap(),
            "\"Very recent account creation\""
        );

        let parsed: RiskFactor = serde_json::from_str("\"High transaction amount\"").unwrap();
        assert_eq!(parsed, RiskFactor::HighAmount);
        assert!(serde_json::from_str::<RiskFactor>("\"Something else\"").is_err());
    }
}
