//! Transaction input and the numeric feature view the model is fitted on.

use serde::{Deserialize, Serialize};

/// Number of numeric features the model consumes
pub const NUM_FEATURES: usize = 3;

/// Feature names as published by the model descriptor, in vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["amount", "transaction_count", "account_age_days"];

/// A single transaction submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user_id: String,
    /// Currency-denominated amount
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub merchant_category: Option<String>,
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    #[serde(default)]
    pub ip_country: Option<String>,
    /// Prior transactions by this user
    #[serde(default)]
    pub previous_transaction_count: u64,
    #[serde(default)]
    pub account_age_days: u64,
}

impl TransactionRecord {
    pub fn new(user_id: impl Into<String>, amount: f64, currency: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
            merchant_category: None,
            device_fingerprint: None,
            ip_country: None,
            previous_transaction_count: 0,
            account_age_days: 0,
        }
    }

    pub fn with_history(mut self, previous_transaction_count: u64) -> Self {
        self.previous_transaction_count = previous_transaction_count;
        self
    }

    pub fn with_account_age(mut self, account_age_days: u64) -> Self {
        self.account_age_days = account_age_days;
        self
    }

    pub fn with_merchant_category(mut self, category: impl Into<String>) -> Self {
        self.merchant_category = Some(category.into());
        self
    }

    pub fn with_ip_country(mut self, country: impl Into<String>) -> Self {
        self.ip_country = Some(country.into());
        self
    }

    pub fn with_device_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.device_fingerprint = Some(fingerprint.into());
        self
    }

    /// Numeric view of this record in model order
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_record(self)
    }
}

/// Ordered (amount, previous_transaction_count, account_age_days) triple.
///
/// The order is the one the scaler and forest are fitted with. Serialized
/// with named fields so training files stay readable; `transaction_count`
/// is accepted as an alias for the history column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedFeatures", into = "NamedFeatures")]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    pub fn new(amount: f64, previous_transaction_count: f64, account_age_days: f64) -> Self {
        Self([amount, previous_transaction_count, account_age_days])
    }

    pub fn from_record(record: &TransactionRecord) -> Self {
        Self::new(
            record.amount,
            record.previous_transaction_count as f64,
            record.account_age_days as f64,
        )
    }

    pub fn amount(&self) -> f64 {
        self.0[0]
    }

    pub fn previous_transaction_count(&self) -> f64 {
        self.0[1]
    }

    pub fn account_age_days(&self) -> f64 {
        self.0[2]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub(crate) fn set_amount(&mut self, amount: f64) {
        self.0[0] = amount;
    }

    pub(crate) fn set_previous_transaction_count(&mut self, count: f64) {
        self.0[1] = count;
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl From<&TransactionRecord> for FeatureVector {
    fn from(record: &TransactionRecord) -> Self {
        Self::from_record(record)
    }
}

#[derive(Serialize, Deserialize)]
struct NamedFeatures {
    amount: f64,
    #[serde(default, alias = "transaction_count")]
    previous_transaction_count: f64,
    #[serde(default)]
    account_age_days: f64,
}

impl From<NamedFeatures> for FeatureVector {
    fn from(named: NamedFeatures) -> Self {
        Self::new(
            named.amount,
            named.previous_transaction_count,
            named.account_age_days,
        )
    }
}

impl From<FeatureVector> for NamedFeatures {
    fn from(features: FeatureVector) -> Self {
        Self {
            amount: features.amount(),
            previous_transaction_count: features.previous_transaction_count(),
            account_age_days: features.account_age_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_is_fixed() {
        let record = TransactionRecord::new("u1", 120.5, "EUR")
            .with_history(7)
            .with_account_age(365);

        let features = record.features();
        assert_eq!(features.as_slice(), &[120.5, 7.0, 365.0]);
    }

    #[test]
    fn test_record_defaults_when_fields_missing() {
        let json = r#"{"user_id":"u9","amount":42.0,"currency":"USD"}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.previous_transaction_count, 0);
        assert_eq!(record.account_age_days, 0);
        assert!(record.merchant_category.is_none());
    }

    #[test]
    fn test_feature_vector_accepts_record_json() {
        let json = r#"{"user_id":"u3","amount":10.0,"currency":"USD","previous_transaction_count":4,"account_age_days":12}"#;
        let features: FeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(features, FeatureVector::new(10.0, 4.0, 12.0));
    }

    #[test]
    fn test_feature_vector_alias_and_serialization() {
        let json = r#"{"amount":3.5,"transaction_count":2,"account_age_days":9}"#;
        let features: FeatureVector = serde_json::from_str(json).unwrap();
        assert_eq!(features.previous_transaction_count(), 2.0);

        let value = serde_json::to_value(features).unwrap();
        assert_eq!(value["previous_transaction_count"], 2.0);
        assert_eq!(value["amount"], 3.5);
    }
}
