//! Domain types shared across the pipeline, inference service, and API.

use serde::{Deserialize, Serialize};

/// Fixed feature order used at both fit and predict time.
///
/// The first two columns are categorical and are integer-encoded by the
/// feature codec; the remaining nine pass through as numbers.
pub const FEATURE_COLUMNS: [&str; 11] = [
    "COUNTRY",
    "ADMIN1",
    "total_events",
    "total_fatalities",
    "rainfall_mm",
    "drought_index",
    "temp_celsius",
    "poverty_rate",
    "literacy_rate",
    "infrastructure_score",
    "past_conflicts_3mo",
];

/// Categorical columns, in feature order.
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["COUNTRY", "ADMIN1"];

/// Number of features in the encoded vector.
pub const NUM_FEATURES: usize = FEATURE_COLUMNS.len();

/// Label column present in training data only.
pub const LABEL_COLUMN: &str = "label";

/// Class label: 1 = conflict, 0 = no conflict.
pub type Label = u8;

/// One observation, without a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    #[serde(rename = "COUNTRY")]
    pub country: String,

    #[serde(rename = "ADMIN1")]
    pub admin1: String,

    pub total_events: f64,

    pub total_fatalities: f64,

    pub rainfall_mm: f64,

    pub drought_index: f64,

    pub temp_celsius: f64,

    pub poverty_rate: f64,

    pub literacy_rate: f64,

    pub infrastructure_score: f64,

    pub past_conflicts_3mo: i64,
}

impl ConflictRecord {
    /// Numeric fields in feature order (everything after the two
    /// categorical columns).
    pub fn numeric_features(&self) -> [f64; 9] {
        [
            self.total_events,
            self.total_fatalities,
            self.rainfall_mm,
            self.drought_index,
            self.temp_celsius,
            self.poverty_rate,
            self.literacy_rate,
            self.infrastructure_score,
            self.past_conflicts_3mo as f64,
        ]
    }
}

/// A training observation: record plus class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub record: ConflictRecord,
    pub label: Label,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record() -> ConflictRecord {
        ConflictRecord {
            country: "Nigeria".to_string(),
            admin1: "Borno".to_string(),
            total_events: 12.0,
            total_fatalities: 30.0,
            rainfall_mm: 85.5,
            drought_index: 0.4,
            temp_celsius: 31.2,
            poverty_rate: 62.0,
            literacy_rate: 48.0,
            infrastructure_score: 3.1,
            past_conflicts_3mo: 4,
        }
    }

    #[test]
    fn test_feature_order_is_fixed() {
        assert_eq!(FEATURE_COLUMNS[0], "COUNTRY");
        assert_eq!(FEATURE_COLUMNS[1], "ADMIN1");
        assert_eq!(FEATURE_COLUMNS[10], "past_conflicts_3mo");
        assert_eq!(NUM_FEATURES, 11);
    }

    #[test]
    fn test_numeric_features_follow_feature_order() {
        let record = sample_record();
        let numeric = record.numeric_features();

        assert_eq!(numeric.len(), NUM_FEATURES - CATEGORICAL_COLUMNS.len());
        assert_eq!(numeric[0], 12.0);
        assert_eq!(numeric[8], 4.0);
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"COUNTRY\""));
        assert!(json.contains("\"ADMIN1\""));

        let back: ConflictRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
