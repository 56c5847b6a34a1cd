use crate::error::{AppError, Result};
use crate::models::{ConflictRecord, NUM_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Deterministic string → integer mapping for one categorical column.
///
/// Codes are assigned in ascending lexical order of the distinct values
/// observed at fit time, so two fits over the same data always produce the
/// same mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    column: String,
    mapping: BTreeMap<String, usize>,
}

impl CategoryEncoder {
    /// Fit the encoder on the distinct values of a column.
    pub fn fit<'a, I>(column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        if distinct.is_empty() {
            return Err(AppError::MissingColumn {
                column: column.to_string(),
            });
        }

        let mapping = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code))
            .collect();

        Ok(Self {
            column: column.to_string(),
            mapping,
        })
    }

    /// Encode a value using the training-time mapping only.
    pub fn encode(&self, value: &str) -> Result<usize> {
        self.mapping
            .get(value)
            .copied()
            .ok_or_else(|| AppError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Number of distinct categories observed at fit time.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Column this encoder belongs to.
    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Maps raw records to fixed-order numeric feature vectors.
///
/// The vector layout is `[COUNTRY, ADMIN1, <nine numeric columns>]`, the
/// same at fit and predict time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCodec {
    country: CategoryEncoder,
    admin1: CategoryEncoder,
}

impl FeatureCodec {
    /// Fit both categorical encoders on the training records.
    pub fn fit(records: &[ConflictRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(AppError::Dataset(
                "cannot fit feature codec on an empty dataset".to_string(),
            ));
        }

        let country = CategoryEncoder::fit(
            "COUNTRY",
            records.iter().map(|r| r.country.as_str()),
        )?;
        let admin1 = CategoryEncoder::fit(
            "ADMIN1",
            records.iter().map(|r| r.admin1.as_str()),
        )?;

        Ok(Self { country, admin1 })
    }

    /// Encode one record into the fixed-order feature vector.
    ///
    /// Fails with `UnknownCategory` if either categorical value was not
    /// observed at fit time.
    pub fn encode(&self, record: &ConflictRecord) -> Result<Vec<f64>> {
        let mut features = Vec::with_capacity(NUM_FEATURES);
        features.push(self.country.encode(&record.country)? as f64);
        features.push(self.admin1.encode(&record.admin1)? as f64);
        features.extend_from_slice(&record.numeric_features());
        Ok(features)
    }

    /// Encode records row-wise.
    ///
    /// A row with an unknown category fails on its own without aborting the
    /// batch; results stay aligned with the input order.
    pub fn encode_batch(&self, records: &[ConflictRecord]) -> Vec<Result<Vec<f64>>> {
        records.iter().map(|r| self.encode(r)).collect()
    }

    pub fn country_encoder(&self) -> &CategoryEncoder {
        &self.country
    }

    pub fn admin1_encoder(&self) -> &CategoryEncoder {
        &self.admin1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, admin1: &str) -> ConflictRecord {
        ConflictRecord {
            country: country.to_string(),
            admin1: admin1.to_string(),
            total_events: 5.0,
            total_fatalities: 2.0,
            rainfall_mm: 60.0,
            drought_index: 0.3,
            temp_celsius: 29.0,
            poverty_rate: 50.0,
            literacy_rate: 55.0,
            infrastructure_score: 4.0,
            past_conflicts_3mo: 1,
        }
    }

    #[test]
    fn test_encoder_codes_are_sorted_and_contiguous() {
        let encoder =
            CategoryEncoder::fit("COUNTRY", ["Nigeria", "Kenya", "Nigeria", "Ethiopia"]).unwrap();

        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.encode("Ethiopia").unwrap(), 0);
        assert_eq!(encoder.encode("Kenya").unwrap(), 1);
        assert_eq!(encoder.encode("Nigeria").unwrap(), 2);
    }

    #[test]
    fn test_encoder_is_deterministic_across_input_order() {
        let a = CategoryEncoder::fit("COUNTRY", ["Kenya", "Nigeria"]).unwrap();
        let b = CategoryEncoder::fit("COUNTRY", ["Nigeria", "Kenya", "Kenya"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_category_carries_column_and_value() {
        let encoder = CategoryEncoder::fit("COUNTRY", ["Nigeria", "Kenya"]).unwrap();
        let err = encoder.encode("Mali").unwrap_err();
        match err {
            AppError::UnknownCategory { column, value } => {
                assert_eq!(column, "COUNTRY");
                assert_eq!(value, "Mali");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn test_codec_encodes_in_fixed_order() {
        let records = vec![record("Nigeria", "Borno"), record("Kenya", "Turkana")];
        let codec = FeatureCodec::fit(&records).unwrap();

        let features = codec.encode(&records[0]).unwrap();
        assert_eq!(features.len(), NUM_FEATURES);
        // Kenya < Nigeria lexically, so Nigeria encodes to 1.
        assert_eq!(features[0], 1.0);
        // Borno < Turkana, so Borno encodes to 0.
        assert_eq!(features[1], 0.0);
        assert_eq!(features[2], 5.0);
        assert_eq!(features[10], 1.0);
    }

    #[test]
    fn test_encode_batch_isolates_failures_per_row() {
        let training = vec![record("Nigeria", "Borno"), record("Kenya", "Turkana")];
        let codec = FeatureCodec::fit(&training).unwrap();

        let batch = vec![
            record("Nigeria", "Borno"),
            record("Mali", "Gao"),
            record("Kenya", "Turkana"),
        ];
        let encoded = codec.encode_batch(&batch);

        assert_eq!(encoded.len(), 3);
        assert!(encoded[0].is_ok());
        assert!(encoded[1].is_err());
        assert!(encoded[2].is_ok());
    }

    #[test]
    fn test_codec_fit_rejects_empty_input() {
        let err = FeatureCodec::fit(&[]).unwrap_err();
        assert!(matches!(err, AppError::Dataset(_)));
    }
}
