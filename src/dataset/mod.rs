//! Tabular dataset loading.
//!
//! Training data is a CSV file with exactly the feature columns plus a
//! `label` column; inference batches carry the feature columns only. Header
//! validation happens before any row is parsed so a malformed file fails
//! fast with the offending column named.

use crate::error::{AppError, Result};
use crate::models::{ConflictRecord, LabeledRecord, FEATURE_COLUMNS, LABEL_COLUMN};
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column name → position map built from the CSV header row.
struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Build the index, failing on the first required column that is absent.
    fn new(headers: &StringRecord, required: &[&str]) -> Result<Self> {
        let positions: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();

        for column in required {
            if !positions.contains_key(*column) {
                return Err(AppError::MissingColumn {
                    column: (*column).to_string(),
                });
            }
        }

        Ok(Self { positions })
    }

    fn field<'a>(&self, row: &'a StringRecord, column: &str, line: u64) -> Result<&'a str> {
        let idx = self.positions.get(column).ok_or_else(|| AppError::MissingColumn {
            column: column.to_string(),
        })?;
        row.get(*idx).ok_or_else(|| {
            AppError::Dataset(format!("row {line}: missing value for column '{column}'"))
        })
    }

    fn float(&self, row: &StringRecord, column: &str, line: u64) -> Result<f64> {
        let raw = self.field(row, column, line)?;
        raw.trim().parse::<f64>().map_err(|_| {
            AppError::Dataset(format!(
                "row {line}: invalid numeric value '{raw}' for column '{column}'"
            ))
        })
    }

    fn integer(&self, row: &StringRecord, column: &str, line: u64) -> Result<i64> {
        let raw = self.field(row, column, line)?;
        raw.trim().parse::<i64>().map_err(|_| {
            AppError::Dataset(format!(
                "row {line}: invalid integer value '{raw}' for column '{column}'"
            ))
        })
    }

    fn label(&self, row: &StringRecord, line: u64) -> Result<u8> {
        let raw = self.field(row, LABEL_COLUMN, line)?;
        match raw.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(AppError::Dataset(format!(
                "row {line}: label must be 0 or 1, got '{other}'"
            ))),
        }
    }

    fn record(&self, row: &StringRecord, line: u64) -> Result<ConflictRecord> {
        Ok(ConflictRecord {
            country: self.field(row, "COUNTRY", line)?.trim().to_string(),
            admin1: self.field(row, "ADMIN1", line)?.trim().to_string(),
            total_events: self.float(row, "total_events", line)?,
            total_fatalities: self.float(row, "total_fatalities", line)?,
            rainfall_mm: self.float(row, "rainfall_mm", line)?,
            drought_index: self.float(row, "drought_index", line)?,
            temp_celsius: self.float(row, "temp_celsius", line)?,
            poverty_rate: self.float(row, "poverty_rate", line)?,
            literacy_rate: self.float(row, "literacy_rate", line)?,
            infrastructure_score: self.float(row, "infrastructure_score", line)?,
            past_conflicts_3mo: self.integer(row, "past_conflicts_3mo", line)?,
        })
    }
}

/// Read labeled training records from a CSV reader.
pub fn read_training_records<R: Read>(reader: R) -> Result<Vec<LabeledRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::Dataset(format!("failed to read CSV header: {e}")))?
        .clone();

    let mut required: Vec<&str> = FEATURE_COLUMNS.to_vec();
    required.push(LABEL_COLUMN);
    let index = HeaderIndex::new(&headers, &required)?;

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        // Header occupies line 1, so the first data row is line 2.
        let line = i as u64 + 2;
        let row = row.map_err(|e| AppError::Dataset(format!("row {line}: {e}")))?;
        let record = index.record(&row, line)?;
        let label = index.label(&row, line)?;
        records.push(LabeledRecord { record, label });
    }

    if records.is_empty() {
        return Err(AppError::Dataset("dataset contains no rows".to_string()));
    }

    Ok(records)
}

/// Read unlabeled inference records from a CSV reader.
pub fn read_inference_records<R: Read>(reader: R) -> Result<Vec<ConflictRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::Dataset(format!("failed to read CSV header: {e}")))?
        .clone();

    let index = HeaderIndex::new(&headers, &FEATURE_COLUMNS)?;

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let line = i as u64 + 2;
        let row = row.map_err(|e| AppError::Dataset(format!("row {line}: {e}")))?;
        records.push(index.record(&row, line)?);
    }

    if records.is_empty() {
        return Err(AppError::Dataset("batch contains no rows".to_string()));
    }

    Ok(records)
}

/// Load labeled training records from a CSV file on disk.
pub fn load_training_csv<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        AppError::Dataset(format!("failed to open dataset {}: {e}", path.display()))
    })?;
    read_training_records(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAINING_CSV: &str = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
Nigeria,Borno,12,30,85.5,0.4,31.2,62,48,3.1,4,1
Kenya,Turkana,3,1,40.0,0.7,28.5,55,60,4.5,0,0
";

    #[test]
    fn test_read_training_records() {
        let records = read_training_records(TRAINING_CSV.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.country, "Nigeria");
        assert_eq!(records[0].label, 1);
        assert_eq!(records[1].record.admin1, "Turkana");
        assert_eq!(records[1].label, 0);
        assert_eq!(records[1].record.past_conflicts_3mo, 0);
    }

    #[test]
    fn test_missing_column_is_named() {
        let csv = "\
COUNTRY,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
Nigeria,12,30,85.5,0.4,31.2,62,48,3.1,4,1
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        match err {
            AppError::MissingColumn { column } => assert_eq!(column, "ADMIN1"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_label_column_for_training() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo
Nigeria,Borno,12,30,85.5,0.4,31.2,62,48,3.1,4
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        match err {
            AppError::MissingColumn { column } => assert_eq!(column, "label"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_inference_records_do_not_require_label() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo
Nigeria,Borno,12,30,85.5,0.4,31.2,62,48,3.1,4
";
        let records = read_inference_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country, "Nigeria");
    }

    #[test]
    fn test_invalid_numeric_value_reports_row_and_column() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
Nigeria,Borno,twelve,30,85.5,0.4,31.2,62,48,3.1,4,1
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 2"));
        assert!(msg.contains("total_events"));
    }

    #[test]
    fn test_invalid_label_rejected() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
Nigeria,Borno,12,30,85.5,0.4,31.2,62,48,3.1,4,2
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("label must be 0 or 1"));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn test_non_integer_past_conflicts_rejected() {
        let csv = "\
COUNTRY,ADMIN1,total_events,total_fatalities,rainfall_mm,drought_index,temp_celsius,poverty_rate,literacy_rate,infrastructure_score,past_conflicts_3mo,label
Nigeria,Borno,12,30,85.5,0.4,31.2,62,48,3.1,4.5,1
";
        let err = read_training_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("past_conflicts_3mo"));
    }
}
