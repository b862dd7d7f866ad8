use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("plate is required")]
    MissingPlate,

    #[error("year {0} is out of range (1900-2100)")]
    YearOutOfRange(i32),

    #[error("unsupported document type: {doc_type} (allowed: {allowed})")]
    UnsupportedDocType { doc_type: String, allowed: String },

    #[error("{0} is not a maintenance document type")]
    NotMaintenance(String),

    #[error("invalid {field} date: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("valid_from {valid_from} is after valid_to {valid_to}")]
    InvertedValidity { valid_from: String, valid_to: String },

    #[error("odometer reading {0} does not fit in 9 digits")]
    OdometerOutOfRange(u64),

    #[error("invalid thresholds: critical={critical} warning={warning}")]
    InvalidThresholds { critical: i64, warning: i64 },
}
