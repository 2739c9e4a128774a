//! Error types for u-partition.
//!
//! An infeasible partition is not an error: it is reported through
//! [`DistributionVerdict`](crate::partition::DistributionVerdict) inside a
//! successful outcome.

use crate::date::ParseFailure;

/// All errors produced by u-partition operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// A column cannot be classified or encoded (e.g. every value is null).
    #[error("column '{column}' failed data quality check: {reason}")]
    DataQuality { column: String, reason: String },

    /// A caller-supplied parameter is out of range.
    #[error("invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// The dataset has no rows to partition.
    #[error("cannot partition an empty dataset ({rows} rows)")]
    EmptyDataset { rows: usize },

    /// A value did not parse as a date.
    #[error(transparent)]
    ParseFailure(#[from] ParseFailure),

    /// Column not found in DataFrame.
    #[error("column '{name}' not found")]
    ColumnNotFound { name: String },

    /// A column with this name already exists in the DataFrame.
    #[error("column '{name}' already exists")]
    DuplicateColumn { name: String },

    /// Column length does not match the DataFrame row count.
    #[error("expected {expected} rows, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// CSV parsing failed.
    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PartitionError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl PartitionError {
    pub(crate) fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn data_quality(column: &str, reason: impl Into<String>) -> Self {
        Self::DataQuality {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
