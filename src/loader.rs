//! CSV loader with storage-type inference.
//!
//! Reads CSV text into a [`DataFrame`](crate::dataframe::DataFrame). Every
//! textual missing-value marker is normalized to null before any column is
//! typed, so downstream stages only ever see one null representation.
//!
//! Storage types are inferred per column from the non-null values:
//! Integer if all parse as `i64`, else Float if all parse as finite `f64`,
//! else Text. Date-like detection is not done here; see
//! [`classify`](crate::classify).
//!
//! # Example
//!
//! ```
//! use u_partition::loader::CsvLoader;
//! use u_partition::dataframe::DataType;
//!
//! let csv = "name,age,score\nAlice,31,1.5\nBob,.,2.25\n";
//! let df = CsvLoader::new().load_str(csv).unwrap();
//! assert_eq!(df.row_count(), 2);
//! assert_eq!(df.column(0).unwrap().data_type(), DataType::Text);
//! assert_eq!(df.column(1).unwrap().data_type(), DataType::Integer);
//! assert_eq!(df.column(1).unwrap().null_count(), 1);
//! assert_eq!(df.column(2).unwrap().data_type(), DataType::Float);
//! ```

use crate::dataframe::{Column, DataFrame, DataType, ValidityBitmap};
use crate::error::PartitionError;
use std::path::Path;

/// Null markers recognized by default. `.` is included because it is the
/// conventional missing marker of the exports this tool consumes.
const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", ".", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", "NaN", "nan", "NAN",
    "#N/A", "#NA",
];

/// CSV loader configuration and entry point.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvLoader {
    /// Creates a loader with comma delimiter, header row and the default null markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Sets the field delimiter (default: comma).
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets whether the first row is a header (default: true).
    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Replaces the null markers.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Reads a CSV file from disk.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DataFrame, PartitionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let df = self.load_str(&content)?;
        tracing::info!(
            path = %path.display(),
            rows = df.row_count(),
            columns = df.column_count(),
            "loaded dataset"
        );
        Ok(df)
    }

    /// Parses CSV text.
    ///
    /// Empty input yields a DataFrame with no columns. A header with no data
    /// rows yields one zero-row text column per header field.
    pub fn load_str(&self, input: &str) -> Result<DataFrame, PartitionError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let records = self.split_records(input);
        let Some((_, first)) = records.first() else {
            return Ok(DataFrame::new());
        };

        let (headers, body) = if self.has_header {
            (first.clone(), &records[1..])
        } else {
            let headers = (0..first.len()).map(|i| format!("col_{i}")).collect();
            (headers, &records[..])
        };

        let n_cols = headers.len();
        let mut raw_columns: Vec<Vec<Option<&str>>> = vec![Vec::with_capacity(body.len()); n_cols];
        for (line, record) in body {
            if record.len() != n_cols {
                return Err(PartitionError::CsvParse {
                    line: *line,
                    message: format!("expected {n_cols} fields, got {}", record.len()),
                });
            }
            for (col, field) in record.iter().enumerate() {
                let trimmed = field.trim();
                raw_columns[col].push((!self.is_null(trimmed)).then_some(trimmed));
            }
        }

        let mut df = DataFrame::new();
        for (name, raw) in headers.into_iter().zip(raw_columns) {
            let column = build_column(&raw);
            tracing::debug!(column = %name, dtype = %column.data_type(), nulls = column.null_count(), "inferred column type");
            df.add_column(name, column)?;
        }
        Ok(df)
    }

    fn is_null(&self, trimmed: &str) -> bool {
        self.null_markers.iter().any(|m| m == trimmed)
    }

    /// Splits RFC 4180 text into records of unquoted fields, each tagged
    /// with the 1-based physical line it starts on.
    fn split_records(&self, input: &str) -> Vec<(usize, Vec<String>)> {
        let delim = self.delimiter as char;
        let mut records: Vec<(usize, Vec<String>)> = Vec::new();
        let mut record: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut line = 1;
        let mut start_line = 1;
        let mut chars = input.chars().peekable();

        let mut end_record = |start: usize, record: &mut Vec<String>, field: &mut String| {
            record.push(std::mem::take(field));
            // Blank lines carry no record.
            if record.len() > 1 || !record[0].is_empty() {
                records.push((start, std::mem::take(record)));
            } else {
                record.clear();
            }
        };

        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ if in_quotes => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
                '"' if field.is_empty() => in_quotes = true,
                c if c == delim => record.push(std::mem::take(&mut field)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' | '\r' => {
                    end_record(start_line, &mut record, &mut field);
                    line += 1;
                    start_line = line;
                }
                _ => field.push(c),
            }
        }
        if !field.is_empty() || !record.is_empty() {
            end_record(start_line, &mut record, &mut field);
        }
        records
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Types a column from its non-null raw values.
fn build_column(raw: &[Option<&str>]) -> Column {
    let validity = ValidityBitmap::from_flags(raw.iter().map(Option::is_some));
    match infer_type(raw) {
        DataType::Integer => Column::integer(
            raw.iter()
                .map(|v| v.and_then(|s| s.parse().ok()).unwrap_or(0))
                .collect(),
            validity,
        ),
        DataType::Float => Column::float(
            raw.iter()
                .map(|v| v.and_then(|s| s.parse().ok()).unwrap_or(0.0))
                .collect(),
            validity,
        ),
        DataType::Text => Column::text(
            raw.iter().map(|v| v.unwrap_or_default().to_string()).collect(),
            validity,
        ),
    }
}

fn infer_type(raw: &[Option<&str>]) -> DataType {
    let mut non_null = raw.iter().flatten().peekable();
    if non_null.peek().is_none() {
        return DataType::Text;
    }
    if raw.iter().flatten().all(|s| s.parse::<i64>().is_ok()) {
        DataType::Integer
    } else if raw
        .iter()
        .flatten()
        .all(|s| s.parse::<f64>().is_ok_and(f64::is_finite))
    {
        DataType::Float
    } else {
        DataType::Text
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
