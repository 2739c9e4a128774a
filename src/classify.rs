//! Semantic column classification.
//!
//! Each selected column is assigned exactly one [`ColumnKind`]. The checks
//! run in a fixed order, and the first match wins:
//!
//! 1. **DateLike**: every non-null value parses under
//!    [`parse_date`](crate::date::parse_date). Text and integer columns are
//!    checked through their text form, so `20210101` counts as a date.
//! 2. **Categorical**: the storage type is text.
//! 3. **Numeric**: the storage type is integer or float.
//!
//! Checking temporal meaning before storage type means an integer column
//! of `YYYYMMDD` stamps is treated as dates, not as plain numbers.
//!
//! # Example
//!
//! ```
//! use u_partition::classify::{classify_column, ColumnKind};
//! use u_partition::dataframe::Column;
//!
//! let dates = Column::from_str_options(&[Some("2021-01-01"), Some("2021-02-01")]);
//! assert_eq!(classify_column("d", &dates).unwrap(), ColumnKind::DateLike);
//!
//! let mixed = Column::from_str_options(&[Some("2021-01-01"), Some("bad")]);
//! assert_eq!(classify_column("m", &mixed).unwrap(), ColumnKind::Categorical);
//! ```

use crate::clustering::DbscanConfig;
use crate::dataframe::{Column, DataFrame, DataType};
use crate::date::{parse_date, ParseFailure, ParsedDate};
use crate::error::PartitionError;

// ── ColumnKind ────────────────────────────────────────────────────────

/// Semantic kind of a selected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ColumnKind {
    /// Every non-null value is a date or timestamp.
    DateLike,
    /// Text values without temporal meaning.
    Categorical,
    /// Integer or floating-point values.
    Numeric,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateLike => write!(f, "date-like"),
            Self::Categorical => write!(f, "categorical"),
            Self::Numeric => write!(f, "numeric"),
        }
    }
}

/// How date-like columns are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DateStrategy {
    /// Equal-width interval binning on the day axis.
    #[default]
    Bin,
    /// DBSCAN clustering on the day axis.
    Cluster(DbscanConfig),
}

/// Encoding applied to a classified column.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum Encoding {
    /// Sorted label encoding (categorical).
    Label,
    /// Equal-width interval binning (numeric, date-like).
    Interval,
    /// Density clustering (date-like).
    Cluster(DbscanConfig),
}

impl Encoding {
    /// Suffix appended to the source name to form the encoded column name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Label => "_encoded",
            Self::Interval => "_interval",
            Self::Cluster(_) => "_cluster",
        }
    }
}

// ── ColumnDescriptor ──────────────────────────────────────────────────

/// Classification of one selected column, built once per run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnDescriptor {
    /// Source column name.
    pub name: String,
    /// Inferred semantic kind.
    pub kind: ColumnKind,
    /// Encoding chosen for `kind`.
    pub encoding: Encoding,
    /// Name of the derived column the encoder appends.
    pub encoded_name: String,
}

impl ColumnDescriptor {
    /// Pairs `kind` with its encoding and derives the encoded column name.
    pub fn new(name: &str, kind: ColumnKind, dates: DateStrategy) -> Self {
        let encoding = match (kind, dates) {
            (ColumnKind::Categorical, _) => Encoding::Label,
            (ColumnKind::Numeric, _) | (ColumnKind::DateLike, DateStrategy::Bin) => {
                Encoding::Interval
            }
            (ColumnKind::DateLike, DateStrategy::Cluster(config)) => Encoding::Cluster(config),
        };
        Self {
            name: name.to_string(),
            kind,
            encoding,
            encoded_name: format!("{name}{}", encoding.suffix()),
        }
    }
}

// ── Classification ────────────────────────────────────────────────────

/// Classifies a single column.
///
/// # Errors
///
/// [`PartitionError::DataQuality`] if the column has rows but every value
/// is null. A column with zero rows is classified as categorical.
pub fn classify_column(name: &str, column: &Column) -> Result<ColumnKind, PartitionError> {
    if column.is_empty() {
        return Ok(ColumnKind::Categorical);
    }
    if column.null_count() == column.len() {
        return Err(PartitionError::data_quality(
            name,
            format!("all {} values are null", column.len()),
        ));
    }

    if parse_date_column(column).is_ok() {
        return Ok(ColumnKind::DateLike);
    }
    Ok(match column.data_type() {
        DataType::Text => ColumnKind::Categorical,
        DataType::Integer | DataType::Float => ColumnKind::Numeric,
    })
}

/// Classifies every selected column in selection order.
///
/// All columns are classified or none: the first failure aborts.
///
/// # Errors
///
/// - [`PartitionError::InvalidArgument`] if `selected` is empty
/// - [`PartitionError::ColumnNotFound`] for an unknown column name
/// - any error from [`classify_column`]
pub fn classify_columns(
    df: &DataFrame,
    selected: &[String],
    dates: DateStrategy,
) -> Result<Vec<ColumnDescriptor>, PartitionError> {
    if selected.is_empty() {
        return Err(PartitionError::invalid_argument(
            "columns",
            "at least one column must be selected",
        ));
    }

    selected
        .iter()
        .map(|name| {
            let column = df.require_column(name)?;
            let kind = classify_column(name, column)?;
            let descriptor = ColumnDescriptor::new(name, kind, dates);
            tracing::debug!(
                column = %name,
                dtype = %column.data_type(),
                %kind,
                encoded = %descriptor.encoded_name,
                "classified column"
            );
            Ok(descriptor)
        })
        .collect()
}

/// Parses every non-null value of a text or integer column as a date.
///
/// Fails on the first unparseable value. Float columns never parse.
pub fn parse_date_column(column: &Column) -> Result<Vec<Option<ParsedDate>>, ParseFailure> {
    if column.data_type() == DataType::Float {
        let first = (0..column.len()).find_map(|i| column.display_at(i));
        return Err(ParseFailure::new(first.unwrap_or_default()));
    }
    (0..column.len())
        .map(|i| column.display_at(i).map(|s| parse_date(&s)).transpose())
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────
