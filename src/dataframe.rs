//! Column-major DataFrame for tabular data.
//!
//! The [`DataFrame`] stores data in column-major order with typed columns
//! and a compact validity bitmap for tracking missing values. Columns are
//! append-only: derived columns (encodings, group numbers) are added next
//! to their sources and never replace them.
//!
//! # Column Types
//!
//! | Type | Storage | Use case |
//! |------|---------|----------|
//! | [`Integer`](Column::Integer) | `Vec<i64>` + bitmap | Integer values, encoded codes |
//! | [`Float`](Column::Float) | `Vec<f64>` + bitmap | Continuous values |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | Free-form or date-like strings |
//!
//! # Example
//!
//! ```
//! use u_partition::dataframe::{DataFrame, Column, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "temperature".to_string(),
//!     Column::float(vec![20.5, 21.3, 19.8], ValidityBitmap::all_valid(3)),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.column_count(), 1);
//! ```

use crate::error::PartitionError;

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap using `Vec<u64>`.
///
/// Each bit indicates whether the corresponding row is valid (1) or
/// missing/null (0).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Builds a bitmap from per-row flags (`true` = valid).
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let mut bm = Self::empty();
        for valid in flags {
            bm.push(valid);
        }
        bm
    }

    /// Returns `true` if the value at `idx` is valid (not null).
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Appends a new position (valid or invalid).
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        if idx / 64 >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[idx / 64] |= 1u64 << (idx % 64);
        }
    }

    /// Returns the total number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks zero positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts the number of valid (non-null) positions.
    pub fn valid_count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Counts the number of null (invalid) positions.
    pub fn null_count(&self) -> usize {
        self.len - self.valid_count()
    }
}

// ── DataType ──────────────────────────────────────────────────────────

/// Storage type of a column, as declared or inferred by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DataType {
    /// 64-bit signed integers.
    Integer,
    /// 64-bit floating point.
    Float,
    /// UTF-8 strings.
    Text,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Float => write!(f, "Float"),
            Self::Text => write!(f, "Text"),
        }
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with validity bitmap for missing values.
///
/// Invalid positions hold a default value (0, 0.0, or an empty string)
/// that must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `i64` values. Null positions hold `0`.
    Integer {
        values: Vec<i64>,
        validity: ValidityBitmap,
    },
    /// Dense `f64` values. Null positions hold `0.0`.
    Float {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Text values. Null positions hold an empty string.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    /// Creates an integer column.
    pub fn integer(values: Vec<i64>, validity: ValidityBitmap) -> Self {
        Self::Integer { values, validity }
    }

    /// Creates a floating-point column.
    pub fn float(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Float { values, validity }
    }

    /// Creates a text column.
    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Creates a fully-valid integer column.
    pub fn from_i64(values: Vec<i64>) -> Self {
        let validity = ValidityBitmap::all_valid(values.len());
        Self::Integer { values, validity }
    }

    /// Creates a float column, treating `None` and NaN as null.
    pub fn from_f64_options(values: &[Option<f64>]) -> Self {
        let validity =
            ValidityBitmap::from_flags(values.iter().map(|v| v.is_some_and(|x| !x.is_nan())));
        let values = values.iter().map(|v| v.unwrap_or(0.0)).collect();
        Self::Float { values, validity }
    }

    /// Creates a text column, treating `None` as null.
    pub fn from_str_options(values: &[Option<&str>]) -> Self {
        let validity = ValidityBitmap::from_flags(values.iter().map(Option::is_some));
        let values = values
            .iter()
            .map(|v| v.map(str::to_string).unwrap_or_default())
            .collect();
        Self::Text { values, validity }
    }

    /// Returns the storage type of this column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer { .. } => DataType::Integer,
            Self::Float { .. } => DataType::Float,
            Self::Text { .. } => DataType::Text,
        }
    }

    /// Returns the number of rows in this column.
    pub fn len(&self) -> usize {
        self.validity().len()
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the validity bitmap.
    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Integer { validity, .. }
            | Self::Float { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    /// Returns the number of null values.
    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    /// Returns `true` if the value at `idx` is valid (not null).
    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the integer values, or `None` if not an integer column.
    pub fn as_integer(&self) -> Option<&[i64]> {
        match self {
            Self::Integer { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Returns the float values, or `None` if not a float column.
    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            Self::Float { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Numeric value at `idx`, or `None` for nulls, NaN, and text columns.
    pub fn f64_at(&self, idx: usize) -> Option<f64> {
        if !self.is_valid(idx) {
            return None;
        }
        match self {
            Self::Integer { values, .. } => Some(values[idx] as f64),
            Self::Float { values, .. } => Some(values[idx]).filter(|v| !v.is_nan()),
            Self::Text { .. } => None,
        }
    }

    /// Returns every row as `Option<f64>` (`None` for null or NaN).
    pub fn f64_values(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|i| self.f64_at(i)).collect()
    }

    /// Returns the text value at `idx` in a text column.
    pub fn text_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Text { values, validity } if validity.is_valid(idx) => Some(&values[idx]),
            _ => None,
        }
    }

    /// Text-coerced value at `idx`, regardless of storage type.
    ///
    /// Integers render in decimal; floats use the shortest round-trip form.
    pub fn display_at(&self, idx: usize) -> Option<String> {
        if !self.is_valid(idx) {
            return None;
        }
        match self {
            Self::Integer { values, .. } => Some(values[idx].to_string()),
            Self::Float { values, .. } => Some(values[idx].to_string()),
            Self::Text { values, .. } => Some(values[idx].clone()),
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular data structure.
///
/// All columns have the same number of rows and unique names.
#[derive(Debug, Clone)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame with no columns or rows.
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Adds a named column to the DataFrame.
    ///
    /// Returns an error if the name is taken or the column length doesn't
    /// match the existing row count (unless this is the first column).
    pub fn add_column(&mut self, name: String, column: Column) -> Result<(), PartitionError> {
        if self.column_index(&name).is_some() {
            return Err(PartitionError::DuplicateColumn { name });
        }
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(PartitionError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the DataFrame has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns column names.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Returns a reference to the column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns a reference to the column with the given `name`.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Like [`column_by_name`](Self::column_by_name) but fails with
    /// [`PartitionError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<&Column, PartitionError> {
        self.column_by_name(name)
            .ok_or_else(|| PartitionError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the index of the column with the given `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter())
    }

    /// Returns a summary of column storage types.
    pub fn schema(&self) -> Vec<(&str, DataType)> {
        self.iter().map(|(name, col)| (name, col.data_type())).collect()
    }
}

impl Default for DataFrame {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
