//! Sorting, slicing into groups, and group-size evaluation.
//!
//! The partitioner orders rows by a single key column and cuts the order
//! into `N` contiguous groups. Groups `1..N-1` each hold exactly
//! `floor(rows / N)` rows; group `N` takes everything that remains, so the
//! remainder of an uneven division always lands in the last group.
//!
//! # Example
//!
//! ```
//! use u_partition::dataframe::{Column, DataFrame};
//! use u_partition::partition::{evaluate_distribution, partition, SortKey};
//!
//! let mut df = DataFrame::new();
//! df.add_column("x".into(), Column::from_i64(vec![5, 3, 9, 1, 7, 2, 8])).unwrap();
//!
//! let p = partition(&mut df, &SortKey::source("x"), 3).unwrap();
//! assert_eq!(p.sizes(), vec![2, 2, 3]);
//!
//! let verdict = evaluate_distribution(&p.sizes());
//! assert!(!verdict.feasible); // (3 - 2) / 3 = 33% > 10%
//! ```

use crate::dataframe::{Column, DataFrame};
use crate::error::PartitionError;
use std::cmp::Ordering;
use std::ops::Range;

/// Name of the column holding each row's 1-based group number.
pub const GROUP_COLUMN: &str = "Group Number";

/// Largest allowed spread between the biggest and smallest group, as a
/// percentage of the biggest.
pub const FAIRNESS_THRESHOLD_PCT: f64 = 10.0;

// ── Sort key ──────────────────────────────────────────────────────────

/// Whether the key refers to a source column or a derived encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum KeySource {
    /// An original, pre-encoding column.
    Source,
    /// A column appended by the encoder.
    Encoded,
}

/// The column rows are ordered by before slicing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SortKey {
    pub column: String,
    pub source: KeySource,
}

impl SortKey {
    pub fn source(column: &str) -> Self {
        Self {
            column: column.to_string(),
            source: KeySource::Source,
        }
    }

    pub fn encoded(column: &str) -> Self {
        Self {
            column: column.to_string(),
            source: KeySource::Encoded,
        }
    }
}

// ── Groups ────────────────────────────────────────────────────────────

/// A contiguous slice of the sorted row order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Group {
    /// 1-based group number.
    pub number: usize,
    /// Positions in the sorted order covered by this group.
    pub range: Range<usize>,
    /// Original row indices, in sorted order.
    pub rows: Vec<usize>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of slicing a sorted dataset into groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Original row indices in ascending key order.
    pub order: Vec<usize>,
    /// Exactly `numgroups` groups, numbered from 1.
    pub groups: Vec<Group>,
    /// Group number of each original row.
    pub assignments: Vec<usize>,
}

impl Partition {
    /// Number of rows in each group, in group order.
    pub fn sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Group::len).collect()
    }

    /// Total number of rows partitioned.
    pub fn row_count(&self) -> usize {
        self.order.len()
    }
}

// ── Partitioning ──────────────────────────────────────────────────────

/// Returns row indices in ascending order of `column`.
///
/// The sort is stable: rows with equal keys keep their original relative
/// order. Null keys sort after every valid key.
pub fn sort_order(column: &Column) -> Vec<usize> {
    let mut order: Vec<usize> = (0..column.len()).collect();
    order.sort_by(|&a, &b| compare_rows(column, a, b));
    order
}

fn compare_rows(column: &Column, a: usize, b: usize) -> Ordering {
    match (column.is_valid(a), column.is_valid(b)) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        (true, true) => match column {
            Column::Integer { values, .. } => values[a].cmp(&values[b]),
            Column::Float { values, .. } => values[a].total_cmp(&values[b]),
            Column::Text { values, .. } => values[a].cmp(&values[b]),
        },
    }
}

/// Cuts `order` into `numgroups` contiguous groups.
///
/// # Errors
///
/// - [`PartitionError::InvalidArgument`] if `numgroups` is zero
/// - [`PartitionError::EmptyDataset`] if `order` is empty
pub fn slice_groups(order: Vec<usize>, numgroups: usize) -> Result<Partition, PartitionError> {
    if numgroups == 0 {
        return Err(PartitionError::invalid_argument(
            "numgroups",
            "group count must be positive, got 0",
        ));
    }
    let total = order.len();
    if total == 0 {
        return Err(PartitionError::EmptyDataset { rows: 0 });
    }

    let base_size = total / numgroups;
    let mut groups = Vec::with_capacity(numgroups);
    let mut assignments = vec![0usize; total];
    for i in 0..numgroups {
        let start = i * base_size;
        let end = if i + 1 == numgroups { total } else { start + base_size };
        let rows = order[start..end].to_vec();
        for &row in &rows {
            assignments[row] = i + 1;
        }
        groups.push(Group {
            number: i + 1,
            range: start..end,
            rows,
        });
    }

    Ok(Partition {
        order,
        groups,
        assignments,
    })
}

/// Sorts `df` by `key`, slices it into `numgroups` groups, and appends the
/// [`GROUP_COLUMN`] with each row's group number.
///
/// # Errors
///
/// - [`PartitionError::InvalidArgument`] if `numgroups` is zero
/// - [`PartitionError::EmptyDataset`] if `df` has no rows
/// - [`PartitionError::ColumnNotFound`] if the key column is missing
/// - [`PartitionError::DuplicateColumn`] if `df` was already partitioned
pub fn partition(
    df: &mut DataFrame,
    key: &SortKey,
    numgroups: usize,
) -> Result<Partition, PartitionError> {
    if numgroups == 0 {
        return Err(PartitionError::invalid_argument(
            "numgroups",
            "group count must be positive, got 0",
        ));
    }
    if df.row_count() == 0 {
        return Err(PartitionError::EmptyDataset {
            rows: df.row_count(),
        });
    }

    let order = sort_order(df.require_column(&key.column)?);
    let result = slice_groups(order, numgroups)?;

    let numbers = result.assignments.iter().map(|&g| g as i64).collect();
    df.add_column(GROUP_COLUMN.to_string(), Column::from_i64(numbers))?;

    tracing::info!(
        key = %key.column,
        rows = result.row_count(),
        numgroups,
        base_size = result.row_count() / numgroups,
        last_size = result.groups.last().map_or(0, Group::len),
        "partitioned dataset"
    );
    Ok(result)
}

// ── Distribution evaluation ───────────────────────────────────────────

/// Whether a set of group sizes is balanced enough to accept.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DistributionVerdict {
    /// `difference_pct <= FAIRNESS_THRESHOLD_PCT` and at least one row.
    pub feasible: bool,
    /// Size of each group, in group order.
    pub sizes: Vec<usize>,
    pub max_size: usize,
    pub min_size: usize,
    /// `(max_size - min_size) / max_size * 100`; 100 when every group is empty.
    pub difference_pct: f64,
}

/// Checks that the largest and smallest groups differ by at most
/// [`FAIRNESS_THRESHOLD_PCT`] percent of the largest.
///
/// All-empty (or no) groups are infeasible.
///
/// ```
/// use u_partition::partition::evaluate_distribution;
///
/// assert!(evaluate_distribution(&[10, 10, 10, 9]).feasible);
/// assert!(!evaluate_distribution(&[10, 10, 10, 1]).feasible);
/// ```
pub fn evaluate_distribution(sizes: &[usize]) -> DistributionVerdict {
    let max_size = sizes.iter().copied().max().unwrap_or(0);
    let min_size = sizes.iter().copied().min().unwrap_or(0);

    let (feasible, difference_pct) = if max_size == 0 {
        (false, 100.0)
    } else {
        let pct = (max_size - min_size) as f64 * 100.0 / max_size as f64;
        (pct <= FAIRNESS_THRESHOLD_PCT, pct)
    };

    DistributionVerdict {
        feasible,
        sizes: sizes.to_vec(),
        max_size,
        min_size,
        difference_pct,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
