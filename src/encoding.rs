//! Encoding primitives: label encoding and equal-width interval binning.
//!
//! Both are pure functions over borrowed values. They never touch a
//! [`DataFrame`](crate::dataframe::DataFrame); the pipeline appends their
//! output as new columns.
//!
//! Missing inputs map to [`MISSING_CODE`], which never collides with a real
//! label or bin.

use crate::error::PartitionError;
use std::collections::{BTreeSet, HashMap};

/// Code assigned to null or NaN inputs by every encoder.
pub const MISSING_CODE: i64 = -1;

// ── Label encoding ────────────────────────────────────────────────────

/// Result of [`label_encode`]: per-row codes plus the sorted class list.
///
/// `classes[code]` is the value that was encoded as `code`, so the mapping
/// is reversible for the lifetime of this value.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoding {
    /// Per-row code in `[0, classes.len())`, or [`MISSING_CODE`].
    pub codes: Vec<i64>,
    /// Distinct values in ascending lexicographic order.
    pub classes: Vec<String>,
}

impl LabelEncoding {
    /// Returns the value encoded as `code`.
    pub fn decode(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
    }

    /// Returns the code assigned to `value`.
    pub fn code_of(&self, value: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as i64)
    }

    /// Number of distinct classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

/// Assigns each distinct value its rank in sorted order.
///
/// Sorted (rather than first-seen) order makes the codes independent of row
/// order, so the same set of values always yields the same mapping.
///
/// # Example
///
/// ```
/// use u_partition::encoding::{label_encode, MISSING_CODE};
///
/// let enc = label_encode(&[Some("pear"), Some("apple"), None, Some("pear")]);
/// assert_eq!(enc.codes, vec![1, 0, MISSING_CODE, 1]);
/// assert_eq!(enc.decode(0), Some("apple"));
/// ```
pub fn label_encode(values: &[Option<&str>]) -> LabelEncoding {
    let classes: Vec<String> = values
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let index: HashMap<&str, i64> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i as i64))
        .collect();
    let codes = values
        .iter()
        .map(|v| v.map_or(MISSING_CODE, |s| index[s]))
        .collect();
    LabelEncoding { codes, classes }
}

// ── Interval binning ──────────────────────────────────────────────────

/// Equal-width bin layout over `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    /// `numgroups + 1` ascending edges; first is `min`, last is `max`.
    pub edges: Vec<f64>,
}

impl BinEdges {
    /// Lays out `numgroups` equal-width bins between `min` and `max`.
    pub fn linspace(min: f64, max: f64, numgroups: usize) -> Self {
        let span = max - min;
        let mut edges: Vec<f64> = (0..=numgroups)
            .map(|i| min + span * i as f64 / numgroups as f64)
            .collect();
        edges[numgroups] = max;
        Self { edges }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    /// `true` if there are no bins.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bin index of `value`.
    ///
    /// Bins are right-closed `(e[i], e[i+1]]`, except the first which also
    /// includes its lower edge. Values outside `[min, max]` clamp to the
    /// nearest bin.
    pub fn bin_of(&self, value: f64) -> i64 {
        let upper = &self.edges[1..];
        let idx = upper.partition_point(|&e| e < value);
        idx.min(self.len() - 1) as i64
    }
}

/// Assigns each value the index of its equal-width interval.
///
/// The range of valid values is split into `numgroups` bins. The minimum
/// falls in bin 0 and the maximum in bin `numgroups - 1`. `None`, NaN and
/// infinities map to [`MISSING_CODE`]. If every valid value is equal, all of them land in
/// bin 0. A column with no valid values encodes entirely as missing.
///
/// # Errors
///
/// [`PartitionError::InvalidArgument`] if `numgroups` is zero.
///
/// # Example
///
/// ```
/// use u_partition::encoding::interval_bins;
///
/// let bins = interval_bins(&[Some(0.0), Some(55.0), Some(100.0)], 10).unwrap();
/// assert_eq!(bins, vec![0, 5, 9]);
/// ```
pub fn interval_bins(values: &[Option<f64>], numgroups: usize) -> Result<Vec<i64>, PartitionError> {
    if numgroups == 0 {
        return Err(PartitionError::invalid_argument(
            "numgroups",
            "bin count must be positive, got 0",
        ));
    }

    let valid: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let (Some(min), Some(max)) = (u_numflow::stats::min(&valid), u_numflow::stats::max(&valid))
    else {
        return Ok(vec![MISSING_CODE; values.len()]);
    };

    if min == max {
        return Ok(values
            .iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => 0,
                _ => MISSING_CODE,
            })
            .collect());
    }

    let edges = BinEdges::linspace(min, max, numgroups);
    Ok(values
        .iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => edges.bin_of(*x),
            _ => MISSING_CODE,
        })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_encode_is_bijection_over_distinct_values() {
        let values = [Some("b"), Some("c"), Some("a"), Some("b"), Some("c")];
        let enc = label_encode(&values);
        assert_eq!(enc.classes, vec!["a", "b", "c"]);
        assert_eq!(enc.codes, vec![1, 2, 0, 1, 2]);
        for (v, &code) in values.iter().zip(&enc.codes) {
            assert_eq!(enc.decode(code), *v);
            assert_eq!(enc.code_of(v.unwrap()), Some(code));
        }
        let mut seen: Vec<i64> = enc.codes.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, (0..enc.class_count() as i64).collect::<Vec<_>>());
    }

    #[test]
    fn label_encode_independent_of_row_order() {
        let a = label_encode(&[Some("x"), Some("y"), Some("z")]);
        let b = label_encode(&[Some("z"), Some("x"), Some("y")]);
        assert_eq!(a.classes, b.classes);
        assert_eq!(a.code_of("y"), b.code_of("y"));
    }

    #[test]
    fn label_encode_missing() {
        let enc = label_encode(&[None, Some("a"), None]);
        assert_eq!(enc.codes, vec![MISSING_CODE, 0, MISSING_CODE]);
        assert_eq!(enc.decode(MISSING_CODE), None);
        assert_eq!(enc.code_of("zzz"), None);
    }

    #[test]
    fn label_encode_empty() {
        let enc = label_encode(&[]);
        assert!(enc.codes.is_empty());
        assert_eq!(enc.class_count(), 0);
    }

    #[test]
    fn bins_zero_to_hundred() {
        let vals: Vec<Option<f64>> = [0.0, 100.0, 55.0].iter().map(|&v| Some(v)).collect();
        assert_eq!(interval_bins(&vals, 10).unwrap(), vec![0, 9, 5]);
    }

    #[test]
    fn bins_are_right_closed() {
        let vals: Vec<Option<f64>> = [0.0, 10.0, 10.5, 50.0, 50.1, 100.0]
            .iter()
            .map(|&v| Some(v))
            .collect();
        // 10 is the upper edge of bin 0; 50 the upper edge of bin 4.
        assert_eq!(interval_bins(&vals, 10).unwrap(), vec![0, 0, 1, 4, 5, 9]);
    }

    #[test]
    fn bins_cover_domain() {
        let vals: Vec<Option<f64>> = (0..1000).map(|i| Some(i as f64 * 0.37 - 40.0)).collect();
        let bins = interval_bins(&vals, 7).unwrap();
        assert!(bins.iter().all(|&b| (0..7).contains(&b)));
        assert_eq!(bins[0], 0);
        assert_eq!(bins[999], 6);
        assert!(bins.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn bins_missing_and_nan_sentinel() {
        let bins = interval_bins(&[Some(1.0), None, Some(f64::NAN), Some(3.0)], 2).unwrap();
        assert_eq!(bins, vec![0, MISSING_CODE, MISSING_CODE, 1]);
    }

    #[test]
    fn bins_infinite_values_are_missing() {
        let vals = [Some(0.0), Some(50.0), Some(f64::INFINITY), Some(100.0), Some(f64::NEG_INFINITY)];
        let bins = interval_bins(&vals, 4).unwrap();
        assert_eq!(bins, vec![0, 1, MISSING_CODE, 3, MISSING_CODE]);
    }

    #[test]
    fn bins_degenerate_range() {
        let bins = interval_bins(&[Some(4.0), Some(4.0), None], 5).unwrap();
        assert_eq!(bins, vec![0, 0, MISSING_CODE]);
    }

    #[test]
    fn bins_all_missing() {
        let bins = interval_bins(&[None, None], 3).unwrap();
        assert_eq!(bins, vec![MISSING_CODE, MISSING_CODE]);
    }

    #[test]
    fn bins_zero_groups_rejected() {
        let err = interval_bins(&[Some(1.0)], 0).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidArgument { ref name, .. } if name == "numgroups"));
    }

    #[test]
    fn single_bin() {
        let bins = interval_bins(&[Some(-3.0), Some(0.0), Some(8.0)], 1).unwrap();
        assert_eq!(bins, vec![0, 0, 0]);
    }

    #[test]
    fn edges_linspace() {
        let edges = BinEdges::linspace(0.0, 1.0, 4);
        assert_eq!(edges.edges, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(edges.len(), 4);
        assert_eq!(edges.bin_of(-5.0), 0);
        assert_eq!(edges.bin_of(5.0), 3);
    }
}
