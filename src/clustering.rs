//! Density-based clustering of points on a single axis.
//!
//! - **DBSCAN**: Density-Based Spatial Clustering of Applications with Noise
//!   (Ester et al., 1996), specialised to one dimension. Used to group
//!   irregular date sequences by proximity on the day axis.
//!
//! In one dimension every neighborhood is a contiguous run of the sorted
//! points, so core detection and cluster expansion reduce to linear sweeps
//! over the sorted order instead of a pairwise distance matrix.
//!
//! # Example
//!
//! ```
//! use u_partition::clustering::{dbscan_1d, DbscanConfig};
//!
//! let days = [0.0, 1.0, 2.0, 30.0, 31.0, 90.0];
//! let result = dbscan_1d(&days, &DbscanConfig::new(3.0, 2)).unwrap();
//!
//! assert_eq!(result.n_clusters, 2);
//! assert_eq!(result.noise_count, 1);
//! assert_eq!(result.labels[5], None); // isolated day is noise
//! ```

use crate::error::PartitionError;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for DBSCAN clustering.
///
/// # Parameters
///
/// - `epsilon` — Maximum distance between two points to be considered neighbors.
/// - `min_samples` — Minimum number of points in a neighborhood (including the
///   point itself) to qualify as a core point. Must be >= 2.
///
/// The defaults (`epsilon = 3.0`, `min_samples = 2`) cluster dates that lie
/// within three days of each other. They are a starting policy, not a tuned
/// value; sparse date ranges may come out as all noise.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct DbscanConfig {
    /// Maximum neighborhood distance.
    pub epsilon: f64,
    /// Minimum points in epsilon-neighborhood to form a core point.
    pub min_samples: usize,
}

impl DbscanConfig {
    /// Creates a DBSCAN config with the given epsilon and min_samples.
    ///
    /// Validation is done in [`dbscan_1d`].
    pub fn new(epsilon: f64, min_samples: usize) -> Self {
        Self {
            epsilon,
            min_samples,
        }
    }

    fn validate(&self) -> Result<(), PartitionError> {
        if self.min_samples < 2 {
            return Err(PartitionError::invalid_argument(
                "min_samples",
                format!("must be at least 2, got {}", self.min_samples),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(PartitionError::invalid_argument(
                "epsilon",
                format!("must be a positive finite number, got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self::new(3.0, 2)
    }
}

// ── Result ────────────────────────────────────────────────────────────

/// Result of DBSCAN clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct DbscanResult {
    /// Cluster label for each input point.
    /// `None` = noise point, `Some(id)` = cluster membership (0-indexed).
    pub labels: Vec<Option<usize>>,
    /// Number of clusters discovered.
    pub n_clusters: usize,
    /// Number of noise points.
    pub noise_count: usize,
    /// Number of points in each cluster (indexed by cluster id).
    pub cluster_sizes: Vec<usize>,
    /// Whether each point is a core point.
    pub core_points: Vec<bool>,
}

impl DbscanResult {
    /// `true` if there was at least one point and every point is noise.
    pub fn is_all_noise(&self) -> bool {
        !self.labels.is_empty() && self.n_clusters == 0
    }
}

// ── DBSCAN ───────────────────────────────────────────────────────────

/// Runs DBSCAN over one-dimensional points.
///
/// Cluster ids are assigned in ascending order along the axis, so a lower
/// id always means earlier points. A border point (within `epsilon` of a
/// core point but not itself core) joins the cluster of its nearest core
/// point; an exact tie goes to the lower cluster id. Equal inputs always
/// produce equal labels, but border assignment can differ from DBSCAN
/// implementations that resolve borders by visit order.
///
/// Complexity: O(n log n) for the sort, O(n) for the sweeps.
///
/// # Errors
///
/// - [`PartitionError::InvalidArgument`] if min_samples < 2, epsilon is not
///   positive and finite, or a point is NaN or infinite
pub fn dbscan_1d(points: &[f64], config: &DbscanConfig) -> Result<DbscanResult, PartitionError> {
    config.validate()?;
    if let Some(i) = points.iter().position(|v| !v.is_finite()) {
        return Err(PartitionError::invalid_argument(
            "points",
            format!("point[{i}] is not finite"),
        ));
    }

    let n = points.len();
    let eps = config.epsilon;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| points[a].total_cmp(&points[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| points[i]).collect();

    // Neighborhood [lo, hi) of each sorted point, via two monotone pointers
    let mut core = vec![false; n];
    let (mut lo, mut hi) = (0, 0);
    for (k, &x) in sorted.iter().enumerate() {
        while x - sorted[lo] > eps {
            lo += 1;
        }
        while hi < n && sorted[hi] - x <= eps {
            hi += 1;
        }
        core[k] = hi - lo >= config.min_samples;
    }

    // Consecutive core points within eps are density-connected
    let mut labels_sorted: Vec<Option<usize>> = vec![None; n];
    let mut n_clusters = 0;
    let mut last_core: Option<usize> = None;
    for k in (0..n).filter(|&k| core[k]) {
        labels_sorted[k] = match last_core {
            Some(p) if sorted[k] - sorted[p] <= eps => labels_sorted[p],
            _ => {
                n_clusters += 1;
                Some(n_clusters - 1)
            }
        };
        last_core = Some(k);
    }

    // Border points: nearest reachable core on either side
    let mut prev_core = vec![None; n];
    let mut last = None;
    for k in 0..n {
        if core[k] {
            last = Some(k);
        }
        prev_core[k] = last;
    }
    let mut next_core = vec![None; n];
    last = None;
    for k in (0..n).rev() {
        if core[k] {
            last = Some(k);
        }
        next_core[k] = last;
    }
    for k in (0..n).filter(|&k| !core[k]) {
        let left = prev_core[k]
            .map(|p| (sorted[k] - sorted[p], p))
            .filter(|&(d, _)| d <= eps);
        let right = next_core[k]
            .map(|q| (sorted[q] - sorted[k], q))
            .filter(|&(d, _)| d <= eps);
        labels_sorted[k] = match (left, right) {
            (Some((dl, p)), Some((dr, q))) => {
                if dr < dl {
                    labels_sorted[q]
                } else {
                    labels_sorted[p]
                }
            }
            (Some((_, p)), None) => labels_sorted[p],
            (None, Some((_, q))) => labels_sorted[q],
            (None, None) => None,
        };
    }

    let mut labels = vec![None; n];
    let mut core_points = vec![false; n];
    for (k, &row) in order.iter().enumerate() {
        labels[row] = labels_sorted[k];
        core_points[row] = core[k];
    }

    let noise_count = labels.iter().filter(|l| l.is_none()).count();
    let mut cluster_sizes = vec![0usize; n_clusters];
    for c in labels.iter().flatten() {
        cluster_sizes[*c] += 1;
    }

    Ok(DbscanResult {
        labels,
        n_clusters,
        noise_count,
        cluster_sizes,
        core_points,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_clusters_with_noise() {
        let data = [0.0, 0.5, 10.0, 0.2, 10.4, 50.0, 10.2, 0.4];
        let result = dbscan_1d(&data, &DbscanConfig::new(1.5, 2)).unwrap();

        assert_eq!(result.n_clusters, 2);
        assert_eq!(result.noise_count, 1);
        assert_eq!(result.cluster_sizes, vec![4, 3]);

        // Lower axis values get lower ids
        for i in [0, 1, 3, 7] {
            assert_eq!(result.labels[i], Some(0));
        }
        for i in [2, 4, 6] {
            assert_eq!(result.labels[i], Some(1));
        }
        assert!(result.labels[5].is_none());
    }

    #[test]
    fn all_noise() {
        let data = [0.0, 100.0, 200.0];
        let result = dbscan_1d(&data, &DbscanConfig::new(1.0, 2)).unwrap();

        assert_eq!(result.n_clusters, 0);
        assert_eq!(result.noise_count, 3);
        assert!(result.is_all_noise());
    }

    #[test]
    fn single_cluster() {
        let data = [0.0, 0.1, 0.2, 0.3];
        let result = dbscan_1d(&data, &DbscanConfig::new(0.5, 2)).unwrap();

        assert_eq!(result.n_clusters, 1);
        assert_eq!(result.noise_count, 0);
        assert!(result.labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn core_and_border_points() {
        // With min_samples=3, only densely connected points are core.
        let data = [
            0.0, // border: neighbors [0,1] = 2 < 3
            0.5, // core: neighbors [0,1,2] = 3
            1.0, // core: neighbors [1,2,3] = 3
            1.5, // border: neighbors [2,3] = 2 < 3
        ];
        let result = dbscan_1d(&data, &DbscanConfig::new(0.6, 3)).unwrap();

        assert_eq!(result.core_points, vec![false, true, true, false]);
        assert_eq!(result.n_clusters, 1);
        assert!(result.labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn border_joins_nearest_core() {
        // Two dense runs; 1.65 is within eps of the cores 0.75 and 2.5 but
        // has too few neighbors to be core itself. It is closer to 2.5.
        let data = [0.0, 0.25, 0.5, 0.75, 1.65, 2.5, 2.75, 3.0, 3.25];
        let result = dbscan_1d(&data, &DbscanConfig::new(1.0, 4)).unwrap();
        assert_eq!(result.n_clusters, 2);
        assert!(!result.core_points[4]);
        assert_eq!(result.labels[4], Some(1));
        assert_eq!(result.cluster_sizes, vec![4, 5]);
    }

    #[test]
    fn border_tie_goes_to_lower_cluster() {
        // 2.5 is exactly 1.5 from core 1.0 and core 4.0.
        let data = [0.0, 0.25, 0.5, 1.0, 2.5, 4.0, 4.5, 4.75, 5.0];
        let result = dbscan_1d(&data, &DbscanConfig::new(1.5, 4)).unwrap();
        assert_eq!(result.n_clusters, 2);
        assert!(!result.core_points[4]);
        assert_eq!(result.labels[4], Some(0));
    }

    #[test]
    fn duplicates_are_dense() {
        let data = [5.0, 5.0, 5.0, 40.0];
        let result = dbscan_1d(&data, &DbscanConfig::default()).unwrap();
        assert_eq!(result.labels, vec![Some(0), Some(0), Some(0), None]);
    }

    #[test]
    fn empty_input() {
        let result = dbscan_1d(&[], &DbscanConfig::default()).unwrap();
        assert!(result.labels.is_empty());
        assert!(!result.is_all_noise());
    }

    #[test]
    fn deterministic() {
        let data: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 * 0.7).collect();
        let a = dbscan_1d(&data, &DbscanConfig::new(1.0, 3)).unwrap();
        let b = dbscan_1d(&data, &DbscanConfig::new(1.0, 3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_parameters() {
        assert!(dbscan_1d(&[1.0], &DbscanConfig::new(1.0, 1)).is_err());
        assert!(dbscan_1d(&[1.0], &DbscanConfig::new(0.0, 2)).is_err());
        assert!(dbscan_1d(&[1.0], &DbscanConfig::new(f64::NAN, 2)).is_err());
        let err = dbscan_1d(&[1.0, f64::INFINITY], &DbscanConfig::default()).unwrap_err();
        assert!(err.to_string().contains("point[1]"));
    }
}
