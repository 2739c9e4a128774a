//! End-to-end partitioning pipeline.
//!
//! One call to [`run`] takes a [`DataFrame`] through every stage in order:
//!
//! ```text
//! Unclassified → Classified → Encoded → Keyed → Partitioned → Evaluated
//! ```
//!
//! Stages are never retried. An error in any column aborts the whole run.
//! An unbalanced result is not an error: it comes back as an infeasible
//! [`DistributionVerdict`] together with the sizes that were achieved, and
//! the caller decides whether to run again with a different group count.
//!
//! # Example
//!
//! ```
//! use u_partition::loader::CsvLoader;
//! use u_partition::pipeline::{run, PartitionConfig};
//!
//! let csv = "city,price\nOslo,10\nRome,40\nOslo,20\nLima,30\n";
//! let df = CsvLoader::new().load_str(csv).unwrap();
//!
//! let outcome = run(df, &PartitionConfig::new(2, ["price", "city"])).unwrap();
//! assert!(outcome.is_feasible());
//! assert_eq!(outcome.key.column, "price");
//! assert_eq!(outcome.partition.sizes(), vec![2, 2]);
//! ```

use crate::classify::{
    classify_columns, parse_date_column, ColumnDescriptor, ColumnKind, DateStrategy, Encoding,
};
use crate::clustering::{dbscan_1d, DbscanConfig};
use crate::dataframe::{Column, DataFrame};
use crate::encoding::{interval_bins, label_encode, MISSING_CODE};
use crate::error::PartitionError;
use crate::partition::{evaluate_distribution, partition, DistributionVerdict, Partition, SortKey};

/// Label given to rows that density clustering leaves unassigned.
pub const NOISE_LABEL: i64 = -2;

// ── Configuration ─────────────────────────────────────────────────────

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionConfig {
    numgroups: usize,
    columns: Vec<String>,
    dates: DateStrategy,
}

impl PartitionConfig {
    /// Requests `numgroups` groups over the `columns`, in selection order.
    pub fn new<I, S>(numgroups: usize, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            numgroups,
            columns: columns.into_iter().map(Into::into).collect(),
            dates: DateStrategy::default(),
        }
    }

    /// Sets how date-like columns are encoded (default: interval binning).
    pub fn date_strategy(mut self, dates: DateStrategy) -> Self {
        self.dates = dates;
        self
    }

    pub fn numgroups(&self) -> usize {
        self.numgroups
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn validate(&self) -> Result<(), PartitionError> {
        if self.numgroups == 0 {
            return Err(PartitionError::invalid_argument(
                "numgroups",
                "group count must be positive, got 0",
            ));
        }
        if self.columns.is_empty() {
            return Err(PartitionError::invalid_argument(
                "columns",
                "at least one column must be selected",
            ));
        }
        if let DateStrategy::Cluster(config) = self.dates {
            // Surface bad parameters before any column work
            dbscan_1d(&[], &config)?;
        }
        Ok(())
    }
}

/// Pipeline state, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Unclassified,
    Classified,
    Encoded,
    Keyed,
    Partitioned,
    Evaluated,
}

// ── Encoded columns ───────────────────────────────────────────────────

/// What the encoder produced for one selected column.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EncodingSummary {
    /// Sorted class list; `classes[code]` is the encoded value.
    Label { classes: Vec<String> },
    /// Equal-width bins over the valid range.
    Interval { bins: usize },
    /// DBSCAN clusters on the day axis.
    Cluster { clusters: usize, noise: usize },
}

/// A derived column appended to the dataset.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EncodedColumn {
    /// Source column name.
    pub source: String,
    /// Name of the appended column.
    pub name: String,
    pub summary: EncodingSummary,
}

/// Encodes one classified column and appends the result to `df`.
///
/// The source column is never modified. Returns a record naming the new
/// column.
///
/// # Errors
///
/// - [`PartitionError::ColumnNotFound`] if the source column is missing
/// - [`PartitionError::DuplicateColumn`] if the encoded name is taken
/// - [`PartitionError::ParseFailure`] if a date-like column no longer parses
/// - [`PartitionError::InvalidArgument`] for bad binning or clustering parameters
pub fn encode_column(
    df: &mut DataFrame,
    descriptor: &ColumnDescriptor,
    numgroups: usize,
) -> Result<EncodedColumn, PartitionError> {
    let (codes, summary) = {
        let column = df.require_column(&descriptor.name)?;
        match descriptor.encoding {
            Encoding::Label => {
                let text: Vec<Option<String>> =
                    (0..column.len()).map(|i| column.display_at(i)).collect();
                let refs: Vec<Option<&str>> = text.iter().map(Option::as_deref).collect();
                let enc = label_encode(&refs);
                (enc.codes, EncodingSummary::Label { classes: enc.classes })
            }
            Encoding::Interval => {
                let values = axis_values(column, descriptor.kind)?;
                (
                    interval_bins(&values, numgroups)?,
                    EncodingSummary::Interval { bins: numgroups },
                )
            }
            Encoding::Cluster(config) => {
                let values = axis_values(column, descriptor.kind)?;
                cluster_codes(&descriptor.name, &values, &config)?
            }
        }
    };

    df.add_column(descriptor.encoded_name.clone(), Column::from_i64(codes))?;
    tracing::debug!(
        source = %descriptor.name,
        encoded = %descriptor.encoded_name,
        summary = ?summary,
        "appended encoded column"
    );
    Ok(EncodedColumn {
        source: descriptor.name.clone(),
        name: descriptor.encoded_name.clone(),
        summary,
    })
}

/// Numeric axis for binning or clustering: raw numbers, or days since epoch
/// for date-like columns.
fn axis_values(column: &Column, kind: ColumnKind) -> Result<Vec<Option<f64>>, PartitionError> {
    match kind {
        ColumnKind::DateLike => Ok(parse_date_column(column)?
            .into_iter()
            .map(|d| d.map(|d| d.days_since_epoch()))
            .collect()),
        ColumnKind::Numeric | ColumnKind::Categorical => Ok(column.f64_values()),
    }
}

fn cluster_codes(
    name: &str,
    values: &[Option<f64>],
    config: &DbscanConfig,
) -> Result<(Vec<i64>, EncodingSummary), PartitionError> {
    let present: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_some()).collect();
    let points: Vec<f64> = present.iter().filter_map(|&i| values[i]).collect();
    let result = dbscan_1d(&points, config)?;

    if result.is_all_noise() {
        tracing::warn!(
            column = %name,
            points = points.len(),
            epsilon = config.epsilon,
            min_samples = config.min_samples,
            "degenerate clustering: every date is noise"
        );
    }

    let mut codes = vec![MISSING_CODE; values.len()];
    for (&row, label) in present.iter().zip(&result.labels) {
        codes[row] = label.map_or(NOISE_LABEL, |c| c as i64);
    }
    Ok((
        codes,
        EncodingSummary::Cluster {
            clusters: result.n_clusters,
            noise: result.noise_count,
        },
    ))
}

// ── Key selection ─────────────────────────────────────────────────────

/// Picks the sort key: the first numeric column (by its source values),
/// else the encoded column of the first selected column.
///
/// # Errors
///
/// [`PartitionError::InvalidArgument`] if `descriptors` is empty.
pub fn select_key(descriptors: &[ColumnDescriptor]) -> Result<SortKey, PartitionError> {
    if let Some(d) = descriptors.iter().find(|d| d.kind == ColumnKind::Numeric) {
        return Ok(SortKey::source(&d.name));
    }
    descriptors
        .first()
        .map(|d| SortKey::encoded(&d.encoded_name))
        .ok_or_else(|| {
            PartitionError::invalid_argument("columns", "at least one column must be selected")
        })
}

// ── Outcome ───────────────────────────────────────────────────────────

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    /// The dataset with encoded columns and the group-number column appended.
    pub data: DataFrame,
    /// One descriptor per selected column, in selection order.
    pub descriptors: Vec<ColumnDescriptor>,
    /// One encoded column per descriptor, same order.
    pub encoded: Vec<EncodedColumn>,
    pub key: SortKey,
    pub partition: Partition,
    pub verdict: DistributionVerdict,
}

impl PartitionOutcome {
    /// `true` if the group sizes passed the fairness check.
    pub fn is_feasible(&self) -> bool {
        self.verdict.feasible
    }

    /// Number of groups produced (always the requested count).
    pub fn group_count(&self) -> usize {
        self.partition.groups.len()
    }
}

/// Runs the full pipeline on `df`.
///
/// # Errors
///
/// - [`PartitionError::InvalidArgument`] for a zero group count, an empty
///   column selection, or bad clustering parameters
/// - [`PartitionError::ColumnNotFound`] / [`PartitionError::DataQuality`]
///   from classification
/// - [`PartitionError::EmptyDataset`] if `df` has no rows
pub fn run(mut df: DataFrame, config: &PartitionConfig) -> Result<PartitionOutcome, PartitionError> {
    config.validate()?;
    tracing::debug!(
        stage = ?PipelineStage::Unclassified,
        numgroups = config.numgroups,
        rows = df.row_count(),
        columns = ?config.columns
    );

    let descriptors = classify_columns(&df, &config.columns, config.dates)?;
    tracing::debug!(stage = ?PipelineStage::Classified, count = descriptors.len());

    let encoded = descriptors
        .iter()
        .map(|d| encode_column(&mut df, d, config.numgroups))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(stage = ?PipelineStage::Encoded, count = encoded.len());

    let key = select_key(&descriptors)?;
    tracing::debug!(stage = ?PipelineStage::Keyed, key = %key.column, source = ?key.source);

    let partition = partition(&mut df, &key, config.numgroups)?;
    tracing::debug!(stage = ?PipelineStage::Partitioned, sizes = ?partition.sizes());

    let verdict = evaluate_distribution(&partition.sizes());
    if verdict.feasible {
        tracing::info!(
            stage = ?PipelineStage::Evaluated,
            difference_pct = verdict.difference_pct,
            "partition accepted"
        );
    } else {
        tracing::warn!(
            stage = ?PipelineStage::Evaluated,
            difference_pct = verdict.difference_pct,
            sizes = ?verdict.sizes,
            "partition infeasible under the fairness threshold"
        );
    }

    Ok(PartitionOutcome {
        data: df,
        descriptors,
        encoded,
        key,
        partition,
        verdict,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
