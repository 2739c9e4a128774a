//! Per-group summaries of a finished partition.
//!
//! A [`PartitionReport`] describes every group by its size, its share of
//! the dataset, and the range of each originally selected column inside
//! the group. Summaries always use the source values, never the encoded
//! codes, so a reader sees `2021-01-03` rather than a bin number.
//!
//! # Example
//!
//! ```
//! use u_partition::loader::CsvLoader;
//! use u_partition::pipeline::{run, PartitionConfig};
//! use u_partition::report::PartitionReport;
//!
//! let csv = "price\n10\n40\n20\n30\n";
//! let df = CsvLoader::new().load_str(csv).unwrap();
//! let outcome = run(df, &PartitionConfig::new(2, ["price"])).unwrap();
//!
//! let report = PartitionReport::from_outcome(&outcome).unwrap();
//! let text = report.to_string();
//! assert!(text.contains("Group 1 (2 records, 50.00%): (price: (10, 20))"));
//! assert!(text.contains("Group 2 (2 records, 50.00%): (price: (30, 40))"));
//! ```

use std::fmt;
use std::ops::Range;

use crate::classify::{parse_date_column, ColumnDescriptor, ColumnKind};
use crate::dataframe::Column;
use crate::date::ParsedDate;
use crate::error::PartitionError;
use crate::partition::{DistributionVerdict, Group, SortKey};
use crate::pipeline::PartitionOutcome;

// ── Summaries ─────────────────────────────────────────────────────────

/// Range of one source column inside one group.
///
/// `min`/`max` are `None` when every value in the group is null.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSummary {
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
    },
    Date {
        min: Option<String>,
        max: Option<String>,
    },
    /// Lexicographic bounds plus the number of distinct values.
    Categorical {
        min: Option<String>,
        max: Option<String>,
        distinct: usize,
    },
}

/// One selected column prepared for summarizing. Date-like columns are
/// parsed here once and shared by every group.
#[derive(Debug, Clone)]
pub enum SummarySource<'a> {
    Numeric(&'a Column),
    Dates(Vec<Option<ParsedDate>>),
    Categorical(&'a Column),
}

impl<'a> SummarySource<'a> {
    /// Prepares `column` according to its classified `kind`.
    ///
    /// # Errors
    ///
    /// [`PartitionError::ParseFailure`] if a date-like column stops parsing.
    pub fn new(column: &'a Column, kind: ColumnKind) -> Result<Self, PartitionError> {
        Ok(match kind {
            ColumnKind::Numeric => Self::Numeric(column),
            ColumnKind::DateLike => Self::Dates(parse_date_column(column)?),
            ColumnKind::Categorical => Self::Categorical(column),
        })
    }

    /// Summarizes the values at `rows`.
    pub fn summarize(&self, rows: &[usize]) -> ColumnSummary {
        match self {
            Self::Numeric(column) => {
                let values: Vec<f64> = rows.iter().filter_map(|&r| column.f64_at(r)).collect();
                ColumnSummary::Numeric {
                    min: u_numflow::stats::min(&values),
                    max: u_numflow::stats::max(&values),
                }
            }
            Self::Dates(dates) => {
                let in_group: Vec<ParsedDate> = rows.iter().filter_map(|&r| dates[r]).collect();
                ColumnSummary::Date {
                    min: in_group.iter().min().map(ToString::to_string),
                    max: in_group.iter().max().map(ToString::to_string),
                }
            }
            Self::Categorical(column) => {
                let mut values: Vec<String> =
                    rows.iter().filter_map(|&r| column.display_at(r)).collect();
                values.sort_unstable();
                values.dedup();
                ColumnSummary::Categorical {
                    min: values.first().cloned(),
                    max: values.last().cloned(),
                    distinct: values.len(),
                }
            }
        }
    }
}

impl ColumnSummary {
    fn bounds(&self) -> (String, String) {
        fn show<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "null".to_string(), ToString::to_string)
        }
        match self {
            Self::Numeric { min, max } => (show(min), show(max)),
            Self::Date { min, max } | Self::Categorical { min, max, .. } => (show(min), show(max)),
        }
    }
}

/// A summary tagged with its column name.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NamedSummary {
    pub column: String,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

/// One group's line in the report.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupReport {
    /// 1-based group number.
    pub number: usize,
    pub size: usize,
    /// Share of all rows, 0..=100.
    pub percentage: f64,
    /// Position of the group in the sorted order.
    pub range: Range<usize>,
    pub summaries: Vec<NamedSummary>,
}

// ── PartitionReport ───────────────────────────────────────────────────

/// Serializable summary of a whole partition run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PartitionReport {
    pub total_rows: usize,
    pub numgroups: usize,
    pub key: SortKey,
    pub verdict: DistributionVerdict,
    pub columns: Vec<ColumnDescriptor>,
    pub groups: Vec<GroupReport>,
}

impl PartitionReport {
    /// Builds the report for a finished run.
    ///
    /// # Errors
    ///
    /// [`PartitionError::ColumnNotFound`] if a selected column was removed
    /// from the outcome's data after the run, or
    /// [`PartitionError::ParseFailure`] if a date-like column was altered.
    pub fn from_outcome(outcome: &PartitionOutcome) -> Result<Self, PartitionError> {
        let sources = outcome
            .descriptors
            .iter()
            .map(|d| {
                let column = outcome.data.require_column(&d.name)?;
                Ok((d.name.as_str(), SummarySource::new(column, d.kind)?))
            })
            .collect::<Result<Vec<_>, PartitionError>>()?;

        let total_rows = outcome.partition.row_count();
        let groups: Vec<GroupReport> = outcome
            .partition
            .groups
            .iter()
            .map(|g| group_report(&sources, g, total_rows))
            .collect();

        Ok(Self {
            total_rows,
            numgroups: groups.len(),
            key: outcome.key.clone(),
            verdict: outcome.verdict.clone(),
            columns: outcome.descriptors.clone(),
            groups,
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn group_report(
    sources: &[(&str, SummarySource<'_>)],
    group: &Group,
    total_rows: usize,
) -> GroupReport {
    let summaries = sources
        .iter()
        .map(|(name, source)| NamedSummary {
            column: (*name).to_string(),
            summary: source.summarize(&group.rows),
        })
        .collect();

    let percentage = if total_rows == 0 {
        0.0
    } else {
        group.len() as f64 * 100.0 / total_rows as f64
    };
    GroupReport {
        number: group.number,
        size: group.len(),
        percentage,
        range: group.range.clone(),
        summaries,
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.verdict;
        if v.feasible {
            writeln!(
                f,
                "Partition of {} rows into {} groups (difference {:.2}%)",
                self.total_rows, self.numgroups, v.difference_pct
            )?;
        } else {
            writeln!(
                f,
                "Infeasible partition of {} rows into {} groups: largest {} vs smallest {} ({:.2}% apart)",
                self.total_rows, self.numgroups, v.max_size, v.min_size, v.difference_pct
            )?;
        }
        for g in &self.groups {
            let parts: Vec<String> = g
                .summaries
                .iter()
                .map(|s| {
                    let (lo, hi) = s.summary.bounds();
                    format!("{}: ({lo}, {hi})", s.column)
                })
                .collect();
            writeln!(
                f,
                "Group {} ({} records, {:.2}%): ({})",
                g.number,
                g.size,
                g.percentage,
                parts.join(" , ")
            )?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::CsvLoader;
    use crate::pipeline::{run, PartitionConfig};

    fn outcome(csv: &str, numgroups: usize, columns: &[&str]) -> PartitionOutcome {
        let df = CsvLoader::new().load_str(csv).unwrap();
        run(df, &PartitionConfig::new(numgroups, columns.iter().copied())).unwrap()
    }

    const CSV: &str = "\
name,score,joined
bob,3,2021-03-01
ann,1,2021-01-15
cid,4,2021-02-01
ann,2,2021-01-01
";

    #[test]
    fn summaries_use_source_values() {
        let o = outcome(CSV, 2, &["score", "name", "joined"]);
        let report = PartitionReport::from_outcome(&o).unwrap();

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.groups.len(), 2);
        let g1 = &report.groups[0];
        assert_eq!(g1.size, 2);
        assert!((g1.percentage - 50.0).abs() < 1e-12);
        assert_eq!(g1.range, 0..2);

        assert_eq!(
            g1.summaries[0].summary,
            ColumnSummary::Numeric { min: Some(1.0), max: Some(2.0) }
        );
        assert_eq!(
            g1.summaries[1].summary,
            ColumnSummary::Categorical {
                min: Some("ann".into()),
                max: Some("ann".into()),
                distinct: 1
            }
        );
        assert_eq!(
            g1.summaries[2].summary,
            ColumnSummary::Date {
                min: Some("2021-01-01".into()),
                max: Some("2021-01-15".into())
            }
        );
    }

    #[test]
    fn display_lines() {
        let o = outcome(CSV, 2, &["score", "name"]);
        let text = PartitionReport::from_outcome(&o).unwrap().to_string();
        assert!(text.starts_with("Partition of 4 rows into 2 groups"));
        assert!(text.contains("Group 1 (2 records, 50.00%): (score: (1, 2) , name: (ann, ann))"));
        assert!(text.contains("Group 2 (2 records, 50.00%): (score: (3, 4) , name: (bob, cid))"));
    }

    #[test]
    fn infeasible_header() {
        let o = outcome(CSV, 3, &["score"]);
        let text = PartitionReport::from_outcome(&o).unwrap().to_string();
        assert!(text.starts_with("Infeasible partition of 4 rows into 3 groups"));
        assert!(text.contains("Group 3 (2 records, 50.00%)"));
    }

    #[test]
    fn all_null_group_prints_null() {
        let col = Column::from_f64_options(&[None, Some(1.0)]);
        let s = SummarySource::new(&col, ColumnKind::Numeric).unwrap().summarize(&[0]);
        assert_eq!(s, ColumnSummary::Numeric { min: None, max: None });
        assert_eq!(s.bounds(), ("null".to_string(), "null".to_string()));
    }

    #[test]
    fn parsed_dates_shared_across_groups() {
        let col = Column::from_str_options(&[
            Some("2021-03-01"),
            None,
            Some("2021-01-15"),
            Some("2021-02-01"),
        ]);
        let source = SummarySource::new(&col, ColumnKind::DateLike).unwrap();
        assert!(matches!(&source, SummarySource::Dates(d) if d.len() == 4));
        assert_eq!(
            source.summarize(&[0, 2]),
            ColumnSummary::Date {
                min: Some("2021-01-15".into()),
                max: Some("2021-03-01".into())
            }
        );
        assert_eq!(
            source.summarize(&[1, 3]),
            ColumnSummary::Date {
                min: Some("2021-02-01".into()),
                max: Some("2021-02-01".into())
            }
        );

        let text = Column::from_str_options(&[Some("bad")]);
        assert!(matches!(
            SummarySource::new(&text, ColumnKind::DateLike),
            Err(PartitionError::ParseFailure(_))
        ));
    }

    #[test]
    fn json_shape() {
        let o = outcome(CSV, 2, &["name"]);
        let json = PartitionReport::from_outcome(&o).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_rows"], 4);
        assert_eq!(value["verdict"]["feasible"], true);
        assert_eq!(value["key"]["column"], "name_encoded");
        let first = &value["groups"][0]["summaries"][0];
        assert_eq!(first["column"], "name");
        assert_eq!(first["kind"], "categorical");
        assert_eq!(first["distinct"], 1);
    }
}
