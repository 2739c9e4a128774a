//! # u-partition
//!
//! Balanced partitioning of mixed-type tabular data with C FFI bindings.
//!
//! u-partition splits a dataset into `N` groups of near-equal size so that
//! each group covers a contiguous range of a chosen key. Selected columns
//! are classified (date-like, categorical, numeric), encoded into integer
//! codes, and the rows are sorted by a single key and sliced. The resulting
//! group sizes are then checked against a 10% fairness threshold.
//!
//! ## Modules
//!
//! - [`dataframe`] — Column-major tabular data model (DataFrame, Column, DataType)
//! - [`loader`] — CSV loading with null-marker normalization and type inference
//! - [`date`] — Strict multi-format date parsing
//! - [`classify`] — Semantic column classification and encoding choice
//! - [`encoding`] — Label encoding and equal-width interval binning
//! - [`clustering`] — One-dimensional DBSCAN for irregular date sequences
//! - [`partition`] — Stable sort, group slicing, fairness evaluation
//! - [`pipeline`] — End-to-end run: classify → encode → key → partition → evaluate
//! - [`report`] — Per-group summaries with text and JSON output
//! - [`ffi`] — C FFI bindings (auto-generated C header via cbindgen)
//! - [`error`] — Error types
//!
//! ## Quick Start
//!
//! ```
//! use u_partition::loader::CsvLoader;
//! use u_partition::pipeline::{run, PartitionConfig};
//! use u_partition::report::PartitionReport;
//!
//! let csv = "\
//! region,joined,spend
//! north,2021-01-04,120.5
//! south,2021-02-11,80.0
//! north,2021-03-19,99.9
//! east,2021-01-22,310.0
//! west,2021-02-02,45.25
//! east,2021-03-30,150.0
//! ";
//! let df = CsvLoader::new().load_str(csv).unwrap();
//!
//! let config = PartitionConfig::new(3, ["region", "joined", "spend"]);
//! let outcome = run(df, &config).unwrap();
//!
//! // `spend` is the first numeric column, so it is the sort key
//! assert_eq!(outcome.key.column, "spend");
//! assert_eq!(outcome.partition.sizes(), vec![2, 2, 2]);
//! assert!(outcome.is_feasible());
//!
//! let report = PartitionReport::from_outcome(&outcome).unwrap();
//! println!("{report}");
//! ```

pub mod classify;
pub mod clustering;
pub mod dataframe;
pub mod date;
pub mod encoding;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod partition;
pub mod pipeline;
pub mod report;

pub use error::PartitionError;
