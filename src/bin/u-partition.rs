//! Partition a CSV file into balanced groups and print a per-group report.
//!
//! ## Usage
//!
//! ```sh
//! u-partition data.csv 4 region joined spend
//! u-partition data.csv 4 joined --date-strategy cluster --cluster-eps 7
//! u-partition data.csv 4 region spend --json > report.json
//! u-partition data.csv 0 --list-columns
//! RUST_LOG=debug u-partition data.csv 4 spend
//! ```
//!
//! Exit status: 0 when the partition is balanced, 2 when it is infeasible,
//! 1 on any error, including a malformed command line.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use u_partition::classify::{classify_column, DateStrategy};
use u_partition::clustering::DbscanConfig;
use u_partition::loader::CsvLoader;
use u_partition::pipeline::{run, PartitionConfig};
use u_partition::report::PartitionReport;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DateMode {
    /// Equal-width bins on the day axis.
    Bin,
    /// DBSCAN clusters on the day axis.
    Cluster,
}

#[derive(Parser, Debug)]
#[command(about = "Partition a CSV file into balanced groups")]
struct Args {
    /// Path to the CSV file (first row is the header).
    file: PathBuf,

    /// Number of groups to produce.
    numgroups: usize,

    /// Columns to classify and encode, in priority order.
    #[arg(required_unless_present = "list_columns")]
    columns: Vec<String>,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// How date-like columns are encoded.
    #[arg(long, value_enum, default_value_t = DateMode::Bin)]
    date_strategy: DateMode,

    /// DBSCAN neighborhood radius, in days.
    #[arg(long, default_value_t = DbscanConfig::default().epsilon)]
    cluster_eps: f64,

    /// DBSCAN minimum neighborhood size (including the point itself).
    #[arg(long, default_value_t = DbscanConfig::default().min_samples)]
    cluster_min_samples: usize,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Print each column's storage type and inferred kind, then exit.
    #[arg(long)]
    list_columns: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if is_informational(&e) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    match try_main(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `--help` and `--version` are not failures.
fn is_informational(e: &clap::Error) -> bool {
    matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn try_main(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if !args.delimiter.is_ascii() {
        let msg = format!("delimiter must be an ASCII character, got {:?}", args.delimiter);
        return Err(msg.into());
    }
    let df = CsvLoader::new()
        .delimiter(args.delimiter as u8)
        .load_file(&args.file)?;

    if args.list_columns {
        for (name, column) in df.iter() {
            let kind = classify_column(name, column)
                .map_or_else(|e| format!("unusable: {e}"), |k| k.to_string());
            println!("{name:<24} {:<8} {kind}", column.data_type().to_string());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let dates = match args.date_strategy {
        DateMode::Bin => DateStrategy::Bin,
        DateMode::Cluster => DateStrategy::Cluster(DbscanConfig::new(
            args.cluster_eps,
            args.cluster_min_samples,
        )),
    };
    let config = PartitionConfig::new(args.numgroups, args.columns).date_strategy(dates);
    let outcome = run(df, &config)?;
    let report = PartitionReport::from_outcome(&outcome)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }

    Ok(if outcome.is_feasible() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_are_not_informational() {
        for argv in [
            &["u-partition", "data.csv", "-1", "v"][..],
            &["u-partition", "data.csv", "four", "v"],
            &["u-partition", "data.csv", "4"],
            &["u-partition", "data.csv", "4", "v", "--date-strategy", "kmeans"],
        ] {
            let err = Args::try_parse_from(argv).unwrap_err();
            assert!(!is_informational(&err), "{argv:?}");
        }
    }

    #[test]
    fn help_is_informational() {
        let err = Args::try_parse_from(["u-partition", "--help"]).unwrap_err();
        assert!(is_informational(&err));
    }

    #[test]
    fn list_columns_needs_no_columns() {
        let args = Args::try_parse_from(["u-partition", "data.csv", "0", "--list-columns"]).unwrap();
        assert!(args.list_columns);
        assert!(args.columns.is_empty());

        let args = Args::try_parse_from(["u-partition", "data.csv", "3", "v", "w"]).unwrap();
        assert_eq!(args.numgroups, 3);
        assert_eq!(args.columns, ["v", "w"]);
    }
}
