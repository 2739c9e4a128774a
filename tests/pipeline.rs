//! End-to-end runs over CSV files on disk.

use std::io::Write;

use u_partition::classify::{ColumnKind, DateStrategy};
use u_partition::clustering::DbscanConfig;
use u_partition::dataframe::DataType;
use u_partition::loader::CsvLoader;
use u_partition::partition::{KeySource, GROUP_COLUMN};
use u_partition::pipeline::{run, PartitionConfig};
use u_partition::report::{ColumnSummary, PartitionReport};
use u_partition::PartitionError;

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// 39 patients: site, visit date, age (with `.` for missing).
fn patients_csv() -> String {
    let sites = ["B-2", "A-1", "C-3"];
    let mut csv = String::from("site,visit,age\n");
    for i in 0..39 {
        let age = if i % 13 == 5 {
            ".".to_string()
        } else {
            (20 + (i * 17) % 50).to_string()
        };
        csv.push_str(&format!(
            "{},2021-{:02}-{:02},{}\n",
            sites[i % 3],
            1 + i % 12,
            1 + i % 28,
            age
        ));
    }
    csv
}

#[test]
fn file_run_remainder_goes_to_last_group() {
    let file = write_csv(&patients_csv());
    let df = CsvLoader::new().load_file(file.path()).unwrap();
    assert_eq!(df.row_count(), 39);
    assert_eq!(df.require_column("age").unwrap().data_type(), DataType::Integer);
    assert_eq!(df.require_column("age").unwrap().null_count(), 3);

    let outcome = run(df, &PartitionConfig::new(4, ["site", "visit", "age"])).unwrap();
    assert_eq!(outcome.partition.sizes(), vec![9, 9, 9, 12]);
    assert!(!outcome.is_feasible());
    assert_eq!(outcome.key.column, "age");
    assert_eq!(outcome.key.source, KeySource::Source);

    // Missing ages sort last, so they end up in the final group
    let groups = outcome.data.require_column(GROUP_COLUMN).unwrap();
    let groups = groups.as_integer().unwrap();
    for row in [5, 18, 31] {
        assert_eq!(groups[row], 4);
    }
}

#[test]
fn forty_rows_into_four_is_feasible() {
    let mut csv = String::from("v\n");
    for i in 0..40 {
        csv.push_str(&format!("{}\n", (i * 7) % 40));
    }
    let file = write_csv(&csv);
    let df = CsvLoader::new().load_file(file.path()).unwrap();
    let outcome = run(df, &PartitionConfig::new(4, ["v"])).unwrap();
    assert_eq!(outcome.partition.sizes(), vec![10, 10, 10, 10]);
    assert!(outcome.is_feasible());

    // 39 rows gives [9, 9, 9, 12]: 25% apart
    let df = CsvLoader::new().load_str(&csv[..csv.len() - 3]).unwrap();
    assert_eq!(df.row_count(), 39);
    let outcome = run(df, &PartitionConfig::new(4, ["v"])).unwrap();
    assert!((outcome.verdict.difference_pct - 25.0).abs() < 1e-9);
}

#[test]
fn date_column_classified_and_summarized() {
    let file = write_csv(&patients_csv());
    let df = CsvLoader::new().load_file(file.path()).unwrap();
    let outcome = run(df, &PartitionConfig::new(3, ["visit", "site"])).unwrap();

    let kinds: Vec<ColumnKind> = outcome.descriptors.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![ColumnKind::DateLike, ColumnKind::Categorical]);
    assert_eq!(outcome.key.column, "visit_interval");

    let report = PartitionReport::from_outcome(&outcome).unwrap();
    assert_eq!(report.groups.len(), 3);
    let first = &report.groups[0].summaries[0];
    assert_eq!(first.column, "visit");
    match &first.summary {
        ColumnSummary::Date { min, .. } => assert_eq!(min.as_deref(), Some("2021-01-01")),
        other => panic!("expected a date summary, got {other:?}"),
    }
}

#[test]
fn semicolon_file_with_clustered_dates() {
    let csv = "\
when;amount
2021-01-01;5
2021-01-02;6
2021-01-03;7
2021-06-01;8
2021-06-02;9
2021-06-03;10
";
    let file = write_csv(csv);
    let df = CsvLoader::new().delimiter(b';').load_file(file.path()).unwrap();
    let config = PartitionConfig::new(2, ["when"])
        .date_strategy(DateStrategy::Cluster(DbscanConfig::new(2.0, 2)));
    let outcome = run(df, &config).unwrap();

    let groups = outcome.data.require_column(GROUP_COLUMN).unwrap();
    assert_eq!(groups.as_integer(), Some(&[1, 1, 1, 2, 2, 2][..]));
    assert!(outcome.is_feasible());
}

#[test]
fn mixed_date_column_keeps_every_row() {
    let file = write_csv("d,n\n2021-01-01,1\n2021-02-01,2\nbad,3\n");
    let df = CsvLoader::new().load_file(file.path()).unwrap();
    let outcome = run(df, &PartitionConfig::new(1, ["d"])).unwrap();
    assert_eq!(outcome.descriptors[0].kind, ColumnKind::Categorical);
    assert_eq!(outcome.partition.row_count(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CsvLoader::new()
        .load_file(dir.path().join("absent.csv"))
        .unwrap_err();
    assert!(matches!(err, PartitionError::Io(_)));
}

#[test]
fn header_only_file_is_empty_dataset() {
    let file = write_csv("site,visit,age\n");
    let df = CsvLoader::new().load_file(file.path()).unwrap();
    assert_eq!(df.column_names(), &["site", "visit", "age"]);
    let err = run(df, &PartitionConfig::new(2, ["age"])).unwrap_err();
    assert_eq!(err, PartitionError::EmptyDataset { rows: 0 });
}
