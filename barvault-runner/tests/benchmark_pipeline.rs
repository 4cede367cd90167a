//! Integration tests for the benchmark harness: synthetic session, both
//! stores on disk, config-driven runs, persisted reports.

use barvault_core::query::QueryEngine;
use barvault_core::store::{ParquetStore, ReloadPolicy, SqliteStore};
use barvault_runner::{
    compare, default_tickers, generate_session, run_benchmark, run_from_config, run_suite,
    write_reports, BackendMeasurement, BenchConfig, BenchmarkReport, QueryKind,
};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

fn session_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 17)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn config_in(dir: &tempfile::TempDir) -> BenchConfig {
    BenchConfig {
        relational_path: dir.path().join("market_data.db"),
        columnar_root: dir.path().join("market_data"),
        reload: ReloadPolicy::Replace,
        ..BenchConfig::default()
    }
}

fn build(config: &BenchConfig) -> (SqliteStore, ParquetStore) {
    barvault_runner::logging::init();
    let tickers = default_tickers();
    let bars = generate_session(&tickers, session_start(), 120);
    let (sqlite, _) =
        SqliteStore::load(&config.relational_path, &tickers, &bars, config.reload).unwrap();
    let (parquet, _) =
        ParquetStore::load(&config.columnar_root, &tickers, &bars, config.reload).unwrap();
    (sqlite, parquet)
}

#[test]
fn range_benchmark_reports_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let (sqlite, parquet) = build(&config);

    let report = run_benchmark(&sqlite, &parquet, &config.query()).unwrap();
    assert_eq!(report.kind, QueryKind::Range);
    assert_eq!(report.relational.backend, "sqlite");
    assert_eq!(report.columnar.backend, "parquet");
    assert_eq!(report.relational.rows, 120);
    assert_eq!(report.relational.rows, report.columnar.rows);
    assert!(report.relational.footprint_bytes > 0);
    assert!(report.columnar.footprint_bytes > 0);
    assert!(report.comparison.size_ratio.is_some());
}

#[test]
fn config_driven_run_reopens_stores() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    build(&config);

    let report = run_from_config(&config).unwrap();
    assert_eq!(report.query.ticker, "TSLA");
    assert_eq!(report.relational.rows, report.columnar.rows);
}

#[test]
fn config_driven_run_without_stores_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_from_config(&config_in(&dir)).unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

#[test]
fn suite_covers_every_query_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let (sqlite, parquet) = build(&config);

    let reports = run_suite(&sqlite, &parquet, &config.query(), config.top_n).unwrap();
    let kinds: Vec<QueryKind> = reports.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            QueryKind::Range,
            QueryKind::AverageVolume,
            QueryKind::TopReturns { n: 3 },
            QueryKind::DailySummary,
        ]
    );
    for report in &reports {
        assert_eq!(report.relational.rows, report.columnar.rows, "{:?}", report.kind);
    }

    let path = dir.path().join("report.json");
    write_reports(&reports, &path).unwrap();
    let back: Vec<BenchmarkReport> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, reports);
}

#[test]
fn both_backends_agree_on_the_synthetic_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let (sqlite, parquet) = build(&config);
    assert_eq!(
        sqlite.all("TSLA", config.window()).unwrap(),
        parquet.all("TSLA", config.window()).unwrap()
    );
}

fn measurement(elapsed_secs: f64, footprint_bytes: u64) -> BackendMeasurement {
    BackendMeasurement {
        backend: "any".into(),
        elapsed_secs,
        rows: 0,
        footprint_bytes,
    }
}

proptest! {
    #[test]
    fn speed_label_direction_follows_timings(
        r in 0.001..10.0_f64,
        c in 0.001..10.0_f64,
        rs in 1u64..1_000_000,
        cs in 1u64..1_000_000,
    ) {
        let cmp = compare(&measurement(r, rs), &measurement(c, cs));
        if c < r {
            prop_assert!(cmp.speed_label.ends_with("x faster"));
        } else {
            prop_assert!(cmp.speed_label.ends_with("x slower"));
        }
        let ratio = cmp.time_ratio.unwrap();
        prop_assert!((ratio - r / c).abs() <= 1e-12 * ratio.max(1.0));
        prop_assert_eq!(cmp.size_label.ends_with('%'), true);
        prop_assert!(cmp.size_difference_pct.unwrap() > -100.0);
    }
}
