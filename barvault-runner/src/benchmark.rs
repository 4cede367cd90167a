//! Side-by-side measurement of the relational and columnar backends.
//!
//! Runs the same query once per backend and records wall-clock time, rows
//! returned, and on-disk footprint. Ratios are always relational over
//! columnar.

use crate::config::BenchConfig;
use crate::profiling::profile;
use anyhow::Context;
use barvault_core::domain::TimeRange;
use barvault_core::query::QueryEngine;
use barvault_core::store::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkQuery {
    pub ticker: String,
    pub window: TimeRange,
}

/// Which query a measurement ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Range,
    AverageVolume,
    TopReturns { n: usize },
    DailySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMeasurement {
    pub backend: String,
    pub elapsed_secs: f64,
    pub rows: usize,
    pub footprint_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Relational time over columnar time.
    pub time_ratio: Option<f64>,
    pub speed_label: String,
    /// Relational size over columnar size.
    pub size_ratio: Option<f64>,
    pub size_difference_pct: Option<f64>,
    pub size_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub query: BenchmarkQuery,
    pub kind: QueryKind,
    pub relational: BackendMeasurement,
    pub columnar: BackendMeasurement,
    pub comparison: Comparison,
}

impl BenchmarkReport {
    pub fn to_json(&self) -> Result<String, BenchmarkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Persist reports as a JSON array at `path`.
pub fn write_reports(reports: &[BenchmarkReport], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(reports).context("serializing benchmark reports")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing benchmark reports to {}", path.display()))?;
    info!(path = %path.display(), reports = reports.len(), "benchmark reports written");
    Ok(())
}

/// Time the range query on both backends.
pub fn run_benchmark(
    relational: &dyn QueryEngine,
    columnar: &dyn QueryEngine,
    query: &BenchmarkQuery,
) -> Result<BenchmarkReport, BenchmarkError> {
    run_query(relational, columnar, query, QueryKind::Range)
}

/// Time one query kind on both backends.
pub fn run_query(
    relational: &dyn QueryEngine,
    columnar: &dyn QueryEngine,
    query: &BenchmarkQuery,
    kind: QueryKind,
) -> Result<BenchmarkReport, BenchmarkError> {
    let relational = measure(relational, query, kind)?;
    let columnar = measure(columnar, query, kind)?;
    if relational.rows != columnar.rows {
        warn!(
            ?kind,
            relational = relational.rows,
            columnar = columnar.rows,
            "backends returned different row counts"
        );
    }
    let comparison = compare(&relational, &columnar);
    info!(
        ?kind,
        ticker = %query.ticker,
        speed = %comparison.speed_label,
        size = %comparison.size_label,
        "benchmark complete"
    );
    Ok(BenchmarkReport {
        query: query.clone(),
        kind,
        relational,
        columnar,
        comparison,
    })
}

/// Every query kind in order: range, average volume, top returns, daily summary.
pub fn run_suite(
    relational: &dyn QueryEngine,
    columnar: &dyn QueryEngine,
    query: &BenchmarkQuery,
    top_n: usize,
) -> Result<Vec<BenchmarkReport>, BenchmarkError> {
    [
        QueryKind::Range,
        QueryKind::AverageVolume,
        QueryKind::TopReturns { n: top_n },
        QueryKind::DailySummary,
    ]
    .into_iter()
    .map(|kind| run_query(relational, columnar, query, kind))
    .collect()
}

/// Open the stores named in `config` and benchmark its query.
pub fn run_from_config(config: &BenchConfig) -> Result<BenchmarkReport, BenchmarkError> {
    let (relational, columnar) = config.open_engines()?;
    run_benchmark(relational.as_ref(), columnar.as_ref(), &config.query())
}

fn measure(
    engine: &dyn QueryEngine,
    query: &BenchmarkQuery,
    kind: QueryKind,
) -> Result<BackendMeasurement, StoreError> {
    let (rows, elapsed) = profile("benchmark_query", || -> Result<usize, StoreError> {
        Ok(match kind {
            QueryKind::Range => engine.range(&query.ticker, query.window)?.len(),
            QueryKind::AverageVolume => engine.average_daily_volume()?.len(),
            QueryKind::TopReturns { n } => engine.top_returns(query.window, n)?.len(),
            QueryKind::DailySummary => engine.daily_summary(None)?.len(),
        })
    });
    Ok(BackendMeasurement {
        backend: engine.name().to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
        rows: rows?,
        footprint_bytes: engine.footprint_bytes()?,
    })
}

/// Ratios and labels for a pair of measurements.
pub fn compare(relational: &BackendMeasurement, columnar: &BackendMeasurement) -> Comparison {
    let r = relational.elapsed_secs;
    let c = columnar.elapsed_secs;
    let time_ratio = (c > 0.0).then(|| r / c);
    let speed_label = if c < r {
        match time_ratio {
            Some(ratio) => format!("{ratio:.2}x faster"),
            None => "N/A".to_string(),
        }
    } else if r > 0.0 {
        format!("{:.2}x slower", c / r)
    } else {
        "N/A".to_string()
    };

    let rs = relational.footprint_bytes as f64;
    let cs = columnar.footprint_bytes as f64;
    let (size_ratio, size_difference_pct) = if columnar.footprint_bytes > 0 {
        (Some(rs / cs), Some((rs - cs) / cs * 100.0))
    } else {
        (None, None)
    };
    let size_label = match size_difference_pct {
        Some(pct) => format!("{pct:.1}%"),
        None => "N/A".to_string(),
    };

    Comparison {
        time_ratio,
        speed_label,
        size_ratio,
        size_difference_pct,
        size_label,
    }
}
