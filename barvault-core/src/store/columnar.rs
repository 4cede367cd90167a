//! Parquet backend with Hive-style ticker partitioning.
//!
//! Layout: `{root}/ticker={SYMBOL}/part-0.parquet` plus `meta.json`, and a
//! root-level `_tickers.json` holding the reference ticker set.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Partition pruning for ticker-scoped reads, full scan otherwise
//! - Column projection for ticker-agnostic aggregates

use super::schema::{PartitionSchema, CLOSE, HIGH, LOW, OPEN, TIMESTAMP, VOLUME};
use super::{check_loadable, is_storable_symbol, staging_path, LoadReport, ReloadPolicy, StoreError};
use crate::domain::{Bar, Ticker, TickerSet, TimeRange};
use crate::query::{
    cmp_daily, cmp_return, cmp_volume, percent_return, DailySummary, QueryEngine, TickerReturn,
    VolumeSummary,
};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PARTITION_PREFIX: &str = "ticker=";
const PART_FILE: &str = "part-0.parquet";
const META_FILE: &str = "meta.json";
const TICKERS_FILE: &str = "_tickers.json";

/// Metadata sidecar for one ticker partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub symbol: String,
    pub bar_count: usize,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    pub data_hash: String,
}

#[derive(Debug, Clone)]
struct Partition {
    dir: PathBuf,
}

impl Partition {
    fn file(&self) -> PathBuf {
        self.dir.join(PART_FILE)
    }
}

/// Columnar store rooted at a directory.
///
/// The partition mapping is rebuilt from disk by [`ParquetStore::open`] and
/// never changes afterwards.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    root: PathBuf,
    tickers: TickerSet,
    partitions: BTreeMap<String, Partition>,
}

impl ParquetStore {
    /// Open an existing store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::StorageMissing { path: root });
        }

        let tickers = read_tickers(&root.join(TICKERS_FILE))?;

        let partitions = list_partitions(&root)?;
        debug!(root = %root.display(), partitions = partitions.len(), "opened columnar store");

        Ok(Self {
            root,
            tickers,
            partitions,
        })
    }

    /// Bulk-load `tickers` and `bars` into a partitioned tree at `root`.
    ///
    /// Bars whose symbol is not in `tickers` are dropped and counted. The tree
    /// is built in a sibling staging directory and renamed over `root` only
    /// once every partition is written, so a failed load leaves `root` as it
    /// was.
    pub fn load(
        root: impl Into<PathBuf>,
        tickers: &TickerSet,
        bars: &[Bar],
        policy: ReloadPolicy,
    ) -> Result<(Self, LoadReport), StoreError> {
        let root = root.into();
        if root.exists() && policy == ReloadPolicy::SkipExisting {
            info!(root = %root.display(), "columnar store exists, skipping load");
            return Ok((Self::open(root)?, LoadReport::skipped()));
        }
        check_loadable(tickers, bars)?;

        let staging = staging_path(&root);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        let report = match build_tree(&staging, tickers, bars) {
            Ok(report) => report,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };
        if root.exists() {
            info!(root = %root.display(), "replacing columnar store");
            fs::remove_dir_all(&root)?;
        }
        fs::rename(&staging, &root)?;

        if report.dropped_orphans > 0 {
            warn!(
                dropped = report.dropped_orphans,
                "dropped bars whose ticker symbol is not in the reference set"
            );
        }
        let store = Self::open(&root)?;
        info!(
            root = %root.display(),
            partitions = store.partitions.len(),
            bars = report.bars_loaded,
            "loaded columnar store"
        );
        Ok((store, report))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Symbols that have a partition on disk, ascending.
    pub fn partition_symbols(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(|s| s.as_str())
    }

    /// Read the metadata sidecar of one partition.
    pub fn partition_meta(&self, symbol: &str) -> Result<PartitionMeta, StoreError> {
        let partition = self
            .partitions
            .get(symbol)
            .ok_or_else(|| StoreError::UnknownTicker {
                symbol: symbol.to_string(),
            })?;
        let path = partition.dir.join(META_FILE);
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Manifest(format!("{}: {e}", path.display())))
    }

    /// Re-read a partition and compare its content hash with the sidecar.
    pub fn verify_partition(&self, symbol: &str) -> Result<bool, StoreError> {
        let meta = self.partition_meta(symbol)?;
        let bars = self.ticker_bars(symbol)?;
        let refs: Vec<&Bar> = bars.iter().collect();
        Ok(data_hash(&refs)? == meta.data_hash)
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::StorageMissing {
                path: self.root.clone(),
            })
        }
    }

    fn ensure_ticker(&self, ticker: &str) -> Result<(), StoreError> {
        self.ensure_root()?;
        if self.tickers.contains(ticker) {
            Ok(())
        } else {
            Err(StoreError::UnknownTicker {
                symbol: ticker.to_string(),
            })
        }
    }

    /// Bars of one ticker, read from its own partition when the mapping has
    /// one on disk.
    ///
    /// Otherwise the root is listed again and every partition present now is
    /// filtered on its `ticker=` key, which picks up a partition written by a
    /// later load into the same root. Only matching partitions are read.
    fn scan_ticker(&self, ticker: &str) -> Result<Vec<Bar>, StoreError> {
        if let Some(partition) = self.partitions.get(ticker).filter(|p| p.dir.is_dir()) {
            debug!(backend = "parquet", ticker, "partition pruned read");
            return read_bars(ticker, &partition.file());
        }
        debug!(backend = "parquet", ticker, "no partition in mapping, scanning root");
        let mut out = Vec::new();
        for (symbol, partition) in list_partitions(&self.root)? {
            if symbol == ticker && partition.file().is_file() {
                out.extend(read_bars(&symbol, &partition.file())?);
            }
        }
        Ok(out)
    }

    fn live_partitions(&self) -> impl Iterator<Item = (&str, &Partition)> {
        self.partitions
            .iter()
            .filter(|(_, p)| p.dir.is_dir())
            .map(|(s, p)| (s.as_str(), p))
    }
}

impl QueryEngine for ParquetStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn tickers(&self) -> Result<TickerSet, StoreError> {
        self.ensure_root()?;
        Ok(self.tickers.clone())
    }

    fn range(&self, ticker: &str, window: TimeRange) -> Result<Vec<Bar>, StoreError> {
        self.ensure_ticker(ticker)?;
        let mut bars = self.scan_ticker(ticker)?;
        bars.retain(|b| window.contains(b.timestamp));
        debug!(backend = "parquet", ticker, rows = bars.len(), "range query");
        Ok(bars)
    }

    fn average_daily_volume(&self) -> Result<Vec<VolumeSummary>, StoreError> {
        self.ensure_root()?;
        let mut out = Vec::new();
        for (symbol, partition) in self.live_partitions() {
            let df = read_projected(&partition.file(), &[VOLUME])?;
            let volumes = column_u64(&df, VOLUME)?;
            if volumes.is_empty() {
                continue;
            }
            let total: u128 = volumes.iter().map(|&v| u128::from(v)).sum();
            let avg = total / volumes.len() as u128;
            let avg_daily_volume = u64::try_from(avg).map_err(|_| {
                StoreError::InvalidData(format!("average volume overflow for {symbol}"))
            })?;
            out.push(VolumeSummary {
                symbol: symbol.to_string(),
                avg_daily_volume,
            });
        }
        out.sort_by(cmp_volume);
        Ok(out)
    }

    fn top_returns(&self, window: TimeRange, n: usize) -> Result<Vec<TickerReturn>, StoreError> {
        self.ensure_root()?;
        let mut out = Vec::new();
        for (symbol, partition) in self.live_partitions() {
            let rows = read_price_points(&partition.file())?;
            let mut in_window = rows.iter().filter(|p| window.contains(p.timestamp));
            let Some(first) = in_window.next() else {
                continue;
            };
            let last = in_window.last().unwrap_or(first);
            if let Some(return_pct) = percent_return(first.open, last.close) {
                out.push(TickerReturn {
                    symbol: symbol.to_string(),
                    return_pct,
                });
            }
        }
        out.sort_by(cmp_return);
        out.truncate(n);
        Ok(out)
    }

    fn daily_summary(&self, limit: Option<usize>) -> Result<Vec<DailySummary>, StoreError> {
        self.ensure_root()?;
        let mut out = Vec::new();
        for (symbol, partition) in self.live_partitions() {
            let rows = read_price_points(&partition.file())?;
            for day in rows.chunk_by(|a, b| a.timestamp.date() == b.timestamp.date()) {
                let (first, last) = (&day[0], &day[day.len() - 1]);
                out.push(DailySummary {
                    symbol: symbol.to_string(),
                    date: first.timestamp.date(),
                    first_trade_price: first.open,
                    last_trade_price: last.close,
                });
            }
        }
        out.sort_by(cmp_daily);
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn ticker_bars(&self, ticker: &str) -> Result<Vec<Bar>, StoreError> {
        self.ensure_ticker(ticker)?;
        self.scan_ticker(ticker)
    }

    fn all_bars(&self) -> Result<Vec<Bar>, StoreError> {
        self.ensure_root()?;
        let mut out = Vec::new();
        for (symbol, partition) in self.live_partitions() {
            out.extend(read_bars(symbol, &partition.file())?);
        }
        Ok(out)
    }

    fn footprint_bytes(&self) -> Result<u64, StoreError> {
        self.ensure_root()?;
        Ok(dir_size(&self.root)?)
    }
}

/// `ticker=<SYMBOL>` directories directly under `root`, keyed by symbol.
fn list_partitions(root: &Path) -> Result<BTreeMap<String, Partition>, StoreError> {
    let mut partitions = BTreeMap::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(symbol) = name.to_str().and_then(|n| n.strip_prefix(PARTITION_PREFIX)) else {
            continue;
        };
        partitions.insert(symbol.to_string(), Partition { dir });
    }
    Ok(partitions)
}

// ── Write helpers ───────────────────────────────────────────────────

/// Write the ticker manifest and every partition under `root`.
fn build_tree(root: &Path, tickers: &TickerSet, bars: &[Bar]) -> Result<LoadReport, StoreError> {
    let mut kept: Vec<&Bar> = bars.iter().filter(|b| tickers.contains(&b.symbol)).collect();
    let mut report = LoadReport {
        tickers: tickers.len(),
        dropped_orphans: bars.len() - kept.len(),
        ..LoadReport::default()
    };

    // Stable: equal (symbol, timestamp) keep their input order.
    kept.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    fs::create_dir_all(root)?;
    write_tickers(&root.join(TICKERS_FILE), tickers)?;

    for group in kept.chunk_by(|a, b| a.symbol == b.symbol) {
        let symbol = group[0].symbol.as_str();
        write_partition(&partition_dir(root, symbol)?, symbol, group)?;
        report.bars_loaded += group.len();
    }
    Ok(report)
}

fn partition_dir(root: &Path, symbol: &str) -> Result<PathBuf, StoreError> {
    if !is_storable_symbol(symbol) {
        return Err(StoreError::UnsupportedInput(format!(
            "symbol '{symbol}' cannot name a partition directory"
        )));
    }
    Ok(root.join(format!("{PARTITION_PREFIX}{symbol}")))
}

fn write_partition(dir: &Path, symbol: &str, bars: &[&Bar]) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;

    let mut df = bars_to_dataframe(bars)?;
    let path = dir.join(PART_FILE);
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path)?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| StoreError::Parquet(format!("write {}: {e}", tmp_path.display())))?;
    rename_into_place(&tmp_path, &path)?;

    // `bars` is non-empty: it comes from `chunk_by`.
    let meta = PartitionMeta {
        symbol: symbol.to_string(),
        bar_count: bars.len(),
        first_timestamp: bars[0].timestamp,
        last_timestamp: bars[bars.len() - 1].timestamp,
        data_hash: data_hash(bars)?,
    };
    let json = serde_json::to_string_pretty(&meta)
        .map_err(|e| StoreError::Manifest(format!("meta serialization: {e}")))?;
    write_atomic(&dir.join(META_FILE), json.as_bytes())
}

fn write_tickers(path: &Path, tickers: &TickerSet) -> Result<(), StoreError> {
    let list: Vec<&Ticker> = tickers.iter().collect();
    let json = serde_json::to_string_pretty(&list)
        .map_err(|e| StoreError::Manifest(format!("ticker manifest serialization: {e}")))?;
    write_atomic(path, json.as_bytes())
}

fn read_tickers(path: &Path) -> Result<TickerSet, StoreError> {
    let content = fs::read_to_string(path)
        .map_err(|e| StoreError::Manifest(format!("{}: {e}", path.display())))?;
    let list: Vec<Ticker> = serde_json::from_str(&content)
        .map_err(|e| StoreError::Manifest(format!("{}: {e}", path.display())))?;
    Ok(list.into_iter().collect())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, bytes)?;
    rename_into_place(&tmp_path, path)
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), StoreError> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        StoreError::Io(e)
    })
}

fn data_hash(bars: &[&Bar]) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| StoreError::Manifest(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        total += if meta.is_dir() {
            dir_size(&entry.path())?
        } else {
            meta.len()
        };
    }
    Ok(total)
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn bars_to_dataframe(bars: &[&Bar]) -> Result<DataFrame, StoreError> {
    let timestamps: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        Column::new(TIMESTAMP.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| StoreError::Parquet(format!("timestamp cast: {e}")))?,
        Column::new(OPEN.into(), opens),
        Column::new(HIGH.into(), highs),
        Column::new(LOW.into(), lows),
        Column::new(CLOSE.into(), closes),
        Column::new(VOLUME.into(), volumes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))?;
    PartitionSchema::validate(&df).map_err(|e| StoreError::Parquet(e.to_string()))?;
    Ok(df)
}

/// Read only `columns` of a partition file and check their types.
fn read_projected(path: &Path, columns: &[&str]) -> Result<DataFrame, StoreError> {
    let file = fs::File::open(path)
        .map_err(|e| StoreError::Parquet(format!("open {}: {e}", path.display())))?;
    let df = ParquetReader::new(file)
        .with_columns(Some(columns.iter().map(|c| c.to_string()).collect()))
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read {}: {e}", path.display())))?;
    PartitionSchema::validate_columns(&df, columns)
        .map_err(|e| StoreError::Parquet(format!("{}: {e}", path.display())))?;
    Ok(df)
}

fn read_bars(symbol: &str, path: &Path) -> Result<Vec<Bar>, StoreError> {
    let df = read_projected(path, &PartitionSchema::COLUMNS)?;
    let timestamps = column_timestamps(&df)?;
    let opens = column_f64(&df, OPEN)?;
    let highs = column_f64(&df, HIGH)?;
    let lows = column_f64(&df, LOW)?;
    let closes = column_f64(&df, CLOSE)?;
    let volumes = column_u64(&df, VOLUME)?;

    (0..df.height())
        .map(|i| {
            Bar::new(
                symbol,
                timestamps[i],
                opens[i],
                highs[i],
                lows[i],
                closes[i],
                volumes[i],
            )
            .map_err(|e| StoreError::InvalidData(e.to_string()))
        })
        .collect()
}

struct PricePoint {
    timestamp: NaiveDateTime,
    open: f64,
    close: f64,
}

fn read_price_points(path: &Path) -> Result<Vec<PricePoint>, StoreError> {
    let df = read_projected(path, &[TIMESTAMP, OPEN, CLOSE])?;
    let timestamps = column_timestamps(&df)?;
    let opens = column_f64(&df, OPEN)?;
    let closes = column_f64(&df, CLOSE)?;
    Ok(timestamps
        .into_iter()
        .zip(opens)
        .zip(closes)
        .map(|((timestamp, open), close)| PricePoint {
            timestamp,
            open,
            close,
        })
        .collect())
}

fn column_timestamps(df: &DataFrame) -> Result<Vec<NaiveDateTime>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("{TIMESTAMP} column: {e}"));
    let millis = df
        .column(TIMESTAMP)
        .map_err(map_err)?
        .cast(&DataType::Int64)
        .map_err(map_err)?;
    let millis = millis.i64().map_err(map_err)?;
    millis
        .into_iter()
        .enumerate()
        .map(|(i, ms)| {
            ms.and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| StoreError::InvalidData(format!("bad timestamp at row {i}")))
        })
        .collect()
}

fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("{name} column: {e}"));
    let ca = df.column(name).map_err(map_err)?.f64().map_err(map_err)?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| StoreError::InvalidData(format!("null {name} at row {i}"))))
        .collect()
}

fn column_u64(df: &DataFrame, name: &str) -> Result<Vec<u64>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("{name} column: {e}"));
    let ca = df.column(name).map_err(map_err)?.u64().map_err(map_err)?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| StoreError::InvalidData(format!("null {name} at row {i}"))))
        .collect()
}
