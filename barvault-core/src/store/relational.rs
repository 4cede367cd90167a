//! SQLite backend: two linked tables, declarative queries.
//!
//! Layout:
//! - `tickers(ticker_id PK, symbol UNIQUE, name, exchange)`
//! - `prices(id PK AUTOINCREMENT, timestamp TEXT, ticker_id FK, open, high, low, close, volume)`
//!
//! Timestamps are stored as fixed-width `YYYY-MM-DD HH:MM:SS.sss` text so that
//! string comparison is chronological and `DATE()` applies directly. Every
//! operation opens its own connection and drops it on return, error paths
//! included. Foreign keys are switched on for every connection.

use super::{check_loadable, staging_path, LoadReport, ReloadPolicy, StoreError};
use crate::domain::{Bar, Ticker, TickerSet, TimeRange};
use crate::query::{percent_return, DailySummary, QueryEngine, TickerReturn, VolumeSummary};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Row};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS tickers (
    ticker_id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL UNIQUE,
    name TEXT,
    exchange TEXT
);

CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    ticker_id INTEGER NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    volume INTEGER,
    FOREIGN KEY (ticker_id) REFERENCES tickers(ticker_id)
);

CREATE INDEX IF NOT EXISTS idx_prices_ticker_ts ON prices(ticker_id, timestamp);
";

const UPSERT_TICKER_SQL: &str = "
INSERT INTO tickers (symbol, name, exchange) VALUES (?1, ?2, ?3)
ON CONFLICT(symbol) DO UPDATE SET name = excluded.name, exchange = excluded.exchange";

const INSERT_PRICE_SQL: &str = "
INSERT INTO prices (timestamp, ticker_id, open, high, low, close, volume)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

const BAR_COLUMNS: &str = "t.symbol, p.timestamp, p.open, p.high, p.low, p.close, p.volume";

const RANGE_SQL: &str = "
SELECT t.symbol, p.timestamp, p.open, p.high, p.low, p.close, p.volume
FROM prices p
JOIN tickers t ON p.ticker_id = t.ticker_id
WHERE t.symbol = ?1
  AND p.timestamp BETWEEN ?2 AND ?3
ORDER BY p.timestamp ASC, p.id ASC";

// floor(sum(v) / n) == sum(v / n) + sum(v % n) / n for non-negative v.
// sum(v / n) is at most the largest volume and sum(v % n) is below n * n, so
// no intermediate overflows INTEGER the way SUM(volume) would.
const AVG_VOLUME_SQL: &str = "
WITH counted AS (
    SELECT p.ticker_id, p.volume, COUNT(*) OVER (PARTITION BY p.ticker_id) AS n
    FROM prices p
)
SELECT t.symbol, SUM(c.volume / c.n) + SUM(c.volume % c.n) / MAX(c.n) AS avg_daily_volume
FROM counted c
JOIN tickers t ON c.ticker_id = t.ticker_id
GROUP BY t.symbol
ORDER BY avg_daily_volume DESC, t.symbol ASC";

// First bar: earliest timestamp, earliest insert. Last bar: latest timestamp,
// latest insert.
const TOP_RETURNS_SQL: &str = "
WITH period AS (
    SELECT p.ticker_id, p.open, p.close,
        ROW_NUMBER() OVER (PARTITION BY p.ticker_id ORDER BY p.timestamp ASC, p.id ASC) AS rn_first,
        ROW_NUMBER() OVER (PARTITION BY p.ticker_id ORDER BY p.timestamp DESC, p.id DESC) AS rn_last
    FROM prices p
    WHERE p.timestamp BETWEEN ?1 AND ?2
),
period_returns AS (
    SELECT t.symbol, pct_return(f.open, l.close) AS return_pct
    FROM period f
    JOIN period l ON l.ticker_id = f.ticker_id AND l.rn_last = 1
    JOIN tickers t ON t.ticker_id = f.ticker_id
    WHERE f.rn_first = 1
)
SELECT symbol, return_pct
FROM period_returns
WHERE return_pct IS NOT NULL
ORDER BY return_pct DESC, symbol ASC
LIMIT ?3";

const DAILY_SUMMARY_SQL: &str = "
WITH daily AS (
    SELECT p.ticker_id, DATE(p.timestamp) AS trade_date, p.open, p.close,
        ROW_NUMBER() OVER (
            PARTITION BY p.ticker_id, DATE(p.timestamp) ORDER BY p.timestamp ASC, p.id ASC
        ) AS rn_first,
        ROW_NUMBER() OVER (
            PARTITION BY p.ticker_id, DATE(p.timestamp) ORDER BY p.timestamp DESC, p.id DESC
        ) AS rn_last
    FROM prices p
)
SELECT t.symbol, f.trade_date, f.open AS first_trade_price, l.close AS last_trade_price
FROM daily f
JOIN daily l
    ON l.ticker_id = f.ticker_id AND l.trade_date = f.trade_date AND l.rn_last = 1
JOIN tickers t ON t.ticker_id = f.ticker_id
WHERE f.rn_first = 1
ORDER BY f.trade_date DESC, t.symbol ASC
LIMIT ?1";

/// Relational store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open an existing database file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.is_file() {
            return Err(StoreError::StorageMissing { path });
        }
        Ok(Self { path })
    }

    /// Bulk-load `tickers` and `bars` into the database at `path`.
    ///
    /// Bars whose symbol has no ticker row are dropped and counted. The
    /// database is built in a sibling staging file and renamed over `path`
    /// only once it is complete, so a failed load leaves `path` as it was.
    pub fn load(
        path: impl Into<PathBuf>,
        tickers: &TickerSet,
        bars: &[Bar],
        policy: ReloadPolicy,
    ) -> Result<(Self, LoadReport), StoreError> {
        let path = path.into();
        if path.exists() && policy == ReloadPolicy::SkipExisting {
            info!(path = %path.display(), "relational store exists, skipping load");
            return Ok((Self::open(path)?, LoadReport::skipped()));
        }
        check_loadable(tickers, bars)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(&path);
        if staging.exists() {
            fs::remove_file(&staging)?;
        }
        let report = match build_database(&staging, tickers, bars) {
            Ok(report) => report,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }
        };
        if path.exists() {
            info!(path = %path.display(), "replacing relational store");
            fs::remove_file(&path)?;
        }
        fs::rename(&staging, &path)?;

        if report.dropped_orphans > 0 {
            warn!(
                dropped = report.dropped_orphans,
                "dropped bars whose ticker symbol is not in the tickers table"
            );
        }
        info!(
            path = %path.display(),
            tickers = report.tickers,
            bars = report.bars_loaded,
            "loaded relational store"
        );
        Ok((Self { path }, report))
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a single price row for an explicit `ticker_id`.
    ///
    /// Returns the new row id, or [`StoreError::ConstraintViolation`] when no
    /// ticker has that id.
    pub fn insert_price(&self, ticker_id: i64, bar: &Bar) -> Result<i64, StoreError> {
        let conn = self.connect(OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let (ts, volume) = price_columns(bar)?;
        match conn.execute(
            INSERT_PRICE_SQL,
            params![ts, ticker_id, bar.open, bar.high, bar.low, bar.close, volume],
        ) {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => Err(StoreError::ConstraintViolation(format!(
                "ticker_id {ticker_id} for {}: {e}",
                bar.symbol
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn connect(&self, flags: OpenFlags) -> Result<Connection, StoreError> {
        if !self.path.is_file() {
            return Err(StoreError::StorageMissing {
                path: self.path.clone(),
            });
        }
        let conn = Connection::open_with_flags(&self.path, flags)?;
        enable_foreign_keys(&conn)?;
        conn.create_scalar_function(
            "pct_return",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let first_open: f64 = ctx.get(0)?;
                let last_close: f64 = ctx.get(1)?;
                Ok(percent_return(first_open, last_close))
            },
        )?;
        Ok(conn)
    }

    fn read(&self) -> Result<Connection, StoreError> {
        self.connect(OpenFlags::SQLITE_OPEN_READ_ONLY)
    }

    fn ensure_ticker(conn: &Connection, ticker: &str) -> Result<(), StoreError> {
        let known = conn
            .query_row(
                "SELECT 1 FROM tickers WHERE symbol = ?1",
                [ticker],
                |_| Ok(()),
            )
            .optional()?;
        known.ok_or_else(|| StoreError::UnknownTicker {
            symbol: ticker.to_string(),
        })
    }
}

impl QueryEngine for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn tickers(&self) -> Result<TickerSet, StoreError> {
        let conn = self.read()?;
        let mut stmt = conn.prepare("SELECT symbol, name, exchange FROM tickers")?;
        let tickers = stmt
            .query_map([], |row| {
                Ok(Ticker {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    exchange: row.get(2)?,
                })
            })?
            .collect::<Result<TickerSet, _>>()?;
        Ok(tickers)
    }

    fn range(&self, ticker: &str, window: TimeRange) -> Result<Vec<Bar>, StoreError> {
        let conn = self.read()?;
        Self::ensure_ticker(&conn, ticker)?;
        let mut stmt = conn.prepare(RANGE_SQL)?;
        let rows = stmt.query_map(
            params![ticker, format_ts(window.start), format_ts(window.end)],
            raw_bar_row,
        )?;
        let bars = collect_bars(rows)?;
        debug!(backend = "sqlite", ticker, rows = bars.len(), "range query");
        Ok(bars)
    }

    fn average_daily_volume(&self) -> Result<Vec<VolumeSummary>, StoreError> {
        let conn = self.read()?;
        let mut stmt = conn.prepare(AVG_VOLUME_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (symbol, avg) = row?;
            let avg_daily_volume = u64::try_from(avg).map_err(|_| {
                StoreError::InvalidData(format!("negative average volume for {symbol}"))
            })?;
            out.push(VolumeSummary {
                symbol,
                avg_daily_volume,
            });
        }
        Ok(out)
    }

    fn top_returns(&self, window: TimeRange, n: usize) -> Result<Vec<TickerReturn>, StoreError> {
        let conn = self.read()?;
        let mut stmt = conn.prepare(TOP_RETURNS_SQL)?;
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows = stmt.query_map(
            params![format_ts(window.start), format_ts(window.end), limit],
            |row| {
                Ok(TickerReturn {
                    symbol: row.get(0)?,
                    return_pct: row.get(1)?,
                })
            },
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn daily_summary(&self, limit: Option<usize>) -> Result<Vec<DailySummary>, StoreError> {
        let conn = self.read()?;
        let mut stmt = conn.prepare(DAILY_SUMMARY_SQL)?;
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (symbol, date, first_trade_price, last_trade_price) = row?;
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| StoreError::InvalidData(format!("trade date '{date}': {e}")))?;
            out.push(DailySummary {
                symbol,
                date,
                first_trade_price,
                last_trade_price,
            });
        }
        Ok(out)
    }

    fn ticker_bars(&self, ticker: &str) -> Result<Vec<Bar>, StoreError> {
        let conn = self.read()?;
        Self::ensure_ticker(&conn, ticker)?;
        let sql = format!(
            "SELECT {BAR_COLUMNS} FROM prices p JOIN tickers t ON p.ticker_id = t.ticker_id \
             WHERE t.symbol = ?1 ORDER BY p.timestamp ASC, p.id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([ticker], raw_bar_row)?;
        collect_bars(rows)
    }

    fn all_bars(&self) -> Result<Vec<Bar>, StoreError> {
        let conn = self.read()?;
        let sql = format!(
            "SELECT {BAR_COLUMNS} FROM prices p JOIN tickers t ON p.ticker_id = t.ticker_id \
             ORDER BY t.symbol ASC, p.timestamp ASC, p.id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], raw_bar_row)?;
        collect_bars(rows)
    }

    fn footprint_bytes(&self) -> Result<u64, StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::StorageMissing {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Load helpers ────────────────────────────────────────────────────

/// Create the schema at `path` and insert everything in one transaction.
fn build_database(path: &Path, tickers: &TickerSet, bars: &[Bar]) -> Result<LoadReport, StoreError> {
    let mut conn = Connection::open(path)?;
    enable_foreign_keys(&conn)?;
    conn.execute_batch(SCHEMA_SQL)?;

    let tx = conn.transaction()?;
    {
        let mut upsert = tx.prepare(UPSERT_TICKER_SQL)?;
        for ticker in tickers.iter() {
            upsert.execute(params![ticker.symbol, ticker.name, ticker.exchange])?;
        }
    }

    let symbol_to_id = symbol_map(&tx)?;
    let mut report = LoadReport {
        tickers: symbol_to_id.len(),
        ..LoadReport::default()
    };
    {
        let mut insert = tx.prepare(INSERT_PRICE_SQL)?;
        for bar in bars {
            let Some(&ticker_id) = symbol_to_id.get(bar.symbol.as_str()) else {
                report.dropped_orphans += 1;
                continue;
            };
            let (ts, volume) = price_columns(bar)?;
            match insert.execute(params![
                ts, ticker_id, bar.open, bar.high, bar.low, bar.close, volume
            ]) {
                Ok(_) => report.bars_loaded += 1,
                Err(e) if is_constraint_violation(&e) => {
                    warn!(symbol = %bar.symbol, timestamp = %bar.timestamp, "price row rejected: {e}");
                    report.rejected_rows += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    tx.commit()?;
    Ok(report)
}

// ── Row helpers ─────────────────────────────────────────────────────

type RawBarRow = (String, String, f64, f64, f64, f64, i64);

fn raw_bar_row(row: &Row<'_>) -> rusqlite::Result<RawBarRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn collect_bars(
    rows: impl Iterator<Item = rusqlite::Result<RawBarRow>>,
) -> Result<Vec<Bar>, StoreError> {
    let mut bars = Vec::new();
    for row in rows {
        let (symbol, ts, open, high, low, close, volume) = row?;
        let timestamp = parse_ts(&ts)?;
        let volume = u64::try_from(volume)
            .map_err(|_| StoreError::InvalidData(format!("negative volume for {symbol} at {ts}")))?;
        let bar = Bar::new(symbol, timestamp, open, high, low, close, volume)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        bars.push(bar);
    }
    Ok(bars)
}

/// Timestamp text and volume as SQLite stores them.
fn price_columns(bar: &Bar) -> Result<(String, i64), StoreError> {
    let volume = i64::try_from(bar.volume).map_err(|_| {
        StoreError::UnsupportedInput(format!("volume {} overflows INTEGER", bar.volume))
    })?;
    Ok((format_ts(bar.timestamp), volume))
}

fn symbol_map(conn: &Connection) -> Result<HashMap<String, i64>, StoreError> {
    let mut stmt = conn.prepare("SELECT symbol, ticker_id FROM tickers")?;
    let map = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(map)
}

fn enable_foreign_keys(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(text: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| StoreError::InvalidData(format!("timestamp '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(symbol: &str, at: NaiveDateTime, open: f64, close: f64, volume: u64) -> Bar {
        Bar::new(symbol, at, open, open.max(close) + 1.0, open.min(close) - 1.0, close, volume)
            .unwrap()
    }

    fn tickers() -> TickerSet {
        vec![
            Ticker::new("AAPL", "Apple Inc.", "NASDAQ"),
            Ticker::new("TSLA", "Tesla Inc.", "NASDAQ"),
        ]
        .into_iter()
        .collect()
    }

    fn sample_bars() -> Vec<Bar> {
        vec![
            bar("AAPL", ts(17, 9, 30), 100.0, 101.0, 1000),
            bar("AAPL", ts(17, 9, 31), 101.0, 102.0, 3000),
            bar("TSLA", ts(17, 9, 30), 250.0, 245.0, 2000),
            bar("AAPL", ts(18, 9, 30), 103.0, 110.0, 1500),
            bar("MSFT", ts(17, 9, 30), 410.0, 411.0, 900),
        ]
    }

    fn loaded(dir: &tempfile::TempDir) -> (SqliteStore, LoadReport) {
        SqliteStore::load(
            dir.path().join("market_data.db"),
            &tickers(),
            &sample_bars(),
            ReloadPolicy::Replace,
        )
        .unwrap()
    }

    #[test]
    fn timestamp_text_roundtrip() {
        let t = ts(17, 9, 30) + chrono::Duration::milliseconds(42);
        assert_eq!(format_ts(t), "2025-11-17 09:30:00.042");
        assert_eq!(parse_ts(&format_ts(t)).unwrap(), t);
    }

    #[test]
    fn load_drops_orphans_and_counts_them() {
        let dir = tempfile::tempdir().unwrap();
        let (store, report) = loaded(&dir);
        assert_eq!(report.tickers, 2);
        assert_eq!(report.bars_loaded, 4);
        assert_eq!(report.dropped_orphans, 1);
        assert_eq!(report.rejected_rows, 0);
        assert!(store.all_bars().unwrap().iter().all(|b| b.symbol != "MSFT"));
    }

    #[test]
    fn range_unknown_ticker_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let err = store
            .range("MSFT", TimeRange::new(ts(17, 0, 0), ts(18, 23, 0)))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTicker { .. }));
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let bars = store
            .range("AAPL", TimeRange::new(ts(17, 9, 31), ts(18, 9, 30)))
            .unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![102.0, 110.0]);
    }

    #[test]
    fn insert_price_with_unknown_ticker_id_violates_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let err = store
            .insert_price(999, &bar("AAPL", ts(19, 9, 30), 1.0, 1.0, 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)), "{err}");
        assert_eq!(store.all_bars().unwrap().len(), 4);
    }

    #[test]
    fn insert_price_with_known_ticker_id_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let ids = {
            let conn = store.read().unwrap();
            symbol_map(&conn).unwrap()
        };
        store
            .insert_price(ids["TSLA"], &bar("TSLA", ts(19, 9, 30), 240.0, 241.0, 10))
            .unwrap();
        assert_eq!(store.ticker_bars("TSLA").unwrap().len(), 2);
    }

    #[test]
    fn skip_existing_leaves_data_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let (again, report) =
            SqliteStore::load(store.path(), &tickers(), &[], ReloadPolicy::SkipExisting).unwrap();
        assert!(report.skipped);
        assert_eq!(again.all_bars().unwrap().len(), 4);
    }

    #[test]
    fn replace_rebuilds_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let fresh = vec![bar("TSLA", ts(20, 9, 30), 1.0, 2.0, 5)];
        let (again, report) =
            SqliteStore::load(store.path(), &tickers(), &fresh, ReloadPolicy::Replace).unwrap();
        assert!(!report.skipped);
        assert_eq!(again.all_bars().unwrap(), fresh);
    }

    #[test]
    fn query_after_file_removed_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        fs::remove_file(store.path()).unwrap();
        assert!(store.average_daily_volume().unwrap_err().is_not_found());
        assert!(store.footprint_bytes().unwrap_err().is_not_found());
    }

    #[test]
    fn refused_load_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_data.db");
        let oversized = vec![bar("AAPL", ts(17, 9, 30), 1.0, 2.0, u64::MAX)];
        let err = SqliteStore::load(&path, &tickers(), &oversized, ReloadPolicy::Replace).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedInput(_)), "{err}");
        assert!(!path.exists());
        assert!(!staging_path(&path).exists());

        let (store, report) =
            SqliteStore::load(&path, &tickers(), &sample_bars(), ReloadPolicy::SkipExisting).unwrap();
        assert!(!report.skipped);
        assert_eq!(store.all_bars().unwrap().len(), 4);
    }

    #[test]
    fn failed_replace_keeps_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let bad_tickers: TickerSet = vec![Ticker::new("BRK/B", "Berkshire Hathaway", "NYSE")]
            .into_iter()
            .collect();
        let err = SqliteStore::load(store.path(), &bad_tickers, &[], ReloadPolicy::Replace).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedInput(_)), "{err}");
        assert_eq!(store.all_bars().unwrap().len(), 4);
    }

    #[test]
    fn stale_staging_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market_data.db");
        fs::write(staging_path(&path), b"left over from a crash").unwrap();
        let (store, _) =
            SqliteStore::load(&path, &tickers(), &sample_bars(), ReloadPolicy::Replace).unwrap();
        assert_eq!(store.all_bars().unwrap().len(), 4);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn average_volume_near_integer_limit_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let big = crate::store::MAX_VOLUME;
        let bars = vec![
            bar("AAPL", ts(17, 9, 30), 1.0, 1.0, big),
            bar("AAPL", ts(17, 9, 31), 1.0, 1.0, big - 1),
            bar("TSLA", ts(17, 9, 30), 1.0, 1.0, 5_000_000_000_000_000_000),
            bar("TSLA", ts(17, 9, 31), 1.0, 1.0, 5_000_000_000_000_000_000),
        ];
        let (store, _) = SqliteStore::load(
            dir.path().join("market_data.db"),
            &tickers(),
            &bars,
            ReloadPolicy::Replace,
        )
        .unwrap();
        assert_eq!(
            store.average_daily_volume().unwrap(),
            vec![
                VolumeSummary { symbol: "AAPL".into(), avg_daily_volume: big - 1 },
                VolumeSummary { symbol: "TSLA".into(), avg_daily_volume: 5_000_000_000_000_000_000 },
            ]
        );
    }

    #[test]
    fn footprint_is_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = loaded(&dir);
        let expected = fs::metadata(store.path()).unwrap().len();
        assert_eq!(store.footprint_bytes().unwrap(), expected);
        assert!(expected > 0);
    }
}
