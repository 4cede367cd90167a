//! Physical storage backends.
//!
//! - [`SqliteStore`]: normalised `tickers` / `prices` tables, queries expressed
//!   as single SQL statements.
//! - [`ParquetStore`]: Hive-style `ticker=<SYMBOL>/` partitions, queries answered
//!   by partition pruning plus in-memory aggregation.
//!
//! Both are built once by a bulk load and are read-only afterwards.

pub mod columnar;
pub mod error;
pub mod relational;
pub mod schema;

pub use columnar::{ParquetStore, PartitionMeta};
pub use error::StoreError;
pub use relational::SqliteStore;

use crate::domain::{Bar, TickerSet};
use crate::query::QueryEngine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest volume either backend accepts (SQLite `INTEGER` is signed 64-bit).
pub const MAX_VOLUME: u64 = i64::MAX as u64;

/// What a load does when the target location already exists.
///
/// Applied the same way by both backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Keep the existing store untouched and open it.
    #[default]
    SkipExisting,
    /// Remove the existing store and rebuild it from the supplied bars.
    Replace,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub tickers: usize,
    pub bars_loaded: usize,
    /// Bars whose symbol is not in the reference ticker set.
    pub dropped_orphans: usize,
    /// Rows refused by the store's own integrity constraints.
    pub rejected_rows: usize,
    /// True when the load was a no-op under [`ReloadPolicy::SkipExisting`].
    pub skipped: bool,
}

impl LoadReport {
    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Physical layout selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Relational,
    Columnar,
}

/// True when `symbol` can name a `ticker=<SYMBOL>` partition directory.
pub fn is_storable_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && !symbol.contains(['/', '\\']) && symbol != "." && symbol != ".."
}

/// Refuse inputs that either backend could not store.
///
/// Runs before a load touches disk, so both backends accept and refuse
/// exactly the same inputs. Orphan bars are not checked: they are dropped.
pub(crate) fn check_loadable(tickers: &TickerSet, bars: &[Bar]) -> Result<(), StoreError> {
    if let Some(ticker) = tickers.iter().find(|t| !is_storable_symbol(&t.symbol)) {
        return Err(StoreError::UnsupportedInput(format!(
            "symbol '{}' cannot name a partition directory",
            ticker.symbol
        )));
    }
    if let Some(bar) = bars
        .iter()
        .find(|b| b.volume > MAX_VOLUME && tickers.contains(&b.symbol))
    {
        return Err(StoreError::UnsupportedInput(format!(
            "volume {} of {} at {} exceeds {MAX_VOLUME}",
            bar.volume, bar.symbol, bar.timestamp
        )));
    }
    Ok(())
}

/// Sibling path a load builds into before renaming it over the target.
pub(crate) fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Open an existing store as a query engine.
pub fn open_engine(kind: BackendKind, path: &Path) -> Result<Box<dyn QueryEngine>, StoreError> {
    Ok(match kind {
        BackendKind::Relational => Box::new(SqliteStore::open(path)?),
        BackendKind::Columnar => Box::new(ParquetStore::open(path)?),
    })
}
