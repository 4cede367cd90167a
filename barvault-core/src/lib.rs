//! BarVault Core: one OHLCV dataset, two physical layouts, one query contract.
//!
//! This crate contains:
//! - Domain types (bars, tickers, time windows)
//! - Hand-off validation for raw bars produced by an upstream parser
//! - A relational backend (SQLite, normalised tables, SQL window functions)
//! - A columnar backend (Parquet, ticker partitions, pruning and projection)
//! - The backend-agnostic `QueryEngine` trait both backends implement
//! - Rolling statistics over bars read through either backend

pub mod data;
pub mod domain;
pub mod query;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: domain types and both backends are Send + Sync.
    ///
    /// Engines are handed to benchmark code as `Box<dyn QueryEngine>`, which
    /// requires it.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TickerSet>();
        require_sync::<domain::TickerSet>();
        require_send::<domain::TimeRange>();
        require_sync::<domain::TimeRange>();

        require_send::<store::SqliteStore>();
        require_sync::<store::SqliteStore>();
        require_send::<store::ParquetStore>();
        require_sync::<store::ParquetStore>();
        require_send::<store::StoreError>();
        require_sync::<store::StoreError>();

        require_send::<query::MarketSnapshot>();
        require_sync::<query::MarketSnapshot>();
    }

    /// Callers choose a backend once and never branch on it.
    #[test]
    fn engines_are_interchangeable_behind_the_trait() {
        use store::{open_engine, BackendKind, ParquetStore, ReloadPolicy, SqliteStore};

        let dir = tempfile::tempdir().unwrap();
        let tickers: domain::TickerSet = vec![domain::Ticker::new("AAPL", "Apple Inc.", "NASDAQ")]
            .into_iter()
            .collect();
        let day = chrono::NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        let at = day.and_hms_opt(9, 30, 0).unwrap();
        let bars = vec![domain::Bar::new("AAPL", at, 100.0, 111.0, 99.0, 110.0, 500).unwrap()];

        let db = dir.path().join("market_data.db");
        let root = dir.path().join("market_data");
        SqliteStore::load(&db, &tickers, &bars, ReloadPolicy::Replace).unwrap();
        ParquetStore::load(&root, &tickers, &bars, ReloadPolicy::Replace).unwrap();

        let engines: Vec<Box<dyn query::QueryEngine>> = vec![
            open_engine(BackendKind::Relational, &db).unwrap(),
            open_engine(BackendKind::Columnar, &root).unwrap(),
        ];
        let window = domain::TimeRange::days(day, day.succ_opt().unwrap());
        let snapshots: Vec<query::MarketSnapshot> = engines
            .iter()
            .map(|engine| engine.all("AAPL", window).unwrap())
            .collect();

        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[0].range, bars);
        assert_eq!(snapshots[0].top_returns[0].return_pct, 10.0);
    }
}
