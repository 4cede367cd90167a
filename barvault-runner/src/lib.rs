//! BarVault Runner: benchmark harness around `barvault-core`.
//!
//! This crate provides:
//! - Side-by-side timing and footprint comparison of the two backends
//! - TOML benchmark configuration
//! - Deterministic synthetic sessions for benches and tests
//! - Tracing subscriber setup and lightweight profiling scopes

pub mod benchmark;
pub mod config;
pub mod logging;
pub mod profiling;
pub mod synthetic;

pub use benchmark::{
    compare, run_benchmark, run_from_config, run_query, run_suite, write_reports, BackendMeasurement,
    BenchmarkError, BenchmarkQuery, BenchmarkReport, Comparison, QueryKind,
};
pub use config::{BenchConfig, ConfigError};
pub use synthetic::{default_tickers, generate_session};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<BenchmarkReport>();
        assert_sync::<BenchmarkReport>();
        assert_send::<BenchConfig>();
        assert_sync::<BenchConfig>();
        assert_send::<BenchmarkError>();
        assert_sync::<BenchmarkError>();
    }
}
