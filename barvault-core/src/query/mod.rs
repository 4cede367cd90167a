//! The backend-agnostic query contract.
//!
//! Callers hold a `dyn QueryEngine` and never branch on the concrete backend.
//! Both implementations must return equal results for the same loaded bar set.

pub mod types;

pub use types::{
    cmp_daily, cmp_return, cmp_volume, percent_return, round2, DailySummary, MarketSnapshot,
    TickerReturn, VolumeSummary,
};

use crate::domain::{Bar, TickerSet, TimeRange};
use crate::store::StoreError;

/// Default `n` for [`QueryEngine::top_returns`].
pub const DEFAULT_TOP_N: usize = 3;

pub trait QueryEngine: Send + Sync {
    /// Short backend label used in logs and benchmark reports.
    fn name(&self) -> &str;

    /// The reference ticker set the store was built with.
    fn tickers(&self) -> Result<TickerSet, StoreError>;

    /// Bars of `ticker` inside `window`, ascending by timestamp.
    ///
    /// Fails with [`StoreError::UnknownTicker`] for a symbol outside the
    /// reference set; an empty window is not an error.
    fn range(&self, ticker: &str, window: TimeRange) -> Result<Vec<Bar>, StoreError>;

    /// Truncated mean volume per ticker, volume desc then symbol asc.
    fn average_daily_volume(&self) -> Result<Vec<VolumeSummary>, StoreError>;

    /// Best `n` tickers by percentage return over `window`.
    fn top_returns(&self, window: TimeRange, n: usize) -> Result<Vec<TickerReturn>, StoreError>;

    /// First/last trade price per (ticker, date), date desc then symbol asc.
    fn daily_summary(&self, limit: Option<usize>) -> Result<Vec<DailySummary>, StoreError>;

    /// Every stored bar of one ticker, ascending by timestamp.
    fn ticker_bars(&self, ticker: &str) -> Result<Vec<Bar>, StoreError>;

    /// Every stored bar, ordered by symbol then timestamp.
    fn all_bars(&self) -> Result<Vec<Bar>, StoreError>;

    /// Bytes the backend occupies on disk.
    fn footprint_bytes(&self) -> Result<u64, StoreError>;

    /// The four standard queries with shared parameters.
    fn all(&self, ticker: &str, window: TimeRange) -> Result<MarketSnapshot, StoreError> {
        Ok(MarketSnapshot {
            range: self.range(ticker, window)?,
            volume_summary: self.average_daily_volume()?,
            top_returns: self.top_returns(window, DEFAULT_TOP_N)?,
            daily_summary: self.daily_summary(None)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the trait stays object safe and `all` is callable
    /// through a trait object.
    #[allow(dead_code)]
    fn assert_object_safe(engine: &dyn QueryEngine, window: TimeRange) -> Result<MarketSnapshot, StoreError> {
        engine.all("AAPL", window)
    }
}
