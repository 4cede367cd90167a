//! Trailing-window statistics per ticker.
//!
//! Windows count positions, not wall-clock time, and never cross from one
//! ticker into another. Leading positions use however many values exist
//! (minimum one period).

use crate::domain::Bar;
use crate::query::QueryEngine;
use crate::store::StoreError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Window used when the caller has no preference.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Error)]
pub enum RollingError {
    #[error("window must be at least 1")]
    ZeroWindow,

    #[error("bars for {symbol} are not sorted by timestamp at position {position}")]
    Unsorted { symbol: String, position: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMeanRow {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub rolling_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRow {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    /// Simple return against the previous bar of the same ticker.
    pub ret: Option<f64>,
    /// Sample standard deviation of the defined returns in the window.
    pub volatility: Option<f64>,
}

/// Trailing mean of closes over `window` positions.
pub fn rolling_close_mean(bars: &[Bar], window: usize) -> Result<Vec<RollingMeanRow>, RollingError> {
    let groups = sorted_groups(bars, window)?;
    let mut out = Vec::with_capacity(bars.len());
    for (symbol, group) in groups {
        let mut sum = 0.0;
        for (i, bar) in group.iter().enumerate() {
            sum += bar.close;
            if i >= window {
                sum -= group[i - window].close;
            }
            let len = (i + 1).min(window);
            out.push(RollingMeanRow {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
                close: bar.close,
                rolling_mean: sum / len as f64,
            });
        }
    }
    Ok(out)
}

/// Trailing volatility of simple returns over `window` positions.
pub fn rolling_volatility(bars: &[Bar], window: usize) -> Result<Vec<VolatilityRow>, RollingError> {
    let groups = sorted_groups(bars, window)?;
    let mut out = Vec::with_capacity(bars.len());
    for (symbol, group) in groups {
        let returns: Vec<Option<f64>> = group
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let prev = group[i.checked_sub(1)?].close;
                (prev != 0.0).then(|| bar.close / prev - 1.0)
            })
            .collect();

        for (i, bar) in group.iter().enumerate() {
            let start = (i + 1).saturating_sub(window);
            let defined: Vec<f64> = returns[start..=i].iter().flatten().copied().collect();
            out.push(VolatilityRow {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
                close: bar.close,
                ret: returns[i],
                volatility: sample_std(&defined),
            });
        }
    }
    Ok(out)
}

/// Rolling close mean for one ticker, reading only that ticker's bars.
pub fn close_mean_for_ticker(
    engine: &dyn QueryEngine,
    ticker: &str,
    window: usize,
) -> Result<Vec<RollingMeanRow>, RollingError> {
    let bars = engine.ticker_bars(ticker)?;
    rolling_close_mean(&bars, window)
}

/// Rolling volatility for every stored ticker.
pub fn volatility_for_all(
    engine: &dyn QueryEngine,
    window: usize,
) -> Result<Vec<VolatilityRow>, RollingError> {
    let bars = engine.all_bars()?;
    rolling_volatility(&bars, window)
}

/// Group by symbol (ascending), keeping input order inside each group.
fn sorted_groups(bars: &[Bar], window: usize) -> Result<BTreeMap<&str, Vec<&Bar>>, RollingError> {
    if window == 0 {
        return Err(RollingError::ZeroWindow);
    }
    let mut groups: BTreeMap<&str, Vec<&Bar>> = BTreeMap::new();
    for bar in bars {
        groups.entry(bar.symbol.as_str()).or_default().push(bar);
    }
    for (symbol, group) in &groups {
        if let Some(position) = group.windows(2).position(|w| w[1].timestamp < w[0].timestamp) {
            return Err(RollingError::Unsorted {
                symbol: symbol.to_string(),
                position: position + 1,
            });
        }
    }
    Ok(groups)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}
