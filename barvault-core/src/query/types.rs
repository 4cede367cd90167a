//! Query result rows and the numeric rules shared by both backends.
//!
//! Both backends route every rounded value through [`percent_return`] /
//! [`round2`] and order rows with the comparators below, so equal inputs give
//! equal outputs regardless of where the aggregation runs.

use crate::domain::{Bar, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Mean volume of one ticker over every stored bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSummary {
    pub symbol: Symbol,
    pub avg_daily_volume: u64,
}

/// Percentage return of one ticker over a window, rounded to 2 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerReturn {
    pub symbol: Symbol,
    pub return_pct: f64,
}

/// First and last trade price of one ticker on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub first_trade_price: f64,
    pub last_trade_price: f64,
}

/// Result of [`QueryEngine::all`](super::QueryEngine::all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub range: Vec<Bar>,
    pub volume_summary: Vec<VolumeSummary>,
    pub top_returns: Vec<TickerReturn>,
    pub daily_summary: Vec<DailySummary>,
}

/// Round half away from zero to two decimals. Negative zero becomes zero.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// `(last_close - first_open) / first_open * 100`, rounded to 2 dp.
///
/// `None` when `first_open <= 0`: such tickers are excluded from rankings.
pub fn percent_return(first_open: f64, last_close: f64) -> Option<f64> {
    if first_open > 0.0 {
        Some(round2((last_close - first_open) / first_open * 100.0))
    } else {
        None
    }
}

/// Volume descending, then symbol ascending.
pub fn cmp_volume(a: &VolumeSummary, b: &VolumeSummary) -> Ordering {
    b.avg_daily_volume
        .cmp(&a.avg_daily_volume)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Return descending, then symbol ascending.
pub fn cmp_return(a: &TickerReturn, b: &TickerReturn) -> Ordering {
    b.return_pct
        .total_cmp(&a.return_pct)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Date descending, then symbol ascending.
pub fn cmp_daily(a: &DailySummary, b: &DailySummary) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.symbol.cmp(&b.symbol))
}
