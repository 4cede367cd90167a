//! Bar: the fundamental market data unit.

use chrono::{NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single ticker at a single point in time.
///
/// Timestamps are naive wall-clock times truncated to millisecond precision,
/// which is the finest resolution both storage layouts round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("non-finite {field} for {symbol} at {timestamp}")]
    NonFinitePrice {
        symbol: String,
        timestamp: NaiveDateTime,
        field: &'static str,
    },

    #[error("empty ticker symbol at {timestamp}")]
    EmptySymbol { timestamp: NaiveDateTime },
}

impl Bar {
    /// Build a bar, rejecting non-finite prices.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, BarError> {
        let symbol = symbol.into();
        let timestamp = timestamp.trunc_subsecs(3);
        if symbol.is_empty() {
            return Err(BarError::EmptySymbol { timestamp });
        }
        for (field, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !value.is_finite() {
                return Err(BarError::NonFinitePrice {
                    symbol,
                    timestamp,
                    field,
                });
            }
        }
        Ok(Self {
            symbol,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Calendar date of the bar's timestamp.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Inclusive `[start, end]` time window used by range-scoped queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    /// Both bounds are truncated to milliseconds, like bar timestamps.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: start.trunc_subsecs(3),
            end: end.trunc_subsecs(3),
        }
    }

    /// Window from midnight of `start` to midnight of `end`, both inclusive.
    ///
    /// Bars later on the `end` date fall outside the window.
    pub fn days(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(chrono::NaiveTime::MIN),
            end: end.and_time(chrono::NaiveTime::MIN),
        }
    }

    #[inline]
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}
