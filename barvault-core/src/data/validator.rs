//! Validation of collaborator-supplied records into [`Bar`]s.
//!
//! Upstream parsing produces [`RawBar`] rows whose fields may be missing. The
//! validator enforces the non-null rules and checks that every reference
//! ticker is represented. Rows whose symbol is *not* in the reference set pass
//! through untouched: the storage backends drop and count them at load time.

use crate::domain::{Bar, BarError, TickerSet};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// A typed but unvalidated market-data row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub ticker: String,
    pub timestamp: Option<NaiveDateTime>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("found {count} invalid or missing timestamps")]
    MissingTimestamps { count: usize },

    #[error("found {count} missing price/volume values")]
    MissingValues { count: usize },

    #[error("reference tickers missing from market data: {symbols:?}")]
    MissingTickers { symbols: Vec<String> },

    #[error("invalid bar: {0}")]
    InvalidBar(#[from] BarError),
}

/// Turns raw rows into validated bars.
#[derive(Debug, Default)]
pub struct DataValidator;

impl DataValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `raw` against the reference `tickers`, preserving input order.
    ///
    /// Failures are reported in a fixed order: missing timestamps, missing
    /// values, absent reference tickers, then the first invalid bar.
    pub fn validate(&self, raw: Vec<RawBar>, tickers: &TickerSet) -> Result<Vec<Bar>, ValidationError> {
        let mut missing_ts = 0;
        let mut missing_values = 0;
        let mut first_invalid = None;
        let mut present = BTreeSet::new();
        let mut bars = Vec::with_capacity(raw.len());

        for row in raw {
            missing_values += missing_cells(&row);
            if !present.contains(&row.ticker) {
                present.insert(row.ticker.clone());
            }
            match (row.timestamp, row.open, row.high, row.low, row.close, row.volume) {
                (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(volume)) => {
                    match Bar::new(row.ticker, ts, open, high, low, close, volume) {
                        Ok(bar) => bars.push(bar),
                        Err(e) => {
                            first_invalid.get_or_insert(e);
                        }
                    }
                }
                (None, ..) => missing_ts += 1,
                // Counted in `missing_values`.
                _ => {}
            }
        }

        if missing_ts > 0 {
            return Err(ValidationError::MissingTimestamps { count: missing_ts });
        }
        if missing_values > 0 {
            return Err(ValidationError::MissingValues {
                count: missing_values,
            });
        }
        let absent: Vec<String> = tickers
            .symbols()
            .filter(|s| !present.contains(*s))
            .map(String::from)
            .collect();
        if !absent.is_empty() {
            return Err(ValidationError::MissingTickers { symbols: absent });
        }
        if let Some(e) = first_invalid {
            return Err(e.into());
        }

        tracing::debug!(bars = bars.len(), tickers = tickers.len(), "validated market data");
        Ok(bars)
    }
}

fn missing_cells(row: &RawBar) -> usize {
    [
        row.open.is_none(),
        row.high.is_none(),
        row.low.is_none(),
        row.close.is_none(),
        row.volume.is_none(),
    ]
    .into_iter()
    .filter(|missing| *missing)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ticker;
    use chrono::NaiveDate;

    fn ts(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 17)
            .unwrap()
            .and_hms_opt(9, 30 + m, 0)
            .unwrap()
    }

    fn raw(ticker: &str, minute: u32, close: f64) -> RawBar {
        RawBar {
            ticker: ticker.into(),
            timestamp: Some(ts(minute)),
            open: Some(close - 0.5),
            high: Some(close + 1.0),
            low: Some(close - 1.0),
            close: Some(close),
            volume: Some(1000),
        }
    }

    fn reference() -> TickerSet {
        vec![
            Ticker::new("AAPL", "Apple Inc.", "NASDAQ"),
            Ticker::new("TSLA", "Tesla Inc.", "NASDAQ"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn valid_rows_become_bars_in_order() {
        let rows = vec![raw("TSLA", 0, 250.5), raw("AAPL", 0, 270.88), raw("AAPL", 1, 269.24)];
        let bars = DataValidator::new().validate(rows, &reference()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "TSLA");
        assert_eq!(bars[2].close, 269.24);
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let mut rows = vec![raw("AAPL", 0, 270.0), raw("TSLA", 1, 250.0)];
        rows[1].timestamp = None;
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert_eq!(err, ValidationError::MissingTimestamps { count: 1 });
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn missing_prices_are_counted() {
        let mut rows = vec![raw("AAPL", 0, 270.0), raw("TSLA", 1, 250.0)];
        rows[0].open = None;
        rows[0].close = None;
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert_eq!(err, ValidationError::MissingValues { count: 2 });
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn reference_ticker_absent_from_data_is_rejected() {
        let rows = vec![raw("AAPL", 0, 270.0)];
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingTickers {
                symbols: vec!["TSLA".into()]
            }
        );
    }

    #[test]
    fn unknown_symbols_pass_through_for_the_store_to_drop() {
        let rows = vec![raw("AAPL", 0, 270.0), raw("TSLA", 0, 250.0), raw("MSFT", 0, 410.0)];
        let bars = DataValidator::new().validate(rows, &reference()).unwrap();
        assert_eq!(bars.len(), 3);
        assert!(bars.iter().any(|b| b.symbol == "MSFT"));
    }

    #[test]
    fn every_row_is_accounted_for() {
        let mut rows = vec![
            raw("AAPL", 0, 270.0),
            raw("TSLA", 0, 250.0),
            raw("AAPL", 1, 271.0),
        ];
        rows[0].timestamp = None;
        rows[0].volume = None;
        rows[2].low = None;
        let err = DataValidator::new().validate(rows.clone(), &reference()).unwrap_err();
        assert_eq!(err, ValidationError::MissingTimestamps { count: 1 });

        rows[0].timestamp = Some(ts(0));
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert_eq!(err, ValidationError::MissingValues { count: 2 });
    }

    #[test]
    fn missing_values_are_reported_before_invalid_prices() {
        let mut rows = vec![raw("AAPL", 0, 270.0), raw("TSLA", 0, 250.0)];
        rows[0].high = Some(f64::INFINITY);
        rows[1].open = None;
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert_eq!(err, ValidationError::MissingValues { count: 1 });
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let mut rows = vec![raw("AAPL", 0, 270.0), raw("TSLA", 0, 250.0)];
        rows[1].high = Some(f64::NAN);
        let err = DataValidator::new().validate(rows, &reference()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBar(_)));
    }
}
