use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference data for a tradable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
}

impl Ticker {
    pub fn new(symbol: impl Into<String>, name: &str, exchange: &str) -> Self {
        Self {
            symbol: symbol.into(),
            name: Some(name.to_string()),
            exchange: Some(exchange.to_string()),
        }
    }
}

/// The reference ticker set, keyed by symbol.
///
/// Built once at load time and never mutated afterwards. A later entry with an
/// already-seen symbol replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSet {
    tickers: BTreeMap<String, Ticker>,
}

impl TickerSet {
    pub fn contains(&self, symbol: &str) -> bool {
        self.tickers.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Ticker> {
        self.tickers.get(symbol)
    }

    /// Symbols in ascending order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tickers.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticker> {
        self.tickers.values()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

impl FromIterator<Ticker> for TickerSet {
    fn from_iter<I: IntoIterator<Item = Ticker>>(iter: I) -> Self {
        let tickers = iter
            .into_iter()
            .map(|t| (t.symbol.clone(), t))
            .collect();
        Self { tickers }
    }
}
