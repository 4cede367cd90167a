//! Deterministic synthetic minute sessions.
//!
//! Each ticker gets a random walk seeded from the BLAKE3 hash of its symbol,
//! so the same arguments always produce the same bars.

use barvault_core::domain::{Bar, Ticker, TickerSet};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reference set used by benches and tests.
pub fn default_tickers() -> TickerSet {
    vec![
        Ticker::new("AAPL", "Apple Inc.", "NASDAQ"),
        Ticker::new("AMZN", "Amazon.com Inc.", "NASDAQ"),
        Ticker::new("GOOG", "Alphabet Inc.", "NASDAQ"),
        Ticker::new("MSFT", "Microsoft Corp.", "NASDAQ"),
        Ticker::new("TSLA", "Tesla Inc.", "NASDAQ"),
    ]
    .into_iter()
    .collect()
}

/// `bars_per_ticker` one-minute bars per ticker starting at `start`.
///
/// Output is grouped by ticker in ascending symbol order.
pub fn generate_session(tickers: &TickerSet, start: NaiveDateTime, bars_per_ticker: usize) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(tickers.len() * bars_per_ticker);
    for symbol in tickers.symbols() {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);
        let mut price = rng.gen_range(50.0..500.0_f64);

        for i in 0..bars_per_ticker {
            let step: f64 = rng.gen_range(-0.002..0.002);
            let open = round_cents(price);
            let close = round_cents(price * (1.0 + step));
            let high = round_cents(open.max(close) * (1.0 + rng.gen_range(0.0..0.001)));
            let low = round_cents(open.min(close) * (1.0 - rng.gen_range(0.0..0.001)));
            let volume = rng.gen_range(100..50_000u64);
            let timestamp = start + chrono::Duration::minutes(i as i64);

            // Prices are finite and the symbol comes from a non-empty key.
            if let Ok(bar) = Bar::new(symbol, timestamp, open, high, low, close, volume) {
                bars.push(bar);
            }
            price = close;
        }
    }
    bars
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
