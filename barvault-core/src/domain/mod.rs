//! Domain types shared by both storage backends.

pub mod bar;
pub mod ticker;

pub use bar::{Bar, BarError, TimeRange};
pub use ticker::{Ticker, TickerSet};

/// Symbol type alias
pub type Symbol = String;
