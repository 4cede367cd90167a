//! Rolling statistics over stored bars.

pub mod rolling;

pub use rolling::{
    close_mean_for_ticker, rolling_close_mean, rolling_volatility, volatility_for_all,
    RollingError, RollingMeanRow, VolatilityRow, DEFAULT_WINDOW,
};
