//! Timing helpers for backend measurements.
//!
//! # Usage
//!
//! ```
//! use barvault_runner::profiling::ProfileScope;
//!
//! fn load_partitions() {
//!     let _scope = ProfileScope::new("load_partitions");
//!     // Timing logged on drop
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `BARVAULT_PROFILE=1` - log every scope and profiled closure at INFO

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PROFILING_ENABLED: AtomicBool = AtomicBool::new(false);

static TOTAL_OPERATIONS: AtomicU64 = AtomicU64::new(0);

/// Read `BARVAULT_PROFILE` and enable or disable logging of timings.
pub fn init() {
    let enabled = std::env::var("BARVAULT_PROFILE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    set_enabled(enabled);
    if enabled {
        tracing::info!("profiling enabled (BARVAULT_PROFILE=1)");
    }
}

pub fn set_enabled(enabled: bool) {
    PROFILING_ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn is_enabled() -> bool {
    PROFILING_ENABLED.load(Ordering::Relaxed)
}

/// Measures the time until it is dropped.
pub struct ProfileScope {
    name: &'static str,
    start: Instant,
}

impl ProfileScope {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        TOTAL_OPERATIONS.fetch_add(1, Ordering::Relaxed);
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        report(self.name, self.start.elapsed());
    }
}

/// Run `f` and return its result with the wall-clock duration.
pub fn profile<F, R>(name: &'static str, f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    TOTAL_OPERATIONS.fetch_add(1, Ordering::Relaxed);
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    report(name, duration);
    (result, duration)
}

fn report(name: &str, duration: Duration) {
    if is_enabled() {
        tracing::info!(
            scope = name,
            elapsed_ms = duration.as_secs_f64() * 1000.0,
            "profile"
        );
    } else {
        tracing::trace!(scope = name, elapsed_ms = duration.as_secs_f64() * 1000.0, "profile");
    }
}

pub fn total_operations() -> u64 {
    TOTAL_OPERATIONS.load(Ordering::Relaxed)
}

pub fn reset() {
    TOTAL_OPERATIONS.store(0, Ordering::Relaxed);
}
