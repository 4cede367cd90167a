//! Benchmark configuration (TOML).
//!
//! ```toml
//! relational_path = "market_data.db"
//! columnar_root = "market_data"
//! ticker = "TSLA"
//! start = "2025-11-17"
//! end = "2025-11-18"
//! top_n = 3
//! reload = "skip_existing"
//! ```

use crate::benchmark::BenchmarkQuery;
use barvault_core::domain::TimeRange;
use barvault_core::query::{QueryEngine, DEFAULT_TOP_N};
use barvault_core::store::{open_engine, BackendKind, ReloadPolicy, StoreError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("start {start} is after end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },
}

/// Where the two stores live and what the benchmark asks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub relational_path: PathBuf,
    pub columnar_root: PathBuf,
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub top_n: usize,
    pub reload: ReloadPolicy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            relational_path: PathBuf::from("market_data.db"),
            columnar_root: PathBuf::from("market_data"),
            ticker: "TSLA".to_string(),
            start: NaiveDate::from_ymd_opt(2025, 11, 17).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 11, 18).unwrap_or_default(),
            top_n: DEFAULT_TOP_N,
            reload: ReloadPolicy::default(),
        }
    }
}

impl BenchConfig {
    /// Parse from TOML. Missing keys take their default values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Midnight of `start` to midnight of `end`, inclusive.
    pub fn window(&self) -> TimeRange {
        TimeRange::days(self.start, self.end)
    }

    pub fn query(&self) -> BenchmarkQuery {
        BenchmarkQuery {
            ticker: self.ticker.clone(),
            window: self.window(),
        }
    }

    /// Open both existing stores as `(relational, columnar)`.
    pub fn open_engines(&self) -> Result<(Box<dyn QueryEngine>, Box<dyn QueryEngine>), StoreError> {
        Ok((
            open_engine(BackendKind::Relational, &self.relational_path)?,
            open_engine(BackendKind::Columnar, &self.columnar_root)?,
        ))
    }

    /// Content hash of the configuration, stable across runs.
    pub fn config_id(&self) -> Result<String, ConfigError> {
        let text = self.to_toml()?;
        Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
    }
}
