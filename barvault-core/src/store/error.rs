use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by either storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage not found at {}", path.display())]
    StorageMissing { path: PathBuf },

    #[error("unknown ticker '{symbol}'")]
    UnknownTicker { symbol: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("input refused before load: {0}")]
    UnsupportedInput(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for the "requested thing does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::StorageMissing { .. } | StoreError::UnknownTicker { .. }
        )
    }
}
