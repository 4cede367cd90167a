use polars::prelude::*;

pub const TIMESTAMP: &str = "timestamp";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";

/// Column layout of one ticker partition file.
///
/// The symbol is not a column: it is carried by the `ticker=<SYMBOL>`
/// directory name.
pub struct PartitionSchema;

impl PartitionSchema {
    pub const COLUMNS: [&'static str; 6] = [TIMESTAMP, OPEN, HIGH, LOW, CLOSE, VOLUME];

    pub fn dtype(column: &str) -> Option<DataType> {
        match column {
            TIMESTAMP => Some(DataType::Datetime(TimeUnit::Milliseconds, None)),
            OPEN | HIGH | LOW | CLOSE => Some(DataType::Float64),
            VOLUME => Some(DataType::UInt64),
            _ => None,
        }
    }

    pub fn schema() -> Schema {
        Schema::from_iter(Self::COLUMNS.iter().filter_map(|name| {
            Self::dtype(name).map(|dtype| Field::new((*name).into(), dtype))
        }))
    }

    /// Validate a full partition frame.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        Self::validate_columns(df, &Self::COLUMNS)
    }

    /// Validate only the columns a projected read asked for.
    pub fn validate_columns(df: &DataFrame, columns: &[&str]) -> Result<(), SchemaError> {
        let actual = df.schema();
        for &name in columns {
            let expected = Self::dtype(name)
                .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))?;
            let actual_dtype = actual
                .get(name)
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
            if *actual_dtype != expected {
                return Err(SchemaError::TypeMismatch {
                    column: name.to_string(),
                    expected,
                    actual: actual_dtype.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("column {0} is not part of the partition layout")]
    UnknownColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
