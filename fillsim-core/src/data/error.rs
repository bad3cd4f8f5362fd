use std::path::PathBuf;
use thiserror::Error;

/// Structured errors for bar data ingestion and persistence.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    ParseField {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: cannot parse timestamp '{value}'")]
    ParseTimestamp { row: usize, value: String },

    #[error("row {row}: bar prices out of order (expected low <= open, last <= high)")]
    InsaneBar { row: usize },

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("unsupported bar file '{0}' (expected .txt, .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}
