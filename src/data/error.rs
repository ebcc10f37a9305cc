//! Errors raised while parsing or querying data.

use thiserror::Error;

/// Errors that can occur while building datasets and constants.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Dataset '{0}' is empty")]
    EmptyInput(String),

    #[error("Parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("Dimension {dim} out of range ({dims} dimensions)")]
    DimensionOutOfRange { dim: usize, dims: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DataResult<T> = std::result::Result<T, DataError>;
