use std::io;
use thiserror::Error;

// Custom error types
#[derive(Debug, Error)]
pub enum FreqError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The schema, a locus combination, or the population list is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source value or key violates the declared schema.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("No frequency files found in {0}")]
    NoFrequencyFiles(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, FreqError>;
