use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the data pipeline.
///
/// Only load-time failures halt the dashboard. Degenerate correlation and
/// under-sized modeling input normally degrade to NaN cells or a warning
/// outcome; `InsufficientData` is returned as an error only when the
/// configured policy asks for it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset archive not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(e: zip::result::ZipError) -> Self {
        PipelineError::Archive(e.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
