//! Error types.
//!
//! The library reports typed errors (`MetricsError`, `DataFormatError`); the
//! binary converts them into an `AppError` carrying a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// The source file does not match the expected schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataFormatError {
    #[error("missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("line {line}: column `{column}` has non-numeric value '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: column `{column}` has negative or non-finite value '{value}'")]
    OutOfRange {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: unknown SABCT classification '{value}'")]
    InvalidClassification { line: usize, value: String },

    #[error("line {line}: column `{column}` is empty")]
    EmptyValue { line: usize, column: String },

    #[error("line {line}: malformed CSV row: {message}")]
    Malformed { line: usize, message: String },
}

/// Errors raised by the metrics engine.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data in '{}': {source}", path.display())]
    DataFormat {
        path: PathBuf,
        #[source]
        source: DataFormatError,
    },

    #[error("invalid period split {split}: must be between 0 and 12")]
    InvalidSplit { split: usize },

    #[error("invalid aggregation: {0}")]
    InvalidAggregation(String),

    #[error("{what} is undefined: denominator is zero")]
    DivisionUndefined { what: &'static str },

    #[error("configuration error: {0}")]
    Config(String),
}

impl MetricsError {
    pub fn data_format(path: impl Into<PathBuf>, source: DataFormatError) -> Self {
        MetricsError::DataFormat {
            path: path.into(),
            source,
        }
    }

    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            MetricsError::Io { .. }
            | MetricsError::DataFormat { .. }
            | MetricsError::InvalidSplit { .. }
            | MetricsError::Config(_) => 2,
            MetricsError::InvalidAggregation(_) | MetricsError::DivisionUndefined { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<MetricsError> for AppError {
    fn from(err: MetricsError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
