//! Frame assembly error types
//!
//! Defines every condition that aborts the assembly of a query result.

use thiserror::Error;

/// Message returned when derived grouping cannot pick a series layout
pub const AMBIGUOUS_SCHEMA_MESSAGE: &str = "Invalid SQL query. To plot time series data, the query must return: \
exactly one time column, one or more numeric columns, \
at least one character column (used as series labels)";

/// Errors that can occur while turning rows or payloads into frames
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A time token was neither a calendar timestamp nor epoch seconds
    #[error("Malformed timestamp '{token}': {reason}")]
    MalformedTimestamp { token: String, reason: String },

    /// A numeric column held text that does not parse as a float
    #[error("invalid numeric value '{value}' in column {column}: {reason}")]
    InvalidNumericValue {
        value: String,
        column: String,
        reason: String,
    },

    /// Derived grouping found an unusable mix of column kinds
    #[error("{}", AMBIGUOUS_SCHEMA_MESSAGE)]
    AmbiguousSchema,

    /// Range-vector payload did not match the expected document shape
    #[error("JSON decode error: {0}")]
    JsonDecode(String),

    /// The underlying cursor failed mid-iteration
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Failure reported by a row cursor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScanError {
    pub message: String,
}

impl ScanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        FrameError::JsonDecode(err.to_string())
    }
}

/// Result type alias for frame assembly
pub type FrameResult<T> = Result<T, FrameError>;
