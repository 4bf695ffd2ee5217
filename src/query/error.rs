//! Query error types
//!
//! Defines the error conditions raised while decoding a request and
//! translating it into executable query text.

use thiserror::Error;

/// Errors that can occur during query decoding and translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A SQL macro is unterminated or has unusable arguments
    #[error("Malformed query macro: {0}")]
    MalformedQueryMacro(String),

    /// A required request field is absent or empty
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Step text is not a positive integer number of seconds
    #[error("Invalid step '{0}': expected a positive number of seconds")]
    InvalidStep(String),

    /// Invalid time range specified
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Variable query text is not `<metric>&start=<secs>&end=<secs>`
    #[error("Invalid variable query: {0}")]
    InvalidVariableQuery(String),

    /// Request payload is not a JSON object of the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Decode(e.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
