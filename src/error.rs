//! Error types for influx-connector.

use thiserror::Error;

/// Error type for influx-connector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A data point (or write target) failed validation before any I/O.
    #[error("Invalid data point: {0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code returned by the server.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("Transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body declared as JSON could not be parsed.
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// A query result did not have the expected shape.
    #[error("Failed to parse query result: {message}")]
    Parse {
        /// Description of what failed to parse.
        message: String,
    },

    /// Query returned an error from InfluxDB.
    #[error("Query error from InfluxDB: {message}")]
    QueryError {
        /// Error message returned by InfluxDB.
        message: String,
    },

    /// The configured endpoint does not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration value is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Status code of an [`Error::Http`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for influx-connector operations.
pub type Result<T> = std::result::Result<T, Error>;
