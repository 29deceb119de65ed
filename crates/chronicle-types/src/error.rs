//! error types for chronicle-types

use thiserror::Error;

/// errors that can occur in chronicle-types
#[derive(Debug, Error)]
pub enum Error {
    /// a stored or received value is malformed
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// invalid timestamp
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
