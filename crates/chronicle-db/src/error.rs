//! error types for database operations.

use thiserror::Error;

/// errors that can occur in the database layer.
#[derive(Debug, Error)]
pub enum Error {
    /// could not connect or talk to the database
    #[error("database connection error: {0}")]
    Connection(String),

    /// migrations failed
    #[error("migration error: {0}")]
    Migration(String),

    /// query failed
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// a stored value could not be decoded, or an argument is unusable
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// json column could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<chronicle_chain::Error> for Error {
    fn from(e: chronicle_chain::Error) -> Self {
        Self::InvalidData(e.to_string())
    }
}
