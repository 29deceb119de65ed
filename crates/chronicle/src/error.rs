//! error taxonomy for ledger operations.

use thiserror::Error;

/// errors from appending, replicating, cross-signing and attesting.
#[derive(Debug, Error)]
pub enum Error {
    /// an append did not commit; nothing was written
    #[error("chain append failed: {0}")]
    ChainAppendFailure(String),

    /// a signature, hash or timestamp check failed
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// no replication source with that id
    #[error("replication source not found: {0}")]
    SourceNotFound(String),

    /// no cross-sign target with that id
    #[error("cross-sign target not found: {0}")]
    TargetNotFound(String),

    /// stored or supplied configuration is unusable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// a peer could not be reached or answered with an error
    #[error("peer request failed: {0}")]
    Transport(String),

    /// storage error outside of an append
    #[error(transparent)]
    Database(#[from] chronicle_db::Error),

    /// local key material could not be used
    #[error("key error: {0}")]
    Key(String),
}

impl Error {
    /// whether this error means a peer or client sent forged or tampered data.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Error::SecurityViolation(_))
    }

    /// whether retrying on the next cycle may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Database(_) | Error::ChainAppendFailure(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(Error::SecurityViolation("x".into()).is_security_violation());
        assert!(!Error::SecurityViolation("x".into()).is_transient());
        assert!(Error::Transport("timeout".into()).is_transient());
        assert!(!Error::Configuration("x".into()).is_transient());
    }
}
