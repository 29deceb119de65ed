//! error types for chain operations.

use thiserror::Error;

/// errors that can occur while hashing, encoding or verifying chain data.
#[derive(Debug, Error)]
pub enum Error {
    /// invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// bytes are not a valid ed25519 point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    /// invalid base64url encoding
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// a serialized summary state could not be restored
    #[error("invalid summary state: {0}")]
    InvalidState(String),

    /// signature verification failed
    #[error("signature verification failed")]
    InvalidSignature,
}
