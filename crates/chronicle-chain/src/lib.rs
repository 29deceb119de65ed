//! hash chain primitives for chronicle.
//!
//! this crate provides the pieces every chronicle instance has to agree on
//! byte-for-byte:
//! - the incremental hash chain and its running summary digest
//! - the canonical encoding of a chain entry
//! - ed25519 signing keys and the signed-body envelope used over http

pub mod encoding;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod hash_chain;
pub mod key;

pub use envelope::{BODY_SIGNATURE_HEADER, CLIENT_ID_HEADER};
pub use error::Error;
pub use hash::{CHAIN_HASH_LEN, ChainHash};
pub use hash_chain::{HashChain, LinkResult, SummaryState, canonical_entry};
pub use key::{PublicKey, SIGNATURE_LEN, SigningKey, decode_signature};

/// result type for chain operations.
pub type Result<T> = std::result::Result<T, Error>;
