//! database entity models for sea-orm.
//!
//! these entities map to database tables and handle serialization
//! of hashes, keys and json policy columns to/from text columns.

pub mod chain;
pub mod client;
pub mod replication_chain;
pub mod replication_source;
pub mod schedule_state;
pub mod xsign_target;

use chronicle_chain::{ChainHash, PublicKey, encoding};

use crate::Error;

pub(crate) fn parse_hash(column: &str, value: &str) -> Result<ChainHash, Error> {
    ChainHash::from_base64(value)
        .map_err(|e| Error::InvalidData(format!("{}: {}", column, e)))
}

pub(crate) fn parse_prev_hash(value: Option<&str>) -> Result<Option<ChainHash>, Error> {
    match value {
        None | Some("") => Ok(None),
        Some(value) => parse_hash("prevhash", value).map(Some),
    }
}

pub(crate) fn parse_state(value: &str) -> Result<Vec<u8>, Error> {
    encoding::decode(value).map_err(|e| Error::InvalidData(format!("hashstate: {}", e)))
}

pub(crate) fn parse_public_key(value: &str) -> Result<PublicKey, Error> {
    PublicKey::from_base64(value).map_err(|e| Error::InvalidData(format!("publickey: {}", e)))
}
