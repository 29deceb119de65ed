//! chain entries, as stored and as exchanged between instances.

use chronicle_chain::{ChainHash, PublicKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceId;

/// which chain an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainScope {
    /// this instance's own chain.
    Primary,
    /// the local mirror of an upstream source's chain.
    Mirror(SourceId),
}

impl std::fmt::Display for ChainScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainScope::Primary => f.write_str("primary"),
            ChainScope::Mirror(source) => write!(f, "mirror:{}", source),
        }
    }
}

/// one persisted link of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEntry {
    /// storage-assigned position, strictly increasing.
    pub sequence: i64,

    /// the signed message body.
    pub payload: String,

    /// `curr_hash` of the preceding entry; `None` for genesis.
    pub prev_hash: Option<ChainHash>,

    /// hash of this entry's canonical bytes.
    pub curr_hash: ChainHash,

    /// serialized summary accumulator after this entry.
    pub hash_state: Vec<u8>,

    /// summary digest over the chain up to and including this entry.
    pub summary_hash: ChainHash,

    /// key the payload was signed with.
    pub public_key: PublicKey,

    /// base64url ed25519 signature over `payload`.
    pub signature: String,

    /// rfc3339 creation time, exactly as it was hashed.
    pub created: String,

    /// upstream source, for mirror rows.
    pub source: Option<SourceId>,

    /// when the row was mirrored locally, for mirror rows.
    pub replicated: Option<DateTime<Utc>>,
}

/// a fully linked entry ready to insert. there is no update path.
#[derive(Debug, Clone)]
pub struct NewChainEntry {
    pub payload: String,
    pub prev_hash: Option<ChainHash>,
    pub curr_hash: ChainHash,
    pub hash_state: Vec<u8>,
    pub summary_hash: ChainHash,
    pub public_key: PublicKey,
    pub signature: String,
    pub created: String,
    pub replicated: Option<DateTime<Utc>>,
}

/// entry as it appears in `/export`, `/since` and `/lookup` responses.
///
/// fields stay as strings so that one malformed entry from a peer is reported
/// against that entry instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub contents: String,
    #[serde(default)]
    pub prevhash: Option<String>,
    pub currhash: String,
    #[serde(alias = "summary")]
    pub summaryhash: String,
    pub created: String,
    pub publickey: String,
    pub signature: String,
}

impl WireEntry {
    /// `prevhash`, treating an empty string as genesis.
    pub fn prev_hash(&self) -> Option<&str> {
        self.prevhash.as_deref().filter(|h| !h.is_empty())
    }
}

impl From<&ChainEntry> for WireEntry {
    fn from(entry: &ChainEntry) -> Self {
        Self {
            contents: entry.payload.clone(),
            prevhash: entry.prev_hash.map(|h| h.to_base64()),
            currhash: entry.curr_hash.to_base64(),
            summaryhash: entry.summary_hash.to_base64(),
            created: entry.created.clone(),
            publickey: entry.public_key.to_base64(),
            signature: entry.signature.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_entry_accepts_summary_alias() {
        let json = serde_json::json!({
            "contents": "hello",
            "prevhash": "",
            "currhash": "abc",
            "summary": "def",
            "created": "2026-03-01T12:00:00+00:00",
            "publickey": "pk",
            "signature": "sig",
        });
        let entry: WireEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.summaryhash, "def");
        assert_eq!(entry.prev_hash(), None);
    }

    #[test]
    fn wire_entry_missing_prevhash_is_genesis() {
        let json = serde_json::json!({
            "contents": "hello",
            "currhash": "abc",
            "summaryhash": "def",
            "created": "2026-03-01T12:00:00+00:00",
            "publickey": "pk",
            "signature": "sig",
        });
        let entry: WireEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.prev_hash(), None);
    }

    #[test]
    fn scope_display() {
        assert_eq!(ChainScope::Primary.to_string(), "primary");
        assert_eq!(ChainScope::Mirror(SourceId(3)).to_string(), "mirror:3");
    }
}
