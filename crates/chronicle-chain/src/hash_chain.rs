//! incremental hash chain with a running summary digest.
//!
//! every entry gets two hashes:
//! - `curr_hash`: BLAKE2b-256 of the entry's canonical bytes alone
//! - `summary_hash`: a digest over every entry absorbed so far, in order
//!
//! linkage comes from storing `prev_hash` (the previous entry's `curr_hash`)
//! next to each row. the summary is what makes history rewrites detectable:
//! it can only be reproduced by resuming the previous entry's saved state and
//! absorbing the same bytes.
//!
//! # summary state format (v1)
//!
//! ```text
//! version (1 byte, 0x01) || absorbed count (u64 be) || chaining value (64 bytes)
//! ```
//!
//! - init:   `cv = BLAKE2b-512("chronicle.summary.init.v1")`
//! - absorb: `cv = BLAKE2b-512("chronicle.summary.absorb.v1" || cv || u64be(len) || data)`
//! - final:  `BLAKE2b-256("chronicle.summary.final.v1" || u64be(count) || cv)`
//!
//! finalizing never consumes the state, so the summary can be read after each
//! append and the state persisted alongside it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512, Digest};

use crate::{ChainHash, Error, PublicKey, SIGNATURE_LEN};

type Blake2b256 = Blake2b<U32>;

/// current summary state format version.
pub const STATE_VERSION: u8 = 1;

const CHAINING_LEN: usize = 64;

/// length of a serialized summary state.
pub const STATE_LEN: usize = 1 + 8 + CHAINING_LEN;

const INIT_DOMAIN: &[u8] = b"chronicle.summary.init.v1";
const ABSORB_DOMAIN: &[u8] = b"chronicle.summary.absorb.v1";
const FINAL_DOMAIN: &[u8] = b"chronicle.summary.final.v1";

/// canonical bytes hashed for a chain entry.
///
/// `created || public_key (32 raw bytes) || signature (64 raw bytes) || payload`.
/// `created` must be the exact string that gets stored with the row.
pub fn canonical_entry(
    created: &str,
    public_key: &PublicKey,
    signature: &[u8; SIGNATURE_LEN],
    payload: &[u8],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(created.len() + 32 + SIGNATURE_LEN + payload.len());
    data.extend_from_slice(created.as_bytes());
    data.extend_from_slice(public_key.as_bytes());
    data.extend_from_slice(signature);
    data.extend_from_slice(payload);
    data
}

/// running summary accumulator.
#[derive(Clone, PartialEq, Eq)]
pub struct SummaryState {
    absorbed: u64,
    chaining: [u8; CHAINING_LEN],
}

impl SummaryState {
    /// fresh accumulator with nothing absorbed.
    pub fn new() -> Self {
        let mut chaining = [0u8; CHAINING_LEN];
        chaining.copy_from_slice(&Blake2b512::digest(INIT_DOMAIN));
        Self {
            absorbed: 0,
            chaining,
        }
    }

    /// number of entries absorbed so far.
    pub fn absorbed(&self) -> u64 {
        self.absorbed
    }

    /// absorb one entry's canonical bytes.
    pub fn absorb(&mut self, data: &[u8]) {
        let digest = Blake2b512::new()
            .chain_update(ABSORB_DOMAIN)
            .chain_update(self.chaining)
            .chain_update((data.len() as u64).to_be_bytes())
            .chain_update(data)
            .finalize();
        self.chaining.copy_from_slice(&digest);
        self.absorbed += 1;
    }

    /// finalized summary digest of everything absorbed so far.
    pub fn summary(&self) -> ChainHash {
        let digest = Blake2b256::new()
            .chain_update(FINAL_DOMAIN)
            .chain_update(self.absorbed.to_be_bytes())
            .chain_update(self.chaining)
            .finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        ChainHash::from(out)
    }

    /// serialize for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STATE_LEN);
        out.push(STATE_VERSION);
        out.extend_from_slice(&self.absorbed.to_be_bytes());
        out.extend_from_slice(&self.chaining);
        out
    }

    /// restore a state previously produced by [`SummaryState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != STATE_LEN {
            return Err(Error::InvalidState(format!(
                "expected {} bytes, got {}",
                STATE_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != STATE_VERSION {
            return Err(Error::InvalidState(format!(
                "unsupported state version {}",
                bytes[0]
            )));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&bytes[1..9]);
        let mut chaining = [0u8; CHAINING_LEN];
        chaining.copy_from_slice(&bytes[9..]);
        Ok(Self {
            absorbed: u64::from_be_bytes(count),
            chaining,
        })
    }
}

impl Default for SummaryState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SummaryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryState")
            .field("absorbed", &self.absorbed)
            .finish_non_exhaustive()
    }
}

/// linkage computed for one appended entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkResult {
    /// `curr_hash` of the previous entry, `None` for genesis
    pub prev_hash: Option<ChainHash>,
    /// hash of this entry's data
    pub curr_hash: ChainHash,
    /// summary over the whole chain including this entry
    pub summary_hash: ChainHash,
    /// serialized accumulator to persist with this entry
    pub new_state: Vec<u8>,
}

/// hash chain cursor positioned after the last persisted entry.
#[derive(Clone, Debug, Default)]
pub struct HashChain {
    last_hash: Option<ChainHash>,
    state: SummaryState,
}

impl HashChain {
    /// empty chain; the next append is genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// resume after an entry with `prev_curr_hash` and its saved state.
    pub fn resume(prev_curr_hash: ChainHash, saved_state: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            last_hash: Some(prev_curr_hash),
            state: SummaryState::from_bytes(saved_state)?,
        })
    }

    /// link the next entry.
    pub fn append(&mut self, data: &[u8]) -> LinkResult {
        let mut curr = [0u8; 32];
        curr.copy_from_slice(&Blake2b256::digest(data));
        let curr_hash = ChainHash::from(curr);

        self.state.absorb(data);
        let prev_hash = self.last_hash.replace(curr_hash);

        LinkResult {
            prev_hash,
            curr_hash,
            summary_hash: self.state.summary(),
            new_state: self.state.to_bytes(),
        }
    }

    /// `curr_hash` of the last appended entry.
    pub fn last_hash(&self) -> Option<ChainHash> {
        self.last_hash
    }

    /// current summary, or `None` for an empty chain.
    pub fn summary_hash(&self) -> Option<ChainHash> {
        self.last_hash.map(|_| self.state.summary())
    }

    /// number of entries absorbed.
    pub fn len(&self) -> u64 {
        self.state.absorbed()
    }

    /// whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.state.absorbed() == 0
    }
}
