//! the primary chain.
//!
//! an append reads the current head inside a transaction, links the new
//! entry with [`HashChain`], and commits. appends are serialized per process
//! by a writer lock. across processes, storage refuses a second successor of
//! any entry (unique `prevhash`) and a second genesis row; the losing append
//! fails with `ChainAppendFailure` and nothing is written.

use std::sync::Arc;

use chrono::Utc;
use chronicle_chain::{
    ChainHash, HashChain, PublicKey, SigningKey, canonical_entry, decode_signature, encoding,
};
use chronicle_db::{ChainAppend, ChronicleDb, Database};
use chronicle_types::{ChainEntry, ChainScope, NewChainEntry, format_created};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// what a publisher gets back for an appended entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendReceipt {
    /// hash of the new entry.
    pub currhash: ChainHash,
    /// summary of the chain including the new entry.
    pub summaryhash: ChainHash,
    /// creation time, as hashed.
    pub created: String,
}

impl From<&ChainEntry> for AppendReceipt {
    fn from(entry: &ChainEntry) -> Self {
        Self {
            currhash: entry.curr_hash,
            summaryhash: entry.summary_hash,
            created: entry.created.clone(),
        }
    }
}

/// append access to this instance's own chain.
#[derive(Clone)]
pub struct Ledger {
    db: ChronicleDb,
    writer: Arc<Mutex<()>>,
}

impl Ledger {
    pub(crate) fn new(db: ChronicleDb, writer: Arc<Mutex<()>>) -> Self {
        Self { db, writer }
    }

    /// append a signed message.
    ///
    /// `signature` is the base64url ed25519 signature of `payload` under
    /// `public_key`; it is checked before anything is written. either the
    /// entry is committed with correct linkage or nothing is written.
    pub async fn append(
        &self,
        payload: &str,
        signature: &str,
        public_key: &PublicKey,
    ) -> Result<ChainEntry> {
        let raw_signature = decode_signature(signature)
            .map_err(|_| Error::SecurityViolation("malformed payload signature".to_string()))?;
        public_key
            .verify(&raw_signature, payload.as_bytes())
            .map_err(|_| {
                Error::SecurityViolation("payload signature does not verify".to_string())
            })?;

        let _writer = self.writer.lock().await;

        let append = self
            .db
            .begin_append(ChainScope::Primary)
            .await
            .map_err(|e| Error::ChainAppendFailure(e.to_string()))?;

        let mut chain = match resume(&append) {
            Ok(chain) => chain,
            Err(e) => {
                abandon(append).await;
                return Err(e);
            }
        };

        // captured once, hashed and stored verbatim
        let created = format_created(Utc::now());
        let link = chain.append(&canonical_entry(
            &created,
            public_key,
            &raw_signature,
            payload.as_bytes(),
        ));

        let entry = append
            .commit(NewChainEntry {
                payload: payload.to_string(),
                prev_hash: link.prev_hash,
                curr_hash: link.curr_hash,
                hash_state: link.new_state,
                summary_hash: link.summary_hash,
                public_key: public_key.clone(),
                signature: encoding::encode(raw_signature),
                created,
                replicated: None,
            })
            .await
            .map_err(|e| Error::ChainAppendFailure(e.to_string()))?;

        info!(
            sequence = entry.sequence,
            currhash = %entry.curr_hash,
            summaryhash = %entry.summary_hash,
            "appended entry"
        );

        Ok(entry)
    }

    /// sign `payload` with `key` and append it.
    pub async fn append_signed(&self, payload: &str, key: &SigningKey) -> Result<ChainEntry> {
        let signature = key.sign_base64(payload.as_bytes());
        self.append(payload, &signature, &key.public_key()).await
    }

    /// the current head, if any.
    pub async fn head(&self) -> Result<Option<ChainEntry>> {
        Ok(self.db.latest_entry(ChainScope::Primary).await?)
    }
}

/// position a hash chain after the transaction's view of the head.
pub(crate) fn resume(append: &ChainAppend) -> Result<HashChain> {
    match append.last() {
        None => Ok(HashChain::new()),
        Some(last) => HashChain::resume(last.curr_hash, &last.hash_state).map_err(|e| {
            Error::ChainAppendFailure(format!(
                "stored state of entry {} in {} is unusable: {}",
                last.sequence,
                append.scope(),
                e
            ))
        }),
    }
}

/// roll back an append that will not be committed.
pub(crate) async fn abandon(append: ChainAppend) {
    let scope = append.scope();
    if let Err(e) = append.rollback().await {
        warn!(%scope, error = %e, "rollback failed");
    } else {
        debug!(%scope, "append rolled back");
    }
}
