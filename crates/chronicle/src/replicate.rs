//! pulling upstream chains into local mirrors.
//!
//! every mirrored entry is checked before it is stored: the ed25519
//! signature over its contents, and the summary hash recomputed from the
//! local mirror's saved state. a mismatch means the upstream rewrote history
//! or the entry was tampered with in transit; the entry is rejected and the
//! rest of that pull is abandoned.

use std::sync::Arc;

use chrono::{Duration, Utc};
use chronicle_chain::{ChainHash, PublicKey, canonical_entry, decode_signature};
use chronicle_db::{ChronicleDb, Database};
use chronicle_types::{
    ChainEntry, ChainScope, NewChainEntry, ReplicationConfig, ReplicationSource, SourceId,
    WireEntry, parse_created,
};
use tracing::{debug, error, info, warn};

use crate::ledger::{abandon, resume};
use crate::{ChainLocks, Error, PeerTransportBoxed, Result};

/// outcome of pulling every source.
#[derive(Debug, Default)]
pub struct PullReport {
    /// entries appended across all mirrors.
    pub appended: usize,
    /// sources whose pull failed.
    pub failed: usize,
}

/// replication of upstream chains.
#[derive(Clone)]
pub struct ReplicaSync {
    db: ChronicleDb,
    peer: Arc<dyn PeerTransportBoxed>,
    locks: Arc<ChainLocks>,
    policy: ReplicationConfig,
}

fn violation(source: &ReplicationSource, what: impl std::fmt::Display) -> Error {
    Error::SecurityViolation(format!("source {}: {}", source.unique_id, what))
}

impl ReplicaSync {
    pub(crate) fn new(
        db: ChronicleDb,
        peer: Arc<dyn PeerTransportBoxed>,
        locks: Arc<ChainLocks>,
        policy: ReplicationConfig,
    ) -> Self {
        Self {
            db,
            peer,
            locks,
            policy,
        }
    }

    /// pull every configured source. a failing source does not stop the others.
    pub async fn pull_all(&self) -> PullReport {
        let mut report = PullReport::default();

        let sources = match self.db.list_replication_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "failed to list replication sources");
                return report;
            }
        };

        for source in sources {
            match self.pull(&source).await {
                Ok(appended) => report.appended += appended,
                Err(e) if e.is_security_violation() => {
                    report.failed += 1;
                    error!(
                        source = %source.unique_id,
                        error = %e,
                        "replication rejected upstream data"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(source = %source.unique_id, error = %e, "replication failed");
                }
            }
        }

        report
    }

    /// pull one source by id.
    pub async fn pull_by_id(&self, id: SourceId) -> Result<usize> {
        let source = self
            .db
            .get_replication_source(id)
            .await?
            .ok_or_else(|| Error::SourceNotFound(id.to_string()))?;
        self.pull(&source).await
    }

    /// fetch entries newer than the local mirror head and append them in
    /// order. stops at the first rejected entry; entries before it stay
    /// committed. returns the number appended.
    pub async fn pull(&self, source: &ReplicationSource) -> Result<usize> {
        let since = self
            .db
            .latest_entry(ChainScope::Mirror(source.id))
            .await?
            .map(|head| head.summary_hash);

        let entries = self.peer.fetch_chain(source.clone(), since).await?;
        debug!(
            source = %source.unique_id,
            fetched = entries.len(),
            since = ?since,
            "fetched upstream entries"
        );

        let mut appended = 0;
        for entry in &entries {
            if let Err(e) = self.append_to_mirror(source, entry).await {
                if appended > 0 {
                    info!(
                        source = %source.unique_id,
                        appended,
                        "partially replicated before failure"
                    );
                }
                return Err(e);
            }
            appended += 1;
        }

        if appended > 0 {
            info!(source = %source.unique_id, appended, "replicated upstream entries");
        }
        Ok(appended)
    }

    /// verify one upstream entry against the local mirror head and append it.
    pub async fn append_to_mirror(
        &self,
        source: &ReplicationSource,
        entry: &WireEntry,
    ) -> Result<ChainEntry> {
        let public_key =
            PublicKey::from_base64(&entry.publickey).map_err(|e| violation(source, e))?;
        let signature =
            decode_signature(&entry.signature).map_err(|e| violation(source, e))?;
        public_key
            .verify(&signature, entry.contents.as_bytes())
            .map_err(|_| {
                violation(
                    source,
                    format!("signature of entry {} does not verify", entry.currhash),
                )
            })?;

        let created = parse_created(&entry.created).map_err(|e| violation(source, e))?;
        if let Some(max_skew) = self.policy.max_future_skew_secs
            && created > Utc::now() + Duration::seconds(max_skew as i64)
        {
            return Err(violation(
                source,
                format!("entry {} is dated in the future ({})", entry.currhash, entry.created),
            ));
        }

        let claimed_curr =
            ChainHash::from_base64(&entry.currhash).map_err(|e| violation(source, e))?;
        let claimed_summary =
            ChainHash::from_base64(&entry.summaryhash).map_err(|e| violation(source, e))?;
        let claimed_prev = entry
            .prev_hash()
            .map(ChainHash::from_base64)
            .transpose()
            .map_err(|e| violation(source, e))?;

        let lock = self.locks.mirror(source.id).await;
        let _writer = lock.lock().await;

        let append = self
            .db
            .begin_append(ChainScope::Mirror(source.id))
            .await
            .map_err(|e| Error::ChainAppendFailure(e.to_string()))?;

        let mut chain = match resume(&append) {
            Ok(chain) => chain,
            Err(e) => {
                abandon(append).await;
                return Err(e);
            }
        };

        let link = chain.append(&canonical_entry(
            &entry.created,
            &public_key,
            &signature,
            entry.contents.as_bytes(),
        ));

        if let Some(claimed_prev) = claimed_prev
            && link.prev_hash.is_none_or(|prev| !prev.ct_eq(&claimed_prev))
        {
            abandon(append).await;
            return Err(violation(
                source,
                format!("entry {} does not extend the mirrored head", entry.currhash),
            ));
        }

        if !link.summary_hash.ct_eq(&claimed_summary) || !link.curr_hash.ct_eq(&claimed_curr) {
            abandon(append).await;
            return Err(violation(
                source,
                format!("hash mismatch at entry {}", entry.currhash),
            ));
        }

        append
            .commit(NewChainEntry {
                payload: entry.contents.clone(),
                prev_hash: link.prev_hash,
                curr_hash: link.curr_hash,
                hash_state: link.new_state,
                summary_hash: link.summary_hash,
                public_key,
                signature: entry.signature.clone(),
                created: entry.created.clone(),
                replicated: Some(Utc::now()),
            })
            .await
            .map_err(|e| Error::ChainAppendFailure(e.to_string()))
    }
}
