//! pushing this instance's chain head to peers.
//!
//! a cross-sign publishes the current head hashes into a peer's chain. once
//! the peer has accepted it, rewriting local history would contradict a
//! record this instance does not control.

use std::sync::Arc;

use chrono::Utc;
use chronicle_chain::ChainHash;
use chronicle_db::{ChronicleDb, Database};
use chronicle_types::{ChainScope, CrossSignTarget, LastRun, TargetId, format_created};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{Error, PeerTransportBoxed, Result};

/// message published to a cross-sign target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossSignRequest {
    /// public key of the target the head is pushed to.
    pub target: String,
    /// when the push was made.
    #[serde(rename = "cross-sign-at")]
    pub cross_sign_at: String,
    /// hash of the pushed head.
    pub currhash: ChainHash,
    /// summary hash of the pushed head.
    pub summaryhash: ChainHash,
}

/// outcome of running every target.
#[derive(Debug, Default)]
pub struct CrossSignReport {
    /// targets that accepted a push.
    pub pushed: usize,
    /// targets that were not due, or had nothing to push.
    pub skipped: usize,
    /// targets whose push failed.
    pub failed: usize,
}

/// decides when to push to each target and records the outcome.
#[derive(Clone)]
pub struct CrossSignScheduler {
    db: ChronicleDb,
    peer: Arc<dyn PeerTransportBoxed>,
    busy: Arc<Mutex<()>>,
}

impl CrossSignScheduler {
    pub(crate) fn new(
        db: ChronicleDb,
        peer: Arc<dyn PeerTransportBoxed>,
        busy: Arc<Mutex<()>>,
    ) -> Self {
        Self { db, peer, busy }
    }

    async fn head_sequence(&self) -> Result<i64> {
        Ok(self
            .db
            .latest_entry(ChainScope::Primary)
            .await?
            .map(|head| head.sequence)
            .unwrap_or(0))
    }

    /// whether `target` is due against the current primary head.
    pub async fn needs_to_run(&self, target: &CrossSignTarget) -> Result<bool> {
        let head = self.head_sequence().await?;
        target
            .needs_to_run(head, Utc::now())
            .map_err(|e| Error::Configuration(format!("target {}: {}", target.name, e)))
    }

    /// push to one target if it is due. returns whether a push happened.
    pub async fn run(&self, id: TargetId) -> Result<bool> {
        let _busy = self.busy.lock().await;
        let target = self.load(id).await?;
        if !self.needs_to_run(&target).await? {
            debug!(target = %target.name, "cross-sign not due");
            return Ok(false);
        }
        self.push(&target).await
    }

    /// push to one target regardless of its policy.
    pub async fn force(&self, id: TargetId) -> Result<bool> {
        let _busy = self.busy.lock().await;
        let target = self.load(id).await?;
        self.push(&target).await
    }

    async fn load(&self, id: TargetId) -> Result<CrossSignTarget> {
        self.db
            .get_cross_sign_target(id)
            .await?
            .ok_or_else(|| Error::TargetNotFound(id.to_string()))
    }

    /// publish the current head to `target` and record the verified response.
    ///
    /// returns false without contacting the peer when the chain is empty.
    /// `last_run` is only written after the peer accepted the push.
    pub async fn push(&self, target: &CrossSignTarget) -> Result<bool> {
        let Some(head) = self.db.latest_entry(ChainScope::Primary).await? else {
            debug!(target = %target.name, "nothing to cross-sign yet");
            return Ok(false);
        };

        let now = Utc::now();
        let request = CrossSignRequest {
            target: target.public_key.clone(),
            cross_sign_at: format_created(now),
            currhash: head.curr_hash,
            summaryhash: head.summary_hash,
        };

        let response = self
            .peer
            .publish_cross_sign(target.clone(), request)
            .await?;

        self.db
            .set_cross_sign_last_run(
                target.id,
                &LastRun {
                    sequence: head.sequence,
                    time: now,
                    response,
                },
            )
            .await?;

        info!(
            target = %target.name,
            sequence = head.sequence,
            summaryhash = %head.summary_hash,
            "cross-signed chain head"
        );
        Ok(true)
    }

    /// push to every due target.
    ///
    /// returns `None` without doing anything when another run holds the
    /// scheduler. one target failing does not affect the others.
    pub async fn run_due(&self) -> Option<CrossSignReport> {
        let Ok(_busy) = self.busy.try_lock() else {
            debug!("cross-sign run already in progress");
            return None;
        };

        let mut report = CrossSignReport::default();
        let targets = match self.db.list_cross_sign_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(error = %e, "failed to list cross-sign targets");
                return Some(report);
            }
        };

        for target in targets {
            let outcome = match self.needs_to_run(&target).await {
                Ok(true) => self.push(&target).await,
                Ok(false) => Ok(false),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(true) => report.pushed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) if e.is_security_violation() => {
                    report.failed += 1;
                    error!(target = %target.name, error = %e, "cross-sign response rejected");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(target = %target.name, error = %e, "cross-sign failed");
                }
            }
        }

        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ledger, PeerTransport};
    use chronicle_chain::SigningKey;
    use chronicle_types::{CrossSignPolicy, ReplicationSource, WireEntry};

    /// peer that accepts every push and counts them
    #[derive(Default)]
    struct CountingPeer {
        pushed: Mutex<Vec<CrossSignRequest>>,
    }

    impl PeerTransport for CountingPeer {
        async fn fetch_chain(
            &self,
            _source: ReplicationSource,
            _since: Option<ChainHash>,
        ) -> Result<Vec<WireEntry>> {
            Ok(Vec::new())
        }

        async fn publish_cross_sign(
            &self,
            _target: CrossSignTarget,
            request: CrossSignRequest,
        ) -> Result<serde_json::Value> {
            self.pushed.lock().await.push(request);
            Ok(serde_json::json!({"status": "OK"}))
        }
    }

    async fn setup(
        policy: CrossSignPolicy,
    ) -> (CrossSignScheduler, Arc<CountingPeer>, ChronicleDb, TargetId) {
        let db = ChronicleDb::new_in_memory().await.unwrap();
        let peer = Arc::new(CountingPeer::default());
        let target = db
            .create_cross_sign_target(&CrossSignTarget::new(
                "peer".into(),
                "http://peer.invalid/chronicle".into(),
                SigningKey::generate().public_key().to_base64(),
                policy,
            ))
            .await
            .unwrap();
        let scheduler =
            CrossSignScheduler::new(db.clone(), peer.clone(), Arc::new(Mutex::new(())));
        (scheduler, peer, db, target.id)
    }

    #[tokio::test]
    async fn empty_chain_is_not_pushed() {
        let (scheduler, peer, db, id) = setup(CrossSignPolicy {
            push_after: Some(1),
            push_days: None,
        })
        .await;

        assert!(!scheduler.run(id).await.unwrap());
        assert!(peer.pushed.lock().await.is_empty());
        let target = db.get_cross_sign_target(id).await.unwrap().unwrap();
        assert!(target.last_run.is_none());
    }

    #[tokio::test]
    async fn push_records_head_and_response() {
        let (scheduler, peer, db, id) = setup(CrossSignPolicy {
            push_after: Some(5),
            push_days: None,
        })
        .await;
        let ledger = Ledger::new(db.clone(), Arc::new(Mutex::new(())));
        let entry = ledger
            .append_signed("hello", &SigningKey::generate())
            .await
            .unwrap();

        assert!(scheduler.run(id).await.unwrap());

        let pushed = peer.pushed.lock().await;
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].summaryhash, entry.summary_hash);
        assert_eq!(pushed[0].currhash, entry.curr_hash);

        let target = db.get_cross_sign_target(id).await.unwrap().unwrap();
        let last = target.last_run.unwrap();
        assert_eq!(last.sequence, entry.sequence);
        assert_eq!(last.response["status"], "OK");
    }

    #[tokio::test]
    async fn unknown_target_is_reported() {
        let (scheduler, _peer, _db, _id) = setup(CrossSignPolicy::default()).await;
        let err = scheduler.run(TargetId(999)).await.unwrap_err();
        assert!(matches!(err, Error::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn overlapping_run_due_is_skipped() {
        let (scheduler, _peer, _db, _id) = setup(CrossSignPolicy::default()).await;
        let _held = scheduler.busy.lock().await;
        assert!(scheduler.run_due().await.is_none());
    }

    #[tokio::test]
    async fn out_of_range_policy_fails_only_that_target() {
        let (scheduler, peer, db, id) = setup(CrossSignPolicy {
            push_after: None,
            push_days: Some(1_000_000_000),
        })
        .await;
        let ledger = Ledger::new(db.clone(), Arc::new(Mutex::new(())));
        let entry = ledger
            .append_signed("hello", &SigningKey::generate())
            .await
            .unwrap();
        db.set_cross_sign_last_run(
            id,
            &LastRun {
                sequence: entry.sequence,
                time: Utc::now(),
                response: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();

        let err = scheduler.run(id).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let report = scheduler.run_due().await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(peer.pushed.lock().await.is_empty());
    }
}
