//! periodic self-attestation of mirror heads.
//!
//! the attestor writes the head of every mirror into the primary chain, so
//! the replicated history of each upstream is anchored in this instance's
//! own chain and covered by its cross-signs.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chronicle_chain::SigningKey;
use chronicle_db::{ChronicleDb, Database};
use chronicle_types::{ChainEntry, ChainScope, format_created};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Ledger, Result, VERSION};

/// head of one mirror as attested.
#[derive(Debug, Serialize)]
struct ReplicaHead {
    source: String,
    currhash: Option<String>,
    summaryhash: Option<String>,
}

#[derive(Debug, Serialize)]
struct Statement {
    version: &'static str,
    datetime: String,
    #[serde(rename = "replication-hashes")]
    replication_hashes: Vec<ReplicaHead>,
}

/// signs and appends attestations of every mirror head.
#[derive(Clone)]
pub struct Attestor {
    db: ChronicleDb,
    ledger: Ledger,
    signing_key: Arc<SigningKey>,
    interval: Option<u64>,
}

impl Attestor {
    pub(crate) fn new(
        db: ChronicleDb,
        ledger: Ledger,
        signing_key: Arc<SigningKey>,
        interval: Option<u64>,
    ) -> Self {
        Self {
            db,
            ledger,
            signing_key,
            interval,
        }
    }

    /// whether an attestation is due at `now`.
    ///
    /// needs an interval, at least one replication source, and either no
    /// previous attestation or one older than the interval.
    pub async fn is_scheduled(&self, now: DateTime<Utc>) -> Result<bool> {
        let Some(interval) = self.interval else {
            return Ok(false);
        };
        if self.db.list_replication_sources().await?.is_empty() {
            return Ok(false);
        }
        let Some(last) = self.db.get_last_attestation().await? else {
            return Ok(true);
        };
        let next = i64::try_from(interval)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|step| last.checked_add_signed(step))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "scheduled attestation interval {} is out of range",
                    interval
                ))
            })?;
        Ok(now > next)
    }

    /// append an attestation now, regardless of the schedule.
    pub async fn run(&self) -> Result<ChainEntry> {
        let now = Utc::now();

        let mut replication_hashes = Vec::new();
        for source in self.db.list_replication_sources().await? {
            let head = self.db.latest_entry(ChainScope::Mirror(source.id)).await?;
            replication_hashes.push(ReplicaHead {
                source: source.unique_id,
                currhash: head.as_ref().map(|h| h.curr_hash.to_base64()),
                summaryhash: head.as_ref().map(|h| h.summary_hash.to_base64()),
            });
        }

        let statement = serde_json::to_string_pretty(&Statement {
            version: VERSION,
            datetime: format_created(now),
            replication_hashes,
        })
        .map_err(|e| Error::Configuration(format!("failed to encode attestation: {}", e)))?;

        let entry = self.ledger.append_signed(&statement, &self.signing_key).await?;
        self.db.set_last_attestation(now).await?;

        info!(
            sequence = entry.sequence,
            summaryhash = %entry.summary_hash,
            "attested replica heads"
        );
        Ok(entry)
    }

    /// append an attestation if one is due. returns the entry if it did.
    pub async fn run_if_scheduled(&self) -> Result<Option<ChainEntry>> {
        if !self.is_scheduled(Utc::now()).await? {
            debug!("attestation not scheduled");
            return Ok(None);
        }
        self.run().await.map(Some)
    }
}
