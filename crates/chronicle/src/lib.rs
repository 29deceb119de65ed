//! chronicle - an append-only, verifiable ledger server.
//!
//! clients publish signed messages which are linked into a hash chain. other
//! instances mirror that chain (replication) or commit its head into their
//! own chain (cross-signing), so history rewrites become externally visible.

pub mod attest;
pub mod cli;
pub mod cross_sign;
mod error;
pub mod handlers;
pub mod ledger;
pub mod peer;
pub mod replicate;
pub mod scheduled;

pub use attest::Attestor;
pub use cross_sign::{CrossSignReport, CrossSignRequest, CrossSignScheduler};
pub use error::Error;
pub use ledger::{AppendReceipt, Ledger};
pub use peer::{HttpPeer, PeerTransport, PeerTransportBoxed};
pub use replicate::{PullReport, ReplicaSync};
pub use scheduled::{CycleReport, ScheduledTasks};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use chronicle_chain::SigningKey;
use chronicle_db::ChronicleDb;
use chronicle_types::{Config, SourceId};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// protocol version reported in every response envelope.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// per-chain writer locks shared by every clone of a context.
#[derive(Default)]
pub(crate) struct ChainLocks {
    primary: Arc<Mutex<()>>,
    mirrors: Mutex<HashMap<SourceId, Arc<Mutex<()>>>>,
    cross_sign: Arc<Mutex<()>>,
}

impl ChainLocks {
    /// lock for the mirror of `source`, created on first use.
    pub(crate) async fn mirror(&self, source: SourceId) -> Arc<Mutex<()>> {
        self.mirrors
            .lock()
            .await
            .entry(source)
            .or_default()
            .clone()
    }
}

/// everything a ledger operation needs, passed explicitly.
///
/// this is also the axum state. cloning is cheap; locks and the peer
/// transport are shared between clones.
#[derive(Clone)]
pub struct LedgerContext {
    /// persistent storage.
    pub db: ChronicleDb,
    /// server configuration.
    pub config: Config,
    /// key responses, attestations and cross-sign requests are signed with.
    pub signing_key: Arc<SigningKey>,
    /// outbound calls to other instances.
    pub peer: Arc<dyn PeerTransportBoxed>,
    locks: Arc<ChainLocks>,
}

impl LedgerContext {
    /// create a context talking to peers over http.
    pub fn new(db: ChronicleDb, config: Config, signing_key: SigningKey) -> Result<Self> {
        let signing_key = Arc::new(signing_key);
        let peer = HttpPeer::new(signing_key.clone(), &config.peer)?;
        Ok(Self {
            db,
            config,
            signing_key,
            peer: Arc::new(peer),
            locks: Arc::new(ChainLocks::default()),
        })
    }

    /// replace the peer transport.
    pub fn with_peer(mut self, peer: Arc<dyn PeerTransportBoxed>) -> Self {
        self.peer = peer;
        self
    }

    /// the primary chain.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.db.clone(), self.locks.primary.clone())
    }

    /// mirrors of upstream sources.
    pub fn replica_sync(&self) -> ReplicaSync {
        ReplicaSync::new(
            self.db.clone(),
            self.peer.clone(),
            self.locks.clone(),
            self.config.replication.clone(),
        )
    }

    /// pushes to cross-sign targets.
    pub fn cross_signer(&self) -> CrossSignScheduler {
        CrossSignScheduler::new(
            self.db.clone(),
            self.peer.clone(),
            self.locks.cross_sign.clone(),
        )
    }

    /// self-attestation of replica heads.
    pub fn attestor(&self) -> Attestor {
        Attestor::new(
            self.db.clone(),
            self.ledger(),
            self.signing_key.clone(),
            self.config.scheduled_attestation_secs,
        )
    }

    /// the full scheduled cycle.
    pub fn scheduled_tasks(&self) -> ScheduledTasks {
        ScheduledTasks::new(self.clone())
    }
}

/// load the server signing key from file, or generate and save a new one.
///
/// the file holds base64url of `seed || public key`.
pub async fn load_or_generate_signing_key(path: &Path) -> std::io::Result<SigningKey> {
    if path.exists() {
        let data = fs::read_to_string(path).await?;
        SigningKey::from_base64(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    } else {
        let key = SigningKey::generate();

        // create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path).await?;
        file.write_all(key.to_base64().as_bytes()).await?;
        file.sync_all().await?;

        Ok(key)
    }
}

/// create the axum application with all routes.
///
/// every response body is signed with the context's signing key.
pub fn create_app(ctx: LedgerContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chronicle", get(handlers::index))
        .route("/chronicle/lasthash", get(handlers::last_hash))
        .route("/chronicle/lookup/{hash}", get(handlers::lookup))
        .route("/chronicle/since/{hash}", get(handlers::since))
        .route("/chronicle/export", get(handlers::export))
        .route("/chronicle/publish", post(handlers::publish))
        .route("/chronicle/register", post(handlers::register))
        .route("/chronicle/revoke", post(handlers::revoke))
        .route("/chronicle/replica", get(handlers::replica_index))
        .route(
            "/chronicle/replica/{source}/lasthash",
            get(handlers::replica_last_hash),
        )
        .route(
            "/chronicle/replica/{source}/lookup/{hash}",
            get(handlers::replica_lookup),
        )
        .route(
            "/chronicle/replica/{source}/since/{hash}",
            get(handlers::replica_since),
        )
        .route(
            "/chronicle/replica/{source}/export",
            get(handlers::replica_export),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            handlers::sign_response,
        ))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signing_key_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("signing-secret.key");

        let generated = load_or_generate_signing_key(&path).await.unwrap();
        assert!(path.exists());

        let loaded = load_or_generate_signing_key(&path).await.unwrap();
        assert_eq!(generated.public_key(), loaded.public_key());
    }

    #[tokio::test]
    async fn corrupt_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing-secret.key");
        std::fs::write(&path, "not a key").unwrap();

        let err = load_or_generate_signing_key(&path).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn mirror_locks_are_shared_per_source() {
        let locks = ChainLocks::default();
        let a = locks.mirror(SourceId(1)).await;
        let b = locks.mirror(SourceId(1)).await;
        let c = locks.mirror(SourceId(2)).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
