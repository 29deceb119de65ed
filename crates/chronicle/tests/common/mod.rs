//! shared helpers for chronicle integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    response::Response,
};
use chronicle::{CrossSignRequest, LedgerContext, PeerTransport};
use chronicle_chain::envelope::{sign_body, verify_body};
use chronicle_chain::{BODY_SIGNATURE_HEADER, CLIENT_ID_HEADER, ChainHash, PublicKey, SigningKey};
use chronicle_db::{ChronicleDb, Database};
use chronicle_types::{Client, Config, CrossSignTarget, ReplicationSource, WireEntry};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// a context over a fresh in-memory database
pub async fn context() -> LedgerContext {
    context_with(Config::default()).await
}

/// a context over a fresh in-memory database with `config`
pub async fn context_with(config: Config) -> LedgerContext {
    let db = ChronicleDb::new_in_memory()
        .await
        .expect("failed to create in-memory database");
    LedgerContext::new(db, config, SigningKey::generate()).expect("failed to build context")
}

/// a copy of a signing key
pub fn copy_key(key: &SigningKey) -> SigningKey {
    SigningKey::from_seed(key.to_seed())
}

/// register a client with a fresh key
pub async fn register_client(db: &ChronicleDb, is_admin: bool) -> (Client, SigningKey) {
    let key = SigningKey::generate();
    let public_id = format!("client-{}", &key.public_key().to_base64()[..8]);
    let client = db
        .create_client(&Client::new(
            public_id,
            key.public_key().to_base64(),
            is_admin,
            "test client".to_string(),
        ))
        .await
        .expect("failed to create client");
    (client, key)
}

/// a POST request signed by a registered client
pub fn signed_request(uri: &str, client_id: &str, key: &SigningKey, body: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(CLIENT_ID_HEADER, client_id)
        .header(BODY_SIGNATURE_HEADER, sign_body(key, body))
        .body(Body::from(body.to_vec()))
        .expect("failed to build request")
}

/// a plain GET request
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

/// read a response body as json, checking its signature under `server_key`
pub async fn signed_json(response: Response, server_key: &PublicKey) -> serde_json::Value {
    let headers: HeaderMap = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let signature = headers
        .get(BODY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    verify_body(server_key, &body, signature).expect("response body signature should verify");
    serde_json::from_slice(&body).expect("response should be json")
}

/// serve `ctx` on an ephemeral local port; returns the api base url
pub async fn spawn_server(ctx: LedgerContext) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");
    let app = chronicle::create_app(ctx);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}/chronicle", addr)
}

/// entries of a chain as an upstream would serve them
pub async fn export(db: &ChronicleDb) -> Vec<WireEntry> {
    db.list_entries(chronicle_types::ChainScope::Primary)
        .await
        .expect("failed to list entries")
        .iter()
        .map(WireEntry::from)
        .collect()
}

/// in-process peer serving a fixed upstream chain and recording pushes
#[derive(Default)]
pub struct FakePeer {
    pub upstream: Mutex<Vec<WireEntry>>,
    pub fetches: Mutex<Vec<Option<ChainHash>>>,
    pub pushes: Mutex<Vec<CrossSignRequest>>,
    pub fail_pushes: bool,
}

impl FakePeer {
    pub fn serving(entries: Vec<WireEntry>) -> Arc<Self> {
        Arc::new(Self {
            upstream: Mutex::new(entries),
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_pushes: true,
            ..Default::default()
        })
    }
}

impl PeerTransport for FakePeer {
    async fn fetch_chain(
        &self,
        _source: ReplicationSource,
        since: Option<ChainHash>,
    ) -> chronicle::Result<Vec<WireEntry>> {
        self.fetches.lock().await.push(since);
        let upstream = self.upstream.lock().await.clone();
        let Some(since) = since else {
            return Ok(upstream);
        };
        let since = since.to_base64();
        let start = upstream
            .iter()
            .position(|e| e.summaryhash == since || e.currhash == since)
            .map(|i| i + 1)
            .unwrap_or(upstream.len());
        Ok(upstream[start..].to_vec())
    }

    async fn publish_cross_sign(
        &self,
        target: CrossSignTarget,
        request: CrossSignRequest,
    ) -> chronicle::Result<serde_json::Value> {
        if self.fail_pushes {
            return Err(chronicle::Error::Transport(format!(
                "{} is unreachable",
                target.url
            )));
        }
        self.pushes.lock().await.push(request);
        Ok(serde_json::json!({"status": "OK", "results": {}}))
    }
}
