//! outbound calls to other chronicle instances.
//!
//! replication pulls an upstream's chain from `/export` or `/since/{hash}`;
//! cross-signing posts to a peer's `/publish`. every response must carry a
//! body signature from the key registered for that peer before its contents
//! are looked at.

use std::sync::Arc;
use std::time::Duration;

use chronicle_chain::envelope::{sign_body, verify_body};
use chronicle_chain::{BODY_SIGNATURE_HEADER, CLIENT_ID_HEADER, ChainHash, PublicKey, SigningKey};
use chronicle_types::{CrossSignTarget, PeerConfig, ReplicationSource, WireEntry};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{CrossSignRequest, Error, Result};

/// transport to other instances.
///
/// takes owned values to avoid lifetime issues with dynamic dispatch.
pub trait PeerTransport: Send + Sync {
    /// entries of `source`'s chain after `since`, or all of them.
    fn fetch_chain(
        &self,
        source: ReplicationSource,
        since: Option<ChainHash>,
    ) -> impl std::future::Future<Output = Result<Vec<WireEntry>>> + Send;

    /// publish a cross-sign request to `target`, returning its verified
    /// response body.
    fn publish_cross_sign(
        &self,
        target: CrossSignTarget,
        request: CrossSignRequest,
    ) -> impl std::future::Future<Output = Result<serde_json::Value>> + Send;
}

/// object-safe wrapper for PeerTransport, used for dynamic dispatch
pub trait PeerTransportBoxed: Send + Sync {
    /// fetch an upstream chain
    fn fetch_chain(
        &self,
        source: ReplicationSource,
        since: Option<ChainHash>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<WireEntry>>> + Send + '_>>;

    /// publish a cross-sign request
    fn publish_cross_sign(
        &self,
        target: CrossSignTarget,
        request: CrossSignRequest,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<serde_json::Value>> + Send + '_>,
    >;
}

impl<T: PeerTransport> PeerTransportBoxed for T {
    fn fetch_chain(
        &self,
        source: ReplicationSource,
        since: Option<ChainHash>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<WireEntry>>> + Send + '_>>
    {
        Box::pin(PeerTransport::fetch_chain(self, source, since))
    }

    fn publish_cross_sign(
        &self,
        target: CrossSignTarget,
        request: CrossSignRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<serde_json::Value>> + Send + '_>>
    {
        Box::pin(PeerTransport::publish_cross_sign(self, target, request))
    }
}

/// response envelope as sent by every chronicle endpoint.
#[derive(Debug, Deserialize)]
struct PeerResponse<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    results: Option<T>,
}

/// http transport using reqwest.
#[derive(Clone)]
pub struct HttpPeer {
    client: reqwest::Client,
    signing_key: Arc<SigningKey>,
}

impl HttpPeer {
    /// create a transport signing requests with `signing_key`.
    pub fn new(signing_key: Arc<SigningKey>, config: &PeerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("chronicle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            signing_key,
        })
    }

    /// read a response, check its body signature under `key`, and unwrap the
    /// envelope.
    async fn read_signed<T: DeserializeOwned>(
        url: &str,
        key: &PublicKey,
        response: reqwest::Response,
    ) -> Result<(serde_json::Value, T)> {
        let status = response.status();
        let signature = response
            .headers()
            .get(BODY_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        verify_body(key, &body, signature.as_deref()).map_err(|_| {
            Error::SecurityViolation(format!(
                "response from {} is not signed by the registered key",
                url
            ))
        })?;

        let raw: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| Error::Transport(format!("invalid response from {}: {}", url, e)))?;
        let parsed: PeerResponse<T> = serde_json::from_value(raw.clone())
            .map_err(|e| Error::Transport(format!("invalid response from {}: {}", url, e)))?;

        if !status.is_success() || parsed.status != "OK" {
            return Err(Error::Transport(format!(
                "{} answered {}: {}",
                url,
                status,
                parsed.message.unwrap_or_default()
            )));
        }

        let results = parsed
            .results
            .ok_or_else(|| Error::Transport(format!("response from {} has no results", url)))?;
        Ok((raw, results))
    }
}

fn peer_key(name: &str, encoded: &str) -> Result<PublicKey> {
    PublicKey::from_base64(encoded)
        .map_err(|e| Error::Configuration(format!("public key of {} is unusable: {}", name, e)))
}

impl PeerTransport for HttpPeer {
    async fn fetch_chain(
        &self,
        source: ReplicationSource,
        since: Option<ChainHash>,
    ) -> Result<Vec<WireEntry>> {
        let key = peer_key(&source.name, &source.public_key)?;
        let url = match since {
            None => source.endpoint("export"),
            Some(hash) => source.endpoint(&format!("since/{}", hash)),
        };
        debug!(source = %source.unique_id, %url, "fetching upstream chain");

        let response = self.client.get(&url).send().await?;
        let (_, entries) = Self::read_signed::<Vec<WireEntry>>(&url, &key, response).await?;
        Ok(entries)
    }

    async fn publish_cross_sign(
        &self,
        target: CrossSignTarget,
        request: CrossSignRequest,
    ) -> Result<serde_json::Value> {
        let key = peer_key(&target.name, &target.public_key)?;
        let url = target.endpoint("publish");
        let body = serde_json::to_vec(&request)
            .map_err(|e| Error::Transport(format!("failed to encode request: {}", e)))?;

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(BODY_SIGNATURE_HEADER, sign_body(&self.signing_key, &body));
        if let Some(client_id) = &target.client_id {
            builder = builder.header(CLIENT_ID_HEADER, client_id);
        }
        debug!(target = %target.name, %url, "publishing cross-sign");

        let response = builder.body(body).send().await?;
        let (raw, _) = Self::read_signed::<serde_json::Value>(&url, &key, response).await?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_chain::envelope::{sign_body, verify_body};
    use chronicle_chain::{BODY_SIGNATURE_HEADER, CLIENT_ID_HEADER, ChainHash, SigningKey};
    use chronicle_types::{CrossSignPolicy, CrossSignTarget, PeerConfig, ReplicationSource};
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    // the boxed wrapper stays out of scope so method calls resolve to PeerTransport
    use super::{HttpPeer, PeerTransport};
    use crate::CrossSignRequest;

    fn signed_response(key: &SigningKey, status: u16, body: serde_json::Value) -> ResponseTemplate {
        let body = serde_json::to_vec(&body).unwrap();
        ResponseTemplate::new(status)
            .insert_header(BODY_SIGNATURE_HEADER, sign_body(key, &body).as_str())
            .set_body_raw(body, "application/json")
    }

    fn transport() -> HttpPeer {
        HttpPeer::new(Arc::new(SigningKey::generate()), &PeerConfig::default()).unwrap()
    }

    fn source(server: &MockServer, key: &SigningKey) -> ReplicationSource {
        ReplicationSource::new(
            "upstream".into(),
            "upstream".into(),
            format!("{}/chronicle", server.uri()),
            key.public_key().to_base64(),
        )
    }

    fn target(server: &MockServer, key: &SigningKey) -> CrossSignTarget {
        let mut target = CrossSignTarget::new(
            "peer".into(),
            format!("{}/chronicle", server.uri()),
            key.public_key().to_base64(),
            CrossSignPolicy::default(),
        );
        target.client_id = Some("local-client".into());
        target
    }

    fn request() -> CrossSignRequest {
        CrossSignRequest {
            target: "peer".into(),
            cross_sign_at: "2026-03-01T12:00:00+00:00".into(),
            currhash: ChainHash::from([1; 32]),
            summaryhash: ChainHash::from([2; 32]),
        }
    }

    #[tokio::test]
    async fn fetch_without_since_uses_export() {
        let upstream = SigningKey::generate();
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/chronicle/export"))
            .respond_with(signed_response(
                &upstream,
                200,
                serde_json::json!({"status": "OK", "results": []}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let entries = transport()
            .fetch_chain(source(&server, &upstream), None)
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn fetch_with_since_uses_since_path() {
        let upstream = SigningKey::generate();
        let since = ChainHash::from([7; 32]);
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path(format!("/chronicle/since/{}", since)))
            .respond_with(signed_response(
                &upstream,
                200,
                serde_json::json!({"status": "OK", "results": []}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        transport()
            .fetch_chain(source(&server, &upstream), Some(since))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unsigned_response_is_security_violation() {
        let upstream = SigningKey::generate();
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "OK", "results": []})),
            )
            .mount(&server)
            .await;

        let err = transport()
            .fetch_chain(source(&server, &upstream), None)
            .await
            .unwrap_err();
        assert!(err.is_security_violation());
    }

    #[tokio::test]
    async fn response_signed_by_other_key_is_security_violation() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(signed_response(
                &SigningKey::generate(),
                200,
                serde_json::json!({"status": "OK", "results": []}),
            ))
            .mount(&server)
            .await;

        let err = transport()
            .fetch_chain(source(&server, &SigningKey::generate()), None)
            .await
            .unwrap_err();
        assert!(err.is_security_violation());
    }

    #[tokio::test]
    async fn signed_error_is_transient() {
        let upstream = SigningKey::generate();
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(signed_response(
                &upstream,
                500,
                serde_json::json!({"status": "ERROR", "message": "internal server error"}),
            ))
            .mount(&server)
            .await;

        let err = transport()
            .fetch_chain(source(&server, &upstream), None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn publish_signs_request_and_names_client() {
        let peer = SigningKey::generate();
        let local = Arc::new(SigningKey::generate());
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/chronicle/publish"))
            .and(matchers::header(CLIENT_ID_HEADER, "local-client"))
            .and(matchers::header_exists(BODY_SIGNATURE_HEADER))
            .and(matchers::body_json(serde_json::json!({
                "target": "peer",
                "cross-sign-at": "2026-03-01T12:00:00+00:00",
                "currhash": ChainHash::from([1; 32]).to_base64(),
                "summaryhash": ChainHash::from([2; 32]).to_base64(),
            })))
            .respond_with(signed_response(
                &peer,
                200,
                serde_json::json!({"status": "OK", "results": {"summaryhash": "x"}}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpPeer::new(local.clone(), &PeerConfig::default()).unwrap();
        let response = transport
            .publish_cross_sign(target(&server, &peer), request())
            .await
            .unwrap();
        assert_eq!(response["results"]["summaryhash"], "x");

        // the body signature verifies under the local key
        let received = &server.received_requests().await.unwrap()[0];
        let signature = received
            .headers
            .get(BODY_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        verify_body(&local.public_key(), &received.body, signature).unwrap();
    }

    #[tokio::test]
    async fn unreachable_peer_is_transient() {
        let target = CrossSignTarget::new(
            "down".into(),
            "http://127.0.0.1:1/chronicle".into(),
            SigningKey::generate().public_key().to_base64(),
            CrossSignPolicy::default(),
        );
        let err = transport()
            .publish_cross_sign(target, request())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
