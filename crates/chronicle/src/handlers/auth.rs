//! signed requests from registered clients
//!
//! a client names itself in `Chronicle-Client-Key-ID` and signs the raw body
//! with its registered key in `Body-Signature-Ed25519`. the extractor looks
//! the client up and verifies the signature before a handler sees the body.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use chrono::{Duration, Utc};
use chronicle_chain::envelope::verify_body;
use chronicle_chain::{BODY_SIGNATURE_HEADER, CLIENT_ID_HEADER, PublicKey};
use chronicle_db::Database;
use chronicle_types::{Client, parse_created};
use tracing::debug;

use super::{ApiError, OptionExt, ResultExt};
use crate::LedgerContext;

/// a request whose body is signed by a registered client
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// the client that signed the request
    pub client: Client,
    /// the client's registered key
    pub public_key: PublicKey,
    /// base64url signature over `body`
    pub signature: String,
    /// raw request body
    pub body: Bytes,
}

impl SignedRequest {
    /// reject clients without admin rights
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.client.is_admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("unprivileged request"))
        }
    }
}

fn header(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

impl FromRequest<LedgerContext> for SignedRequest {
    type Rejection = ApiError;

    async fn from_request(req: Request, ctx: &LedgerContext) -> Result<Self, Self::Rejection> {
        let client_id =
            header(&req, CLIENT_ID_HEADER).or_unauthorized("missing client id header")?;
        let signature =
            header(&req, BODY_SIGNATURE_HEADER).or_unauthorized("missing body signature")?;

        let body = Bytes::from_request(req, ctx)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let client = ctx
            .db
            .get_client_by_public_id(&client_id)
            .await
            .map_internal()?
            .or_unauthorized("unknown client")?;

        let public_key = PublicKey::from_base64(&client.public_key).map_internal()?;
        verify_body(&public_key, &body, Some(&signature))
            .map_err(|_| ApiError::forbidden("invalid body signature"))?;

        debug!(client = %client.public_id, "authenticated request");
        Ok(Self {
            client,
            public_key,
            signature,
            body,
        })
    }
}

/// reject a body whose `field` timestamp lies outside `window_secs` of now.
///
/// bodies that are not json objects, or have no such field, pass.
pub fn validate_request_time(body: &[u8], field: &str, window_secs: u64) -> Result<(), ApiError> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body)
    else {
        return Ok(());
    };
    let Some(value) = map.get(field) else {
        return Ok(());
    };

    let stamp = value
        .as_str()
        .and_then(|s| parse_created(s).ok())
        .ok_or_else(|| ApiError::forbidden(format!("{} is not a timestamp", field)))?;

    let window = Duration::seconds(window_secs as i64);
    let now = Utc::now();
    if stamp < now - window || stamp > now + window {
        return Err(ApiError::forbidden(format!(
            "{} is outside the accepted window",
            field
        )));
    }
    Ok(())
}
