//! client administration endpoints
//!
//! both endpoints need a signed request from an admin client and a
//! `request-time` within the request window, so a captured request cannot be
//! replayed later.

use axum::{Json, extract::State};
use chrono::Utc;
use chronicle_chain::{PublicKey, encoding};
use chronicle_db::Database;
use chronicle_types::{Client, format_created};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, Envelope, OptionExt, ResultExt, SignedRequest, ok, validate_request_time};
use crate::{AppendReceipt, LedgerContext};

/// random bytes in a generated client id
const CLIENT_ID_BYTES: usize = 24;

/// generate a new public client id
pub(crate) fn generate_client_id() -> String {
    let mut bytes = [0u8; CLIENT_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    encoding::encode(bytes)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    publickey: String,
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResults {
    #[serde(rename = "client-id")]
    client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish: Option<AppendReceipt>,
}

#[derive(Debug, Deserialize)]
struct RevokeRequest {
    clientid: String,
    publickey: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResults {
    deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoke: Option<AppendReceipt>,
}

/// append a server-signed notice about a client change, if configured
async fn publish_notice(
    ctx: &LedgerContext,
    action: &str,
    client_id: &str,
    public_key: &str,
) -> Result<Option<AppendReceipt>, ApiError> {
    if !ctx.config.publish_new_clients {
        return Ok(None);
    }
    let message = serde_json::to_string_pretty(&serde_json::json!({
        "server-action": action,
        "now": format_created(Utc::now()),
        "clientid": client_id,
        "publickey": public_key,
    }))
    .map_internal()?;
    let entry = ctx.ledger().append_signed(&message, &ctx.signing_key).await?;

    let cross_signer = ctx.cross_signer();
    tokio::spawn(async move {
        cross_signer.run_due().await;
    });
    Ok(Some(AppendReceipt::from(&entry)))
}

/// POST /chronicle/register
///
/// body: `{"publickey", "comment"?, "request-time"}`. registers a publishing
/// client and returns its generated id.
pub async fn register(
    State(ctx): State<LedgerContext>,
    request: SignedRequest,
) -> Result<Json<Envelope<RegisterResults>>, ApiError> {
    request.require_admin()?;
    validate_request_time(
        &request.body,
        "request-time",
        ctx.config.request_timeout_secs,
    )?;

    let body: RegisterRequest = serde_json::from_slice(&request.body).map_bad_request()?;
    PublicKey::from_base64(&body.publickey)
        .map_err(|e| ApiError::bad_request(format!("publickey: {}", e)))?;

    let client = ctx
        .db
        .create_client(&Client::new(
            generate_client_id(),
            body.publickey,
            false,
            body.comment,
        ))
        .await
        .map_internal()?;
    info!(
        client = %client.public_id,
        by = %request.client.public_id,
        "registered client"
    );

    let publish = publish_notice(
        &ctx,
        "New Client Registration",
        &client.public_id,
        &client.public_key,
    )
    .await?;

    Ok(ok(RegisterResults {
        client_id: client.public_id,
        publish,
    }))
}

/// POST /chronicle/revoke
///
/// body: `{"clientid", "publickey", "request-time"}`. both must match a
/// registered client; admins cannot be revoked this way.
pub async fn revoke(
    State(ctx): State<LedgerContext>,
    request: SignedRequest,
) -> Result<Json<Envelope<RevokeResults>>, ApiError> {
    request.require_admin()?;
    validate_request_time(
        &request.body,
        "request-time",
        ctx.config.request_timeout_secs,
    )?;

    let body: RevokeRequest = serde_json::from_slice(&request.body).map_bad_request()?;

    let client = ctx
        .db
        .get_client_by_public_id(&body.clientid)
        .await
        .map_internal()?
        .filter(|c| c.public_key == body.publickey)
        .or_not_found("client not found, it may have already been deleted")?;
    if client.is_admin {
        return Err(ApiError::forbidden(
            "administrators cannot be revoked through the api",
        ));
    }

    let deleted = ctx
        .db
        .delete_client(&client.public_id)
        .await
        .map_internal()?;
    info!(
        client = %client.public_id,
        by = %request.client.public_id,
        deleted,
        "revoked client"
    );

    let revoke = if deleted {
        publish_notice(
            &ctx,
            "Client Access Revocation",
            &client.public_id,
            &client.public_key,
        )
        .await?
    } else {
        None
    };

    Ok(ok(RevokeResults { deleted, revoke }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_url_safe_and_unique() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(!a.contains('+') && !a.contains('/'));
    }
}
