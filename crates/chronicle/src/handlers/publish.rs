//! publish endpoint

use axum::{Json, extract::State};
use tracing::debug;

use super::{ApiError, Envelope, SignedRequest, ok, validate_request_time};
use crate::{AppendReceipt, LedgerContext};

/// POST /chronicle/publish
///
/// appends the signed body to the primary chain. the body is stored as is;
/// if it is a json object with a `now` field, that must lie within the
/// request window. due cross-signs are started in the background.
pub async fn publish(
    State(ctx): State<LedgerContext>,
    request: SignedRequest,
) -> Result<Json<Envelope<AppendReceipt>>, ApiError> {
    let payload = std::str::from_utf8(&request.body)
        .map_err(|_| ApiError::bad_request("message must be valid utf-8"))?;
    if payload.is_empty() {
        return Err(ApiError::bad_request("message is empty"));
    }
    validate_request_time(&request.body, "now", ctx.config.request_timeout_secs)?;

    let entry = ctx
        .ledger()
        .append(payload, &request.signature, &request.public_key)
        .await?;
    debug!(
        client = %request.client.public_id,
        sequence = entry.sequence,
        "published message"
    );

    let cross_signer = ctx.cross_signer();
    tokio::spawn(async move {
        cross_signer.run_due().await;
    });

    Ok(ok(AppendReceipt::from(&entry)))
}
