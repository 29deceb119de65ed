//! response body signing.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chronicle_chain::BODY_SIGNATURE_HEADER;
use chronicle_chain::envelope::sign_body;
use tracing::error;

use crate::LedgerContext;

/// sign every response body with the server key.
///
/// the body is buffered so the signature covers exactly the bytes sent.
pub async fn sign_response(
    State(ctx): State<LedgerContext>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let (mut parts, body) = response.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match HeaderValue::from_str(&sign_body(&ctx.signing_key, &bytes)) {
        Ok(value) => {
            parts.headers.insert(BODY_SIGNATURE_HEADER, value);
        }
        Err(e) => {
            error!(error = %e, "signature is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}
