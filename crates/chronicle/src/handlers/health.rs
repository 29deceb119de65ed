//! liveness of the ledger's storage

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chronicle_db::Database;
use chronicle_types::ChainScope;
use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;

use crate::LedgerContext;

const HEALTH_CONTENT_TYPE: &str = "application/health+json; charset=utf-8";

const STORAGE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    #[serde(rename = "primary-entries", skip_serializing_if = "Option::is_none")]
    primary_entries: Option<u64>,
}

/// GET /health
///
/// `pass` with the primary chain's entry count when storage answers within
/// a second, `fail` and 500 otherwise.
pub async fn health(State(ctx): State<LedgerContext>) -> Response {
    let counted = timeout(STORAGE_TIMEOUT, ctx.db.count_entries(ChainScope::Primary)).await;

    let (code, body) = match counted {
        Ok(Ok(n)) => (
            StatusCode::OK,
            Health {
                status: "pass",
                primary_entries: Some(n),
            },
        ),
        Ok(Err(e)) => {
            warn!(error = %e, "health check: storage error");
            (StatusCode::INTERNAL_SERVER_ERROR, Health::failed())
        }
        Err(_) => {
            warn!("health check: storage timed out");
            (StatusCode::INTERNAL_SERVER_ERROR, Health::failed())
        }
    };

    (code, [(header::CONTENT_TYPE, HEALTH_CONTENT_TYPE)], Json(body)).into_response()
}

impl Health {
    fn failed() -> Self {
        Self {
            status: "fail",
            primary_entries: None,
        }
    }
}
