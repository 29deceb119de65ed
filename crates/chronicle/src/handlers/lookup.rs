//! read access to the primary chain

use axum::{
    Json,
    extract::{Path, State},
};
use chronicle_chain::ChainHash;
use chronicle_db::Database;
use chronicle_types::{ChainScope, WireEntry};
use serde::Serialize;

use super::{ApiError, Envelope, OptionExt, ResultExt, ok};
use crate::LedgerContext;

/// head hashes of a chain; both null while the chain is empty
#[derive(Debug, Serialize)]
pub struct LastHash {
    #[serde(rename = "curr-hash")]
    curr_hash: Option<ChainHash>,
    #[serde(rename = "summary-hash")]
    summary_hash: Option<ChainHash>,
}

pub(super) async fn scope_last_hash(
    ctx: &LedgerContext,
    scope: ChainScope,
) -> Result<LastHash, ApiError> {
    let head = ctx.db.latest_entry(scope).await.map_internal()?;
    Ok(LastHash {
        curr_hash: head.as_ref().map(|h| h.curr_hash),
        summary_hash: head.as_ref().map(|h| h.summary_hash),
    })
}

fn parse_hash(hash: &str) -> Result<ChainHash, ApiError> {
    hash.parse().map_bad_request()
}

pub(super) async fn scope_lookup(
    ctx: &LedgerContext,
    scope: ChainScope,
    hash: &str,
) -> Result<Vec<WireEntry>, ApiError> {
    let hash = parse_hash(hash)?;
    let entries = ctx
        .db
        .find_entries_by_hash(scope, &hash)
        .await
        .map_internal()?;
    if entries.is_empty() {
        return Err(ApiError::not_found("no record found matching this hash"));
    }
    Ok(entries.iter().map(WireEntry::from).collect())
}

pub(super) async fn scope_since(
    ctx: &LedgerContext,
    scope: ChainScope,
    hash: &str,
) -> Result<Vec<WireEntry>, ApiError> {
    let hash = parse_hash(hash)?;
    let entries = ctx
        .db
        .entries_since(scope, &hash)
        .await
        .map_internal()?
        .or_not_found("no record found matching this hash")?;
    Ok(entries.iter().map(WireEntry::from).collect())
}

pub(super) async fn scope_export(
    ctx: &LedgerContext,
    scope: ChainScope,
) -> Result<Vec<WireEntry>, ApiError> {
    let entries = ctx.db.list_entries(scope).await.map_internal()?;
    Ok(entries.iter().map(WireEntry::from).collect())
}

/// GET /chronicle/lasthash
pub async fn last_hash(
    State(ctx): State<LedgerContext>,
) -> Result<Json<Envelope<LastHash>>, ApiError> {
    Ok(ok(scope_last_hash(&ctx, ChainScope::Primary).await?))
}

/// GET /chronicle/lookup/{hash}
///
/// entries whose current or summary hash equals `hash`
pub async fn lookup(
    State(ctx): State<LedgerContext>,
    Path(hash): Path<String>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    Ok(ok(scope_lookup(&ctx, ChainScope::Primary, &hash).await?))
}

/// GET /chronicle/since/{hash}
pub async fn since(
    State(ctx): State<LedgerContext>,
    Path(hash): Path<String>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    Ok(ok(scope_since(&ctx, ChainScope::Primary, &hash).await?))
}

/// GET /chronicle/export
pub async fn export(
    State(ctx): State<LedgerContext>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    Ok(ok(scope_export(&ctx, ChainScope::Primary).await?))
}
