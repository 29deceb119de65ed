//! read access to mirrored chains
//!
//! mirrors are addressed by their source's public unique id.

use axum::{
    Json,
    extract::{Path, State},
};
use chronicle_db::Database;
use chronicle_types::{ChainScope, WireEntry};
use serde::Serialize;

use super::lookup::{LastHash, scope_export, scope_last_hash, scope_lookup, scope_since};
use super::{ApiError, Envelope, OptionExt, ResultExt, ok};
use crate::LedgerContext;

/// public description of a replication source
#[derive(Debug, Serialize)]
pub struct ReplicaInfo {
    uniqueid: String,
    name: String,
    url: String,
    publickey: String,
}

async fn mirror_scope(ctx: &LedgerContext, unique_id: &str) -> Result<ChainScope, ApiError> {
    let source = ctx
        .db
        .get_replication_source_by_unique_id(unique_id)
        .await
        .map_internal()?
        .or_not_found("unknown replication source")?;
    Ok(ChainScope::Mirror(source.id))
}

/// GET /chronicle/replica
pub async fn replica_index(
    State(ctx): State<LedgerContext>,
) -> Result<Json<Envelope<Vec<ReplicaInfo>>>, ApiError> {
    let sources = ctx.db.list_replication_sources().await.map_internal()?;
    Ok(ok(sources
        .into_iter()
        .map(|s| ReplicaInfo {
            uniqueid: s.unique_id,
            name: s.name,
            url: s.url,
            publickey: s.public_key,
        })
        .collect()))
}

/// GET /chronicle/replica/{source}/lasthash
pub async fn replica_last_hash(
    State(ctx): State<LedgerContext>,
    Path(source): Path<String>,
) -> Result<Json<Envelope<LastHash>>, ApiError> {
    let scope = mirror_scope(&ctx, &source).await?;
    Ok(ok(scope_last_hash(&ctx, scope).await?))
}

/// GET /chronicle/replica/{source}/lookup/{hash}
pub async fn replica_lookup(
    State(ctx): State<LedgerContext>,
    Path((source, hash)): Path<(String, String)>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    let scope = mirror_scope(&ctx, &source).await?;
    Ok(ok(scope_lookup(&ctx, scope, &hash).await?))
}

/// GET /chronicle/replica/{source}/since/{hash}
pub async fn replica_since(
    State(ctx): State<LedgerContext>,
    Path((source, hash)): Path<(String, String)>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    let scope = mirror_scope(&ctx, &source).await?;
    Ok(ok(scope_since(&ctx, scope, &hash).await?))
}

/// GET /chronicle/replica/{source}/export
pub async fn replica_export(
    State(ctx): State<LedgerContext>,
    Path(source): Path<String>,
) -> Result<Json<Envelope<Vec<WireEntry>>>, ApiError> {
    let scope = mirror_scope(&ctx, &source).await?;
    Ok(ok(scope_export(&ctx, scope).await?))
}
