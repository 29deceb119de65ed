//! mirrored chain entity - one table for every source's mirror.

use chrono::{DateTime, Utc};
use chronicle_chain::encoding;
use chronicle_types::{ChainEntry, NewChainEntry, SourceId};
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

use super::{parse_hash, parse_prev_hash, parse_public_key, parse_state};
use crate::Error;

/// one mirrored entry of an upstream chain.
///
/// `(source, prevhash)` is unique, so each mirror stays linear.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_replication_chain")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// replication source id
    pub source: i64,

    #[sea_orm(column_type = "Text")]
    pub data: String,

    pub prevhash: Option<String>,
    pub currhash: String,

    #[sea_orm(column_type = "Text")]
    pub hashstate: String,

    pub summaryhash: String,
    pub publickey: String,
    pub signature: String,

    /// upstream creation time, as hashed upstream
    pub created: String,

    /// when this row was mirrored
    pub replicated: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ChainEntry {
    type Error = Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            sequence: model.id,
            prev_hash: parse_prev_hash(model.prevhash.as_deref())?,
            curr_hash: parse_hash("currhash", &model.currhash)?,
            hash_state: parse_state(&model.hashstate)?,
            summary_hash: parse_hash("summaryhash", &model.summaryhash)?,
            public_key: parse_public_key(&model.publickey)?,
            payload: model.data,
            signature: model.signature,
            created: model.created,
            source: Some(SourceId(model.source as u64)),
            replicated: Some(model.replicated),
        })
    }
}

/// build an insert for the mirror of `source`.
pub fn active_model(source: SourceId, entry: &NewChainEntry) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        source: Set(source.0 as i64),
        data: Set(entry.payload.clone()),
        prevhash: Set(entry.prev_hash.map(|h| h.to_base64())),
        currhash: Set(entry.curr_hash.to_base64()),
        hashstate: Set(encoding::encode(&entry.hash_state)),
        summaryhash: Set(entry.summary_hash.to_base64()),
        publickey: Set(entry.public_key.to_base64()),
        signature: Set(entry.signature.clone()),
        created: Set(entry.created.clone()),
        replicated: Set(entry.replicated.unwrap_or_else(Utc::now)),
    }
}
