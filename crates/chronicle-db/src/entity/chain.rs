//! primary chain entity.

use chronicle_chain::encoding;
use chronicle_types::{ChainEntry, NewChainEntry};
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

use super::{parse_hash, parse_prev_hash, parse_public_key, parse_state};
use crate::Error;

/// one entry of this instance's own chain.
///
/// rows are only ever inserted. `prevhash` is unique so two writers can never
/// both extend the same head.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_chain")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// signed message body
    #[sea_orm(column_type = "Text")]
    pub data: String,

    /// currhash of the previous row, null for genesis
    #[sea_orm(unique)]
    pub prevhash: Option<String>,

    pub currhash: String,

    /// base64url summary accumulator state
    #[sea_orm(column_type = "Text")]
    pub hashstate: String,

    pub summaryhash: String,
    pub publickey: String,
    pub signature: String,

    /// rfc3339, stored exactly as hashed
    pub created: String,
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
            source: None,
            replicated: None,
        })
    }
}

impl From<&NewChainEntry> for ActiveModel {
    fn from(entry: &NewChainEntry) -> Self {
        Self {
            id: NotSet,
            data: Set(entry.payload.clone()),
            prevhash: Set(entry.prev_hash.map(|h| h.to_base64())),
            currhash: Set(entry.curr_hash.to_base64()),
            hashstate: Set(encoding::encode(&entry.hash_state)),
            summaryhash: Set(entry.summary_hash.to_base64()),
            publickey: Set(entry.public_key.to_base64()),
            signature: Set(entry.signature.clone()),
            created: Set(entry.created.clone()),
        }
    }
}
