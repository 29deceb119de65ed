//! cross-sign target entity.

use chronicle_types::{CrossSignTarget, TargetId};
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

use crate::Error;

/// a peer chronicle that receives this instance's chain head.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_xsign_targets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: String,
    pub url: String,
    pub publickey: String,

    /// our client id at the peer
    pub clientid: Option<String>,

    /// json-serialized CrossSignPolicy
    #[sea_orm(column_type = "Text")]
    pub policy: String,

    /// json-serialized LastRun
    #[sea_orm(column_type = "Text", nullable)]
    pub lastrun: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CrossSignTarget {
    type Error = Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let last_run = match model.lastrun.as_deref() {
            None | Some("") => None,
            Some(json) => Some(serde_json::from_str(json)?),
        };
        Ok(Self {
            id: TargetId(model.id as u64),
            name: model.name,
            url: model.url,
            public_key: model.publickey,
            client_id: model.clientid,
            policy: serde_json::from_str(&model.policy)?,
            last_run,
        })
    }
}

impl TryFrom<&CrossSignTarget> for ActiveModel {
    type Error = Error;

    fn try_from(target: &CrossSignTarget) -> Result<Self, Self::Error> {
        Ok(Self {
            id: if target.id.0 == 0 {
                NotSet
            } else {
                Set(target.id.0 as i64)
            },
            name: Set(target.name.clone()),
            url: Set(target.url.clone()),
            publickey: Set(target.public_key.clone()),
            clientid: Set(target.client_id.clone()),
            policy: Set(serde_json::to_string(&target.policy)?),
            lastrun: Set(target
                .last_run
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?),
        })
    }
}
