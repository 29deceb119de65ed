//! replication source entity.

use chronicle_types::{ReplicationSource, SourceId};
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

/// an upstream chronicle mirrored by this instance.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_replication_sources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub uniqueid: String,

    pub name: String,
    pub url: String,
    pub publickey: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ReplicationSource {
    fn from(model: Model) -> Self {
        Self {
            id: SourceId(model.id as u64),
            unique_id: model.uniqueid,
            name: model.name,
            url: model.url,
            public_key: model.publickey,
        }
    }
}

impl From<&ReplicationSource> for ActiveModel {
    fn from(source: &ReplicationSource) -> Self {
        Self {
            id: if source.id.0 == 0 {
                NotSet
            } else {
                Set(source.id.0 as i64)
            },
            uniqueid: Set(source.unique_id.clone()),
            name: Set(source.name.clone()),
            url: Set(source.url.clone()),
            publickey: Set(source.public_key.clone()),
        }
    }
}
