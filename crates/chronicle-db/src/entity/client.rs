//! client entity.

use chrono::{DateTime, Utc};
use chronicle_types::Client;
use sea_orm::ActiveValue::NotSet;
use sea_orm::Set;
use sea_orm::entity::prelude::*;

/// a key allowed to publish.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub publicid: String,

    pub publickey: String,

    #[sea_orm(column_name = "isAdmin")]
    pub is_admin: bool,

    #[sea_orm(column_type = "Text")]
    pub comment: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Client {
    fn from(model: Model) -> Self {
        Self {
            id: model.id as u64,
            public_id: model.publicid,
            public_key: model.publickey,
            is_admin: model.is_admin,
            comment: model.comment,
            created_at: model.created,
            updated_at: model.modified,
        }
    }
}

impl From<&Client> for ActiveModel {
    fn from(client: &Client) -> Self {
        Self {
            id: if client.id == 0 {
                NotSet
            } else {
                Set(client.id as i64)
            },
            publicid: Set(client.public_id.clone()),
            publickey: Set(client.public_key.clone()),
            is_admin: Set(client.is_admin),
            comment: Set(client.comment.clone()),
            created: Set(client.created_at),
            modified: Set(client.updated_at),
        }
    }
}
