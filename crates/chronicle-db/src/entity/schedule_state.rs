//! scheduled task state entity.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// anchors for scheduled tasks. there should only ever be one row (id=1).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "chronicle_schedule_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// when the last self-attestation was appended
    pub last_attestation: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
