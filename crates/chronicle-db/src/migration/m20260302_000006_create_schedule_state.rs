//! create chronicle_schedule_state table (single row) for scheduled task anchors.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleScheduleState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleScheduleState::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleScheduleState::LastAttestation)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(ChronicleScheduleState::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChronicleScheduleState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ChronicleScheduleState {
    Table,
    Id,
    LastAttestation,
    UpdatedAt,
}
