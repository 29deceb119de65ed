//! create chronicle_replication_sources table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleReplicationSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleReplicationSources::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationSources::Uniqueid)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationSources::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationSources::Url)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationSources::Publickey)
                            .string_len(64)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ChronicleReplicationSources::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ChronicleReplicationSources {
    Table,
    Id,
    Uniqueid,
    Name,
    Url,
    Publickey,
}
