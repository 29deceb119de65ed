//! create chronicle_clients table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleClients::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::Publicid)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::Publickey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::Comment)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleClients::Modified)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChronicleClients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ChronicleClients {
    Table,
    Id,
    Publicid,
    Publickey,
    #[sea_orm(iden = "isAdmin")]
    IsAdmin,
    Comment,
    Created,
    Modified,
}
