//! create chronicle_xsign_targets table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleXsignTargets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleXsignTargets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChronicleXsignTargets::Name).string().not_null())
                    .col(ColumnDef::new(ChronicleXsignTargets::Url).text().not_null())
                    .col(
                        ColumnDef::new(ChronicleXsignTargets::Publickey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChronicleXsignTargets::Clientid).string_len(64))
                    // json: {"push-after": n, "push-days": d}
                    .col(ColumnDef::new(ChronicleXsignTargets::Policy).text().not_null())
                    // json: {"id": seq, "time": rfc3339, "response": {...}}
                    .col(ColumnDef::new(ChronicleXsignTargets::Lastrun).text())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChronicleXsignTargets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ChronicleXsignTargets {
    Table,
    Id,
    Name,
    Url,
    Publickey,
    Clientid,
    Policy,
    Lastrun,
}
