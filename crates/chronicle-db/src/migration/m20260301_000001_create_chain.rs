//! create chronicle_chain table for this instance's own chain.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleChain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleChain::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChronicleChain::Data).text().not_null())
                    // null for genesis
                    .col(ColumnDef::new(ChronicleChain::Prevhash).string_len(64))
                    .col(
                        ColumnDef::new(ChronicleChain::Currhash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChronicleChain::Hashstate).text().not_null())
                    .col(
                        ColumnDef::new(ChronicleChain::Summaryhash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleChain::Publickey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleChain::Signature)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleChain::Created)
                            .string_len(64)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // one successor per entry
        manager
            .create_index(
                Index::create()
                    .name("idx_chronicle_chain_prevhash")
                    .table(ChronicleChain::Table)
                    .col(ChronicleChain::Prevhash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chronicle_chain_currhash")
                    .table(ChronicleChain::Table)
                    .col(ChronicleChain::Currhash)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chronicle_chain_summaryhash")
                    .table(ChronicleChain::Table)
                    .col(ChronicleChain::Summaryhash)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChronicleChain::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ChronicleChain {
    Table,
    Id,
    Data,
    Prevhash,
    Currhash,
    Hashstate,
    Summaryhash,
    Publickey,
    Signature,
    Created,
}
