//! create chronicle_replication_chain table holding every source's mirror.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChronicleReplicationChain::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Source)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Data)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChronicleReplicationChain::Prevhash).string_len(64))
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Currhash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Hashstate)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Summaryhash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Publickey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Signature)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Created)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChronicleReplicationChain::Replicated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chronicle_replication_chain_source")
                            .from(
                                ChronicleReplicationChain::Table,
                                ChronicleReplicationChain::Source,
                            )
                            .to(
                                ChronicleReplicationSources::Table,
                                ChronicleReplicationSources::Id,
                            )
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // each mirror is linear on its own
        manager
            .create_index(
                Index::create()
                    .name("idx_chronicle_replication_chain_source_prevhash")
                    .table(ChronicleReplicationChain::Table)
                    .col(ChronicleReplicationChain::Source)
                    .col(ChronicleReplicationChain::Prevhash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chronicle_replication_chain_summaryhash")
                    .table(ChronicleReplicationChain::Table)
                    .col(ChronicleReplicationChain::Summaryhash)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ChronicleReplicationChain::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum ChronicleReplicationChain {
    Table,
    Id,
    Source,
    Data,
    Prevhash,
    Currhash,
    Hashstate,
    Summaryhash,
    Publickey,
    Signature,
    Created,
    Replicated,
}

#[derive(DeriveIden)]
enum ChronicleReplicationSources {
    Table,
    Id,
}
