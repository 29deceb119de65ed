//! allow at most one genesis entry per chain.
//!
//! the unique `prevhash` indexes treat NULLs as distinct, so they cannot stop
//! two processes that both saw an empty chain from each inserting a genesis
//! row. partial indexes over the NULL rows close that gap on sqlite and
//! postgres alike.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_chronicle_chain_genesis \
             ON chronicle_chain ((prevhash IS NULL)) WHERE prevhash IS NULL",
        )
        .await?;

        db.execute_unprepared(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_chronicle_replication_chain_genesis \
             ON chronicle_replication_chain (source) WHERE prevhash IS NULL",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP INDEX IF EXISTS idx_chronicle_replication_chain_genesis")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_chronicle_chain_genesis")
            .await?;
        Ok(())
    }
}
