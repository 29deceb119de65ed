//! database migrations for chronicle.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_chain;
mod m20260301_000002_create_replication_sources;
mod m20260301_000003_create_replication_chain;
mod m20260301_000004_create_xsign_targets;
mod m20260301_000005_create_clients;
mod m20260302_000006_create_schedule_state;
mod m20260304_000007_unique_genesis;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_chain::Migration),
            Box::new(m20260301_000002_create_replication_sources::Migration),
            Box::new(m20260301_000003_create_replication_chain::Migration),
            Box::new(m20260301_000004_create_xsign_targets::Migration),
            Box::new(m20260301_000005_create_clients::Migration),
            Box::new(m20260302_000006_create_schedule_state::Migration),
            Box::new(m20260304_000007_unique_genesis::Migration),
        ]
    }
}
