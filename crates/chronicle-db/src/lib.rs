//! database layer for chronicle.
//!
//! this crate provides persistent storage for:
//! - the primary chain
//! - per-source mirror chains
//! - replication sources and cross-sign targets
//! - registered clients
//! - scheduled task state
//!
//! chain rows are insert-only. the only way to add one is through a
//! [`ChainAppend`], which holds a transaction open from reading the current
//! head until the new row is committed.

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::{DateTime, Utc};
use chronicle_chain::ChainHash;
use chronicle_types::{
    ChainEntry, ChainScope, Client, CrossSignTarget, DatabaseConfig, LastRun, NewChainEntry,
    ReplicationSource, SourceId, TargetId,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, Database as SeaOrmDatabase,
    DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// database trait for chronicle storage operations.
///
/// this trait abstracts over different database backends (sqlite, postgresql).
/// chain reads take a [`ChainScope`] so the primary chain and every mirror
/// share one set of operations.
pub trait Database: Send + Sync {
    // ─── Health Check ─────────────────────────────────────────────────────────

    /// ping the database to verify connectivity.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // ─── Chain Operations ─────────────────────────────────────────────────────

    /// the row with the highest sequence, if the chain is not empty.
    fn latest_entry(
        &self,
        scope: ChainScope,
    ) -> impl Future<Output = Result<Option<ChainEntry>>> + Send;

    /// every row in sequence order.
    fn list_entries(&self, scope: ChainScope)
    -> impl Future<Output = Result<Vec<ChainEntry>>> + Send;

    /// rows whose `currhash` or `summaryhash` equals `hash`.
    fn find_entries_by_hash(
        &self,
        scope: ChainScope,
        hash: &ChainHash,
    ) -> impl Future<Output = Result<Vec<ChainEntry>>> + Send;

    /// rows after the first row whose `currhash` or `summaryhash` equals
    /// `hash`. returns `None` if no row matches.
    fn entries_since(
        &self,
        scope: ChainScope,
        hash: &ChainHash,
    ) -> impl Future<Output = Result<Option<Vec<ChainEntry>>>> + Send;

    /// number of rows.
    fn count_entries(&self, scope: ChainScope) -> impl Future<Output = Result<u64>> + Send;

    /// open a transaction positioned at the current head of the chain.
    ///
    /// the last row is read with an exclusive lock where the backend
    /// supports it. the returned handle must be committed or rolled back;
    /// dropping it rolls back.
    fn begin_append(&self, scope: ChainScope) -> impl Future<Output = Result<ChainAppend>> + Send;

    // ─── Replication Source Operations ────────────────────────────────────────

    /// create a replication source. returns it with its assigned id.
    fn create_replication_source(
        &self,
        source: &ReplicationSource,
    ) -> impl Future<Output = Result<ReplicationSource>> + Send;

    /// get a replication source by id.
    fn get_replication_source(
        &self,
        id: SourceId,
    ) -> impl Future<Output = Result<Option<ReplicationSource>>> + Send;

    /// get a replication source by its public unique id.
    fn get_replication_source_by_unique_id(
        &self,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<ReplicationSource>>> + Send;

    /// list all replication sources.
    fn list_replication_sources(&self)
    -> impl Future<Output = Result<Vec<ReplicationSource>>> + Send;

    /// replace the public key a source's responses are verified with.
    fn update_replication_source_key(
        &self,
        id: SourceId,
        public_key: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// delete a replication source. fails if its mirror has any rows.
    fn delete_replication_source(&self, id: SourceId) -> impl Future<Output = Result<()>> + Send;

    // ─── Cross-Sign Target Operations ─────────────────────────────────────────

    /// create a cross-sign target. returns it with its assigned id.
    fn create_cross_sign_target(
        &self,
        target: &CrossSignTarget,
    ) -> impl Future<Output = Result<CrossSignTarget>> + Send;

    /// get a cross-sign target by id.
    fn get_cross_sign_target(
        &self,
        id: TargetId,
    ) -> impl Future<Output = Result<Option<CrossSignTarget>>> + Send;

    /// list all cross-sign targets.
    fn list_cross_sign_targets(&self)
    -> impl Future<Output = Result<Vec<CrossSignTarget>>> + Send;

    /// record a successful push.
    fn set_cross_sign_last_run(
        &self,
        id: TargetId,
        last_run: &LastRun,
    ) -> impl Future<Output = Result<()>> + Send;

    /// delete a cross-sign target.
    fn delete_cross_sign_target(&self, id: TargetId) -> impl Future<Output = Result<()>> + Send;

    // ─── Client Operations ────────────────────────────────────────────────────

    /// register a client. returns it with its assigned id.
    fn create_client(&self, client: &Client) -> impl Future<Output = Result<Client>> + Send;

    /// get a client by the id it sends in request headers.
    fn get_client_by_public_id(
        &self,
        public_id: &str,
    ) -> impl Future<Output = Result<Option<Client>>> + Send;

    /// list all clients.
    fn list_clients(&self) -> impl Future<Output = Result<Vec<Client>>> + Send;

    /// delete a client. returns whether a row was removed.
    fn delete_client(&self, public_id: &str) -> impl Future<Output = Result<bool>> + Send;

    // ─── Schedule State ───────────────────────────────────────────────────────

    /// when the last self-attestation was appended.
    fn get_last_attestation(&self) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;

    /// record the time of a self-attestation.
    fn set_last_attestation(&self, at: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send;
}

/// an open append transaction positioned after the chain head.
///
/// no other database call should be made while this is held: on a
/// single-connection pool it would wait for this transaction forever.
pub struct ChainAppend {
    txn: DatabaseTransaction,
    scope: ChainScope,
    last: Option<ChainEntry>,
}

impl ChainAppend {
    /// which chain this transaction appends to.
    pub fn scope(&self) -> ChainScope {
        self.scope
    }

    /// the current head, `None` if the chain is empty.
    pub fn last(&self) -> Option<&ChainEntry> {
        self.last.as_ref()
    }

    /// insert `entry` and commit. on failure the transaction is rolled back.
    pub async fn commit(self, entry: NewChainEntry) -> Result<ChainEntry> {
        let ChainAppend { txn, scope, .. } = self;

        let inserted: Result<ChainEntry> = match scope {
            ChainScope::Primary => {
                let model: entity::chain::ActiveModel = (&entry).into();
                match model.insert(&txn).await {
                    Ok(row) => ChainEntry::try_from(row),
                    Err(e) => Err(e.into()),
                }
            }
            ChainScope::Mirror(source) => {
                let model = entity::replication_chain::active_model(source, &entry);
                match model.insert(&txn).await {
                    Ok(row) => ChainEntry::try_from(row),
                    Err(e) => Err(e.into()),
                }
            }
        };

        match inserted {
            Ok(row) => {
                txn.commit().await?;
                Ok(row)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    tracing::warn!(
                        %scope,
                        error = %rollback,
                        "rollback after failed append failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// abandon the append.
    pub async fn rollback(self) -> Result<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

/// database implementation using sea-orm.
#[derive(Clone)]
pub struct ChronicleDb {
    conn: DatabaseConnection,
}

impl ChronicleDb {
    /// create a new database connection from config and run migrations.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = Self::build_connection_url(config)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };

        // enable WAL mode for sqlite if configured
        if config.db_type == "sqlite" && config.sqlite.write_ahead_log {
            db.enable_wal_mode().await?;
        }

        db.migrate().await?;
        Ok(db)
    }

    /// enable write-ahead logging mode for sqlite.
    async fn enable_wal_mode(&self) -> Result<()> {
        self.conn
            .execute_unprepared("PRAGMA journal_mode=WAL")
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL mode: {}", e)))?;
        tracing::info!("sqlite WAL mode enabled");
        Ok(())
    }

    /// get the current sqlite journal mode.
    #[cfg(test)]
    async fn get_journal_mode(&self) -> Result<String> {
        let row = self
            .conn
            .query_one(sea_orm::Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "PRAGMA journal_mode".to_string(),
            ))
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        match row {
            Some(row) => Ok(row.try_get::<String>("", "journal_mode")?),
            None => Ok(String::new()),
        }
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &DatabaseConfig) -> Result<String> {
        match config.db_type.as_str() {
            "sqlite" => {
                let path = if config.connection_string.starts_with("sqlite:") {
                    config.connection_string.clone()
                } else {
                    format!("sqlite:{}", config.connection_string)
                };
                // add ?mode=rwc to create file if it doesn't exist
                if path.contains('?') {
                    Ok(path)
                } else {
                    Ok(format!("{}?mode=rwc", path))
                }
            }
            "postgres" | "postgresql" => Ok(config.connection_string.clone()),
            other => Err(Error::InvalidData(format!(
                "unsupported database type: {}",
                other
            ))),
        }
    }

    /// create an in-memory sqlite database for testing.
    pub async fn new_in_memory() -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }

    /// the underlying connection, for maintenance statements.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}

fn hash_matches<C: ColumnTrait>(curr: C, summary: C, hash: &ChainHash) -> Condition {
    let encoded = hash.to_base64();
    Condition::any()
        .add(curr.eq(encoded.clone()))
        .add(summary.eq(encoded))
}

fn into_entries<M>(rows: Vec<M>) -> Result<Vec<ChainEntry>>
where
    ChainEntry: TryFrom<M, Error = Error>,
{
    rows.into_iter().map(ChainEntry::try_from).collect()
}

impl Database for ChronicleDb {
    // health check

    async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // chain operations

    async fn latest_entry(&self, scope: ChainScope) -> Result<Option<ChainEntry>> {
        use entity::{chain, replication_chain};

        match scope {
            ChainScope::Primary => chain::Entity::find()
                .order_by_desc(chain::Column::Id)
                .one(&self.conn)
                .await?
                .map(ChainEntry::try_from)
                .transpose(),
            ChainScope::Mirror(source) => replication_chain::Entity::find()
                .filter(replication_chain::Column::Source.eq(source.0 as i64))
                .order_by_desc(replication_chain::Column::Id)
                .one(&self.conn)
                .await?
                .map(ChainEntry::try_from)
                .transpose(),
        }
    }

    async fn list_entries(&self, scope: ChainScope) -> Result<Vec<ChainEntry>> {
        use entity::{chain, replication_chain};

        match scope {
            ChainScope::Primary => into_entries(
                chain::Entity::find()
                    .order_by_asc(chain::Column::Id)
                    .all(&self.conn)
                    .await?,
            ),
            ChainScope::Mirror(source) => into_entries(
                replication_chain::Entity::find()
                    .filter(replication_chain::Column::Source.eq(source.0 as i64))
                    .order_by_asc(replication_chain::Column::Id)
                    .all(&self.conn)
                    .await?,
            ),
        }
    }

    async fn find_entries_by_hash(
        &self,
        scope: ChainScope,
        hash: &ChainHash,
    ) -> Result<Vec<ChainEntry>> {
        use entity::{chain, replication_chain};

        match scope {
            ChainScope::Primary => into_entries(
                chain::Entity::find()
                    .filter(hash_matches(
                        chain::Column::Currhash,
                        chain::Column::Summaryhash,
                        hash,
                    ))
                    .order_by_asc(chain::Column::Id)
                    .all(&self.conn)
                    .await?,
            ),
            ChainScope::Mirror(source) => into_entries(
                replication_chain::Entity::find()
                    .filter(replication_chain::Column::Source.eq(source.0 as i64))
                    .filter(hash_matches(
                        replication_chain::Column::Currhash,
                        replication_chain::Column::Summaryhash,
                        hash,
                    ))
                    .order_by_asc(replication_chain::Column::Id)
                    .all(&self.conn)
                    .await?,
            ),
        }
    }

    async fn entries_since(
        &self,
        scope: ChainScope,
        hash: &ChainHash,
    ) -> Result<Option<Vec<ChainEntry>>> {
        use entity::{chain, replication_chain};

        match scope {
            ChainScope::Primary => {
                let anchor = chain::Entity::find()
                    .filter(hash_matches(
                        chain::Column::Currhash,
                        chain::Column::Summaryhash,
                        hash,
                    ))
                    .order_by_asc(chain::Column::Id)
                    .one(&self.conn)
                    .await?;
                let Some(anchor) = anchor else {
                    return Ok(None);
                };
                let rows = chain::Entity::find()
                    .filter(chain::Column::Id.gt(anchor.id))
                    .order_by_asc(chain::Column::Id)
                    .all(&self.conn)
                    .await?;
                into_entries(rows).map(Some)
            }
            ChainScope::Mirror(source) => {
                let anchor = replication_chain::Entity::find()
                    .filter(replication_chain::Column::Source.eq(source.0 as i64))
                    .filter(hash_matches(
                        replication_chain::Column::Currhash,
                        replication_chain::Column::Summaryhash,
                        hash,
                    ))
                    .order_by_asc(replication_chain::Column::Id)
                    .one(&self.conn)
                    .await?;
                let Some(anchor) = anchor else {
                    return Ok(None);
                };
                let rows = replication_chain::Entity::find()
                    .filter(replication_chain::Column::Source.eq(source.0 as i64))
                    .filter(replication_chain::Column::Id.gt(anchor.id))
                    .order_by_asc(replication_chain::Column::Id)
                    .all(&self.conn)
                    .await?;
                into_entries(rows).map(Some)
            }
        }
    }

    async fn count_entries(&self, scope: ChainScope) -> Result<u64> {
        use entity::{chain, replication_chain};

        let count = match scope {
            ChainScope::Primary => chain::Entity::find().count(&self.conn).await?,
            ChainScope::Mirror(source) => {
                replication_chain::Entity::find()
                    .filter(replication_chain::Column::Source.eq(source.0 as i64))
                    .count(&self.conn)
                    .await?
            }
        };
        Ok(count)
    }

    async fn begin_append(&self, scope: ChainScope) -> Result<ChainAppend> {
        use entity::{chain, replication_chain};

        let txn = self.conn.begin().await?;

        // sqlite only takes the write lock on the first write. taking it
        // before reading the head makes a concurrent appender wait for the
        // busy timeout instead of failing at commit with a stale snapshot.
        if txn.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            let claim = match scope {
                ChainScope::Primary => "UPDATE chronicle_chain SET id = id WHERE 0",
                ChainScope::Mirror(_) => "UPDATE chronicle_replication_chain SET id = id WHERE 0",
            };
            txn.execute_unprepared(claim).await?;
        }

        let last = match scope {
            ChainScope::Primary => chain::Entity::find()
                .order_by_desc(chain::Column::Id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .map(ChainEntry::try_from)
                .transpose()?,
            ChainScope::Mirror(source) => replication_chain::Entity::find()
                .filter(replication_chain::Column::Source.eq(source.0 as i64))
                .order_by_desc(replication_chain::Column::Id)
                .lock_exclusive()
                .one(&txn)
                .await?
                .map(ChainEntry::try_from)
                .transpose()?,
        };

        Ok(ChainAppend { txn, scope, last })
    }

    // replication source operations

    async fn create_replication_source(
        &self,
        source: &ReplicationSource,
    ) -> Result<ReplicationSource> {
        let model: entity::replication_source::ActiveModel = source.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_replication_source(&self, id: SourceId) -> Result<Option<ReplicationSource>> {
        let result = entity::replication_source::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn get_replication_source_by_unique_id(
        &self,
        unique_id: &str,
    ) -> Result<Option<ReplicationSource>> {
        let result = entity::replication_source::Entity::find()
            .filter(entity::replication_source::Column::Uniqueid.eq(unique_id))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_replication_sources(&self) -> Result<Vec<ReplicationSource>> {
        let results = entity::replication_source::Entity::find()
            .order_by_asc(entity::replication_source::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_replication_source_key(&self, id: SourceId, public_key: &str) -> Result<()> {
        let result = entity::replication_source::Entity::update_many()
            .col_expr(
                entity::replication_source::Column::Publickey,
                sea_orm::sea_query::Expr::value(public_key),
            )
            .filter(entity::replication_source::Column::Id.eq(id.0 as i64))
            .exec(&self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::InvalidData(format!(
                "replication source {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn delete_replication_source(&self, id: SourceId) -> Result<()> {
        let mirrored = self.count_entries(ChainScope::Mirror(id)).await?;
        if mirrored > 0 {
            return Err(Error::InvalidData(format!(
                "replication source {} has {} mirrored entries",
                id, mirrored
            )));
        }
        entity::replication_source::Entity::delete_by_id(id.0 as i64)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // cross-sign target operations

    async fn create_cross_sign_target(&self, target: &CrossSignTarget) -> Result<CrossSignTarget> {
        let model = entity::xsign_target::ActiveModel::try_from(target)?;
        let result = model.insert(&self.conn).await?;
        CrossSignTarget::try_from(result)
    }

    async fn get_cross_sign_target(&self, id: TargetId) -> Result<Option<CrossSignTarget>> {
        entity::xsign_target::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?
            .map(CrossSignTarget::try_from)
            .transpose()
    }

    async fn list_cross_sign_targets(&self) -> Result<Vec<CrossSignTarget>> {
        entity::xsign_target::Entity::find()
            .order_by_asc(entity::xsign_target::Column::Id)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(CrossSignTarget::try_from)
            .collect()
    }

    async fn set_cross_sign_last_run(&self, id: TargetId, last_run: &LastRun) -> Result<()> {
        let json = serde_json::to_string(last_run)?;
        let result = entity::xsign_target::Entity::update_many()
            .col_expr(
                entity::xsign_target::Column::Lastrun,
                sea_orm::sea_query::Expr::value(json),
            )
            .filter(entity::xsign_target::Column::Id.eq(id.0 as i64))
            .exec(&self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::InvalidData(format!(
                "cross-sign target {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn delete_cross_sign_target(&self, id: TargetId) -> Result<()> {
        entity::xsign_target::Entity::delete_by_id(id.0 as i64)
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // client operations

    async fn create_client(&self, client: &Client) -> Result<Client> {
        let model: entity::client::ActiveModel = client.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_client_by_public_id(&self, public_id: &str) -> Result<Option<Client>> {
        let result = entity::client::Entity::find()
            .filter(entity::client::Column::Publicid.eq(public_id))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let results = entity::client::Entity::find()
            .order_by_asc(entity::client::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn delete_client(&self, public_id: &str) -> Result<bool> {
        let result = entity::client::Entity::delete_many()
            .filter(entity::client::Column::Publicid.eq(public_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    // schedule state

    async fn get_last_attestation(&self) -> Result<Option<DateTime<Utc>>> {
        let result = entity::schedule_state::Entity::find_by_id(1i64)
            .one(&self.conn)
            .await?;
        Ok(result.and_then(|state| state.last_attestation))
    }

    async fn set_last_attestation(&self, at: DateTime<Utc>) -> Result<()> {
        let existing = entity::schedule_state::Entity::find_by_id(1i64)
            .one(&self.conn)
            .await?;

        let model = entity::schedule_state::ActiveModel {
            id: Set(1), // single row
            last_attestation: Set(Some(at)),
            updated_at: Set(Utc::now()),
        };

        if existing.is_some() {
            model.update(&self.conn).await?;
        } else {
            model.insert(&self.conn).await?;
        }
        Ok(())
    }
}
