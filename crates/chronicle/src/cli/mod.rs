//! cli subcommands for chronicle.
//!
//! - `chronicle serve` - run the ledger server
//! - `chronicle keygen` - create the server signing key
//! - `chronicle clients create` - register a publishing client
//! - `chronicle sources add` - mirror another chronicle
//! - `chronicle targets add` - cross-sign onto another chronicle
//! - `chronicle run-tasks` - run the scheduled cycle once
//! - etc.

mod clients;
mod keygen;
pub mod serve;
mod sources;
mod targets;
mod tasks;

pub use clients::ClientsCommand;
pub use keygen::KeygenCommand;
pub use serve::ServeCommand;
pub use sources::SourcesCommand;
pub use targets::TargetsCommand;
pub use tasks::{CrossSignCommand, ReplicateCommand, RunTasksCommand};

use std::path::PathBuf;

use chronicle_db::{ChronicleDb, Database};
use chronicle_types::{Config, DatabaseConfig};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

/// chronicle - append-only, verifiable ledger
#[derive(Parser, Debug)]
#[command(name = "chronicle")]
#[command(about = "Append-only, verifiable ledger server", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the ledger server
    Serve(ServeCommand),

    /// create the server signing key if it does not exist
    Keygen(KeygenCommand),

    /// manage publishing clients
    #[command(subcommand)]
    Clients(ClientsCommand),

    /// manage replication sources
    #[command(subcommand)]
    Sources(SourcesCommand),

    /// manage cross-sign targets
    #[command(subcommand)]
    Targets(TargetsCommand),

    /// run one scheduled cycle for every instance
    RunTasks(RunTasksCommand),

    /// pull one replication source now
    Replicate(ReplicateCommand),

    /// push to one cross-sign target now
    CrossSign(CrossSignCommand),
}

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &[
    "/etc/chronicle/config.toml",
    "~/.config/chronicle/config.toml",
    "./config.toml",
];

fn read_config(path: &PathBuf) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config file: {:?}", path))
}

/// find and load config file, returning none if no config file is found.
fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
    // if explicit path provided, it must exist
    if let Some(path) = config_path {
        return read_config(path).map(Some);
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = expand_tilde::expand_tilde(path_str)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| PathBuf::from(path_str));
        if path.exists() {
            debug!("Found config file at {:?}", path);
            return read_config(&path).map(Some);
        }
    }

    Ok(None)
}

/// parse a database url into databaseconfig.
fn parse_database_url(db_url: &str) -> Result<DatabaseConfig> {
    let parsed =
        url::Url::parse(db_url).with_context(|| format!("invalid database URL: {}", db_url))?;

    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(DatabaseConfig {
            db_type: "postgres".to_string(),
            connection_string: db_url.to_string(),
            ..Default::default()
        }),
        "sqlite" => Ok(DatabaseConfig {
            db_type: "sqlite".to_string(),
            connection_string: parsed.path().to_string(),
            ..Default::default()
        }),
        scheme => bail!(
            "unsupported database scheme '{}', expected 'sqlite' or 'postgres'",
            scheme
        ),
    }
}

/// install the global tracing subscriber.
fn init_logging(log_level: Option<&str>) -> Result<()> {
    let log_level = match log_level.unwrap_or("info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// config and database selection shared by every command.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// path to config file (toml format)
    #[arg(short, long, env = "CHRONICLE_CONFIG")]
    config: Option<PathBuf>,

    /// database url (sqlite:// or postgres://)
    #[arg(long, env = "CHRONICLE_DATABASE_URL")]
    database_url: Option<String>,

    /// named instance from the config file
    #[arg(long, env = "CHRONICLE_INSTANCE")]
    instance: Option<String>,
}

impl ConfigArgs {
    /// load the configuration.
    ///
    /// priority order: defaults -> config file -> cli flags
    pub fn load(&self) -> Result<Config> {
        let config = match load_config_file(self.config.as_ref())? {
            Some(file_config) => file_config,
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };

        let mut config = config
            .for_instance(self.instance.as_deref())
            .context("failed to select instance")?;

        if let Some(db_url) = &self.database_url {
            config.database = parse_database_url(db_url)?;
        }

        Ok(config)
    }

    /// load the configuration and open its database.
    pub async fn connect(&self) -> Result<(Config, ChronicleDb)> {
        let config = self.load()?;
        let db = open_database(&config.database).await?;
        Ok((config, db))
    }
}

/// open a database, creating the parent directory of a sqlite file.
async fn open_database(database: &DatabaseConfig) -> Result<ChronicleDb> {
    if database.db_type == "sqlite" {
        let db_path = std::path::Path::new(&database.connection_string);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            debug!("Creating database directory: {:?}", parent);
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory: {:?}", parent))?;
        }
    }

    let db = ChronicleDb::new(database)
        .await
        .context("failed to initialize database")?;
    db.ping().await.context("database is not reachable")?;
    Ok(db)
}
