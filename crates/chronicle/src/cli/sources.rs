//! the `sources` subcommand - manage replication sources

use chronicle_chain::PublicKey;
use chronicle_db::Database;
use chronicle_types::{ReplicationSource, SourceId};
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};

use super::ConfigArgs;
use crate::handlers::generate_client_id;

/// manage replication sources
#[derive(Subcommand, Debug)]
pub enum SourcesCommand {
    /// mirror another chronicle
    Add(AddSourceArgs),

    /// list replication sources
    List(ListSourcesArgs),

    /// remove a source whose mirror is empty
    Remove(RemoveSourceArgs),

    /// replace the key a source signs its responses with
    SetKey(SetSourceKeyArgs),
}

/// mirror another chronicle
#[derive(Args, Debug)]
pub struct AddSourceArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// display name
    name: String,

    /// base url of the upstream api, e.g. https://example.com/chronicle
    url: String,

    /// the upstream's ed25519 public key (base64url)
    public_key: String,

    /// public id used in /replica routes (generated if omitted)
    #[arg(long)]
    unique_id: Option<String>,
}

/// list replication sources
#[derive(Args, Debug)]
pub struct ListSourcesArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// remove a replication source
#[derive(Args, Debug)]
pub struct RemoveSourceArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// source id
    id: u64,
}

/// replace a source's public key
#[derive(Args, Debug)]
pub struct SetSourceKeyArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// source id
    id: u64,

    /// the new ed25519 public key (base64url)
    public_key: String,
}

impl SourcesCommand {
    /// run the sources command
    pub async fn run(self) -> Result<()> {
        match self {
            SourcesCommand::Add(args) => add_source(args).await,
            SourcesCommand::List(args) => list_sources(args).await,
            SourcesCommand::Remove(args) => remove_source(args).await,
            SourcesCommand::SetKey(args) => set_source_key(args).await,
        }
    }
}

fn check_key(public_key: &str) -> Result<()> {
    PublicKey::from_base64(public_key).map_err(|e| eyre!("invalid public key: {}", e))?;
    Ok(())
}

fn check_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("invalid url: {}", url))?;
    Ok(())
}

async fn add_source(args: AddSourceArgs) -> Result<()> {
    check_key(&args.public_key)?;
    check_url(&args.url)?;

    let (_, db) = args.config.connect().await?;
    let unique_id = args.unique_id.unwrap_or_else(generate_client_id);
    if db
        .get_replication_source_by_unique_id(&unique_id)
        .await
        .context("failed to check for existing source")?
        .is_some()
    {
        bail!("source '{}' already exists", unique_id);
    }

    let created = db
        .create_replication_source(&ReplicationSource::new(
            unique_id,
            args.name,
            args.url,
            args.public_key,
        ))
        .await
        .context("failed to create source")?;

    println!("Created replication source:");
    println!("  ID:        {}", created.id);
    println!("  Unique ID: {}", created.unique_id);
    println!("  Name:      {}", created.name);
    println!("  URL:       {}", created.url);

    Ok(())
}

async fn list_sources(args: ListSourcesArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    let sources = db
        .list_replication_sources()
        .await
        .context("failed to list sources")?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("No replication sources found.");
        return Ok(());
    }

    println!("{:<6} {:<34} {:<20} URL", "ID", "UNIQUE ID", "NAME");
    println!("{}", "-".repeat(100));
    for source in sources {
        println!(
            "{:<6} {:<34} {:<20} {}",
            source.id, source.unique_id, source.name, source.url
        );
    }

    Ok(())
}

async fn remove_source(args: RemoveSourceArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    let id = SourceId(args.id);
    if db
        .get_replication_source(id)
        .await
        .context("failed to query source")?
        .is_none()
    {
        bail!("source {} not found", id);
    }

    db.delete_replication_source(id)
        .await
        .context("failed to remove source")?;
    println!("Removed replication source {}", id);
    Ok(())
}

async fn set_source_key(args: SetSourceKeyArgs) -> Result<()> {
    check_key(&args.public_key)?;

    let (_, db) = args.config.connect().await?;
    let id = SourceId(args.id);
    db.update_replication_source_key(id, &args.public_key)
        .await
        .context("failed to update source key")?;
    println!("Updated public key of replication source {}", id);
    Ok(())
}
