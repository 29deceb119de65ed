//! the `targets` subcommand - manage cross-sign targets

use chronicle_chain::PublicKey;
use chronicle_db::Database;
use chronicle_types::{CrossSignPolicy, CrossSignTarget, TargetId};
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};

use super::ConfigArgs;

const MAX_PUSH_DAYS: u64 = 36_500;

/// manage cross-sign targets
#[derive(Subcommand, Debug)]
pub enum TargetsCommand {
    /// cross-sign onto another chronicle
    Add(AddTargetArgs),

    /// list cross-sign targets
    List(ListTargetsArgs),

    /// remove a cross-sign target
    Remove(RemoveTargetArgs),
}

/// cross-sign onto another chronicle
#[derive(Args, Debug)]
pub struct AddTargetArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// display name
    name: String,

    /// base url of the peer api, e.g. https://example.com/chronicle
    url: String,

    /// the peer's ed25519 public key (base64url)
    public_key: String,

    /// client id this instance is registered under at the peer
    #[arg(long)]
    client_id: Option<String>,

    /// push after this many new entries
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=i64::MAX as u64))]
    push_after: Option<u64>,

    /// push after this many days (at most 100 years)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_PUSH_DAYS))]
    push_days: Option<u64>,
}

/// list cross-sign targets
#[derive(Args, Debug)]
pub struct ListTargetsArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// remove a cross-sign target
#[derive(Args, Debug)]
pub struct RemoveTargetArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// target id
    id: u64,
}

impl TargetsCommand {
    /// run the targets command
    pub async fn run(self) -> Result<()> {
        match self {
            TargetsCommand::Add(args) => add_target(args).await,
            TargetsCommand::List(args) => list_targets(args).await,
            TargetsCommand::Remove(args) => remove_target(args).await,
        }
    }
}

async fn add_target(args: AddTargetArgs) -> Result<()> {
    PublicKey::from_base64(&args.public_key).map_err(|e| eyre!("invalid public key: {}", e))?;
    url::Url::parse(&args.url).with_context(|| format!("invalid url: {}", args.url))?;
    if args.push_after.is_none() && args.push_days.is_none() {
        bail!("a target needs --push-after or --push-days");
    }

    let (_, db) = args.config.connect().await?;
    let mut target = CrossSignTarget::new(
        args.name,
        args.url,
        args.public_key,
        CrossSignPolicy {
            push_after: args.push_after,
            push_days: args.push_days,
        },
    );
    target.client_id = args.client_id;

    let created = db
        .create_cross_sign_target(&target)
        .await
        .context("failed to create target")?;

    println!("Created cross-sign target:");
    println!("  ID:     {}", created.id);
    println!("  Name:   {}", created.name);
    println!("  URL:    {}", created.url);
    println!("  Policy: {}", serde_json::to_string(&created.policy)?);

    Ok(())
}

async fn list_targets(args: ListTargetsArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    let targets = db
        .list_cross_sign_targets()
        .await
        .context("failed to list targets")?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    if targets.is_empty() {
        println!("No cross-sign targets found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<30} {:<26} URL",
        "ID", "NAME", "POLICY", "LAST RUN"
    );
    println!("{}", "-".repeat(110));
    for target in targets {
        let last_run = target
            .last_run
            .as_ref()
            .map(|r| r.time.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<20} {:<30} {:<26} {}",
            target.id,
            target.name,
            serde_json::to_string(&target.policy)?,
            last_run,
            target.url
        );
    }

    Ok(())
}

async fn remove_target(args: RemoveTargetArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    let id = TargetId(args.id);
    if db
        .get_cross_sign_target(id)
        .await
        .context("failed to query target")?
        .is_none()
    {
        bail!("target {} not found", id);
    }

    db.delete_cross_sign_target(id)
        .await
        .context("failed to remove target")?;
    println!("Removed cross-sign target {}", id);
    Ok(())
}
