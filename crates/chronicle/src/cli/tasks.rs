//! the `run-tasks`, `replicate` and `cross-sign` subcommands

use chronicle_types::{SourceId, TargetId};
use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tracing::{info, warn};

use super::{ConfigArgs, init_logging, load_config_file, open_database};
use crate::LedgerContext;

async fn context(config: &ConfigArgs) -> Result<LedgerContext> {
    let (config, db) = config.connect().await?;
    let signing_key = crate::load_or_generate_signing_key(&config.signing_key_path)
        .await
        .with_context(|| format!("failed to load signing key: {:?}", config.signing_key_path))?;
    LedgerContext::new(db, config, signing_key).context("failed to set up ledger context")
}

/// run one scheduled cycle: cross-signs, replication, attestation
#[derive(Args, Debug)]
pub struct RunTasksCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// log level
    #[arg(long, env = "CHRONICLE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl RunTasksCommand {
    /// run the cycle for the selected instance, or for every configured
    /// instance if none was named
    pub async fn run(self) -> Result<()> {
        init_logging(self.log_level.as_deref())?;

        if self.config.instance.is_some() || self.config.database_url.is_some() {
            let ctx = context(&self.config).await?;
            let report = ctx.scheduled_tasks().run_once().await;
            info!(?report, "scheduled cycle completed");
            return Ok(());
        }

        let base = load_config_file(self.config.config.as_ref())?.unwrap_or_default();
        let mut failed = 0;
        for (name, config) in base.all_instances() {
            let instance = name.as_deref().unwrap_or("default");
            let db = match open_database(&config.database).await {
                Ok(db) => db,
                Err(e) => {
                    failed += 1;
                    warn!(instance, error = %e, "failed to open instance database");
                    continue;
                }
            };
            let signing_key = crate::load_or_generate_signing_key(&config.signing_key_path)
                .await
                .with_context(|| {
                    format!("failed to load signing key: {:?}", config.signing_key_path)
                })?;
            let ctx = LedgerContext::new(db, config, signing_key)
                .context("failed to set up ledger context")?;

            let report = ctx.scheduled_tasks().run_once().await;
            info!(instance, ?report, "scheduled cycle completed");
        }

        if failed > 0 {
            bail!("{} instance(s) could not be opened", failed);
        }
        Ok(())
    }
}

/// pull one replication source now
#[derive(Args, Debug)]
pub struct ReplicateCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// source id
    id: u64,

    /// log level
    #[arg(long, env = "CHRONICLE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ReplicateCommand {
    /// run the replicate command
    pub async fn run(self) -> Result<()> {
        init_logging(self.log_level.as_deref())?;

        let ctx = context(&self.config).await?;
        let appended = ctx
            .replica_sync()
            .pull_by_id(SourceId(self.id))
            .await
            .with_context(|| format!("failed to replicate source {}", self.id))?;
        println!("Replicated {} new entries from source {}", appended, self.id);
        Ok(())
    }
}

/// push to one cross-sign target now
#[derive(Args, Debug)]
pub struct CrossSignCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// target id
    id: u64,

    /// push even if the target's policy says it is not due
    #[arg(long, default_value_t = false)]
    force: bool,

    /// log level
    #[arg(long, env = "CHRONICLE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl CrossSignCommand {
    /// run the cross-sign command
    pub async fn run(self) -> Result<()> {
        init_logging(self.log_level.as_deref())?;

        let ctx = context(&self.config).await?;
        let scheduler = ctx.cross_signer();
        let id = TargetId(self.id);
        let pushed = if self.force {
            scheduler.force(id).await
        } else {
            scheduler.run(id).await
        }
        .with_context(|| format!("failed to cross-sign to target {}", self.id))?;

        if pushed {
            println!("Cross-signed to target {}", self.id);
        } else {
            println!("Nothing to do for target {}", self.id);
        }
        Ok(())
    }
}
