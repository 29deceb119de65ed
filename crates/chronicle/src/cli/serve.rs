//! the `serve` subcommand - runs the ledger server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chronicle_types::Config;
use clap::Args;
use color_eyre::eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use super::{ConfigArgs, init_logging, open_database};
use crate::LedgerContext;

/// run the chronicle server
#[derive(Args, Debug)]
pub struct ServeCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// address to listen on
    #[arg(long, env = "CHRONICLE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// path to the server signing key
    #[arg(long, env = "CHRONICLE_SIGNING_KEY")]
    signing_key_path: Option<PathBuf>,

    /// seconds between background scheduled cycles (0 disables)
    #[arg(long, env = "CHRONICLE_SCHEDULE_INTERVAL")]
    schedule_interval_secs: Option<u64>,

    /// log level
    #[arg(long, env = "CHRONICLE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ServeCommand {
    /// merge cli flags over the loaded configuration.
    fn into_config(self) -> Result<Config> {
        let mut config = self.config.load()?;

        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(path) = self.signing_key_path {
            config.signing_key_path = path;
        }
        if let Some(interval) = self.schedule_interval_secs {
            config.schedule_interval_secs = interval;
        }

        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        init_logging(self.log_level.as_deref())?;

        info!("Starting chronicle...");

        let config = self.into_config()?;
        info!("Database: {}", config.database.connection_string);
        info!("Listen address: {}", config.listen_addr);

        let db = open_database(&config.database).await?;
        info!("Database initialized successfully");

        info!("Loading signing key from {:?}", config.signing_key_path);
        let signing_key = crate::load_or_generate_signing_key(&config.signing_key_path)
            .await
            .with_context(|| {
                format!(
                    "failed to load/generate signing key: {:?}",
                    config.signing_key_path
                )
            })?;
        info!(public_key = %signing_key.public_key(), "Signing key loaded");

        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .context("invalid listen address")?;
        let interval = config.schedule_interval_secs;

        let ctx = LedgerContext::new(db, config, signing_key)
            .context("failed to set up ledger context")?;

        if interval > 0 {
            ctx.scheduled_tasks().spawn(Duration::from_secs(interval));
        }

        let app = crate::create_app(ctx);

        info!("Starting HTTP server on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await.context("server error")?;

        Ok(())
    }
}
