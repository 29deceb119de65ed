//! chronicle - append-only, verifiable ledger server

use chronicle::cli::{Cli, Command};
use clap::Parser;
use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Keygen(cmd) => cmd.run().await,
        Command::Clients(cmd) => cmd.run().await,
        Command::Sources(cmd) => cmd.run().await,
        Command::Targets(cmd) => cmd.run().await,
        Command::RunTasks(cmd) => cmd.run().await,
        Command::Replicate(cmd) => cmd.run().await,
        Command::CrossSign(cmd) => cmd.run().await,
    }
}
