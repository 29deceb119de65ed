//! the `keygen` subcommand - create the server signing key

use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Context, Result};

use super::ConfigArgs;

/// create the server signing key if it does not exist, and print its public key
#[derive(Args, Debug)]
pub struct KeygenCommand {
    #[command(flatten)]
    config: ConfigArgs,

    /// path to the server signing key (overrides the config file)
    #[arg(long, env = "CHRONICLE_SIGNING_KEY")]
    signing_key_path: Option<PathBuf>,
}

impl KeygenCommand {
    /// run the keygen command
    pub async fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let path = self.signing_key_path.unwrap_or(config.signing_key_path);
        let existed = path.exists();

        let key = crate::load_or_generate_signing_key(&path)
            .await
            .with_context(|| format!("failed to load/generate signing key: {:?}", path))?;

        if existed {
            println!("Signing key already exists at {:?}", path);
        } else {
            println!("Created signing key at {:?}", path);
        }
        println!("Public key: {}", key.public_key());

        Ok(())
    }
}
