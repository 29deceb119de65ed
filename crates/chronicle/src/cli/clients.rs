//! the `clients` subcommand - manage publishing clients

use chronicle_chain::PublicKey;
use chronicle_db::Database;
use chronicle_types::Client;
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};

use super::ConfigArgs;
use crate::handlers::generate_client_id;

/// manage publishing clients
#[derive(Subcommand, Debug)]
pub enum ClientsCommand {
    /// register a client
    Create(CreateClientArgs),

    /// list clients
    List(ListClientsArgs),

    /// delete a client
    Delete(DeleteClientArgs),
}

/// register a client
#[derive(Args, Debug)]
pub struct CreateClientArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// the client's ed25519 public key (base64url)
    public_key: String,

    /// allow the client to register and revoke other clients
    #[arg(long, default_value_t = false)]
    admin: bool,

    /// free-form note
    #[arg(long, default_value = "")]
    comment: String,
}

/// list clients
#[derive(Args, Debug)]
pub struct ListClientsArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// delete a client
#[derive(Args, Debug)]
pub struct DeleteClientArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// public client id
    client_id: String,
}

impl ClientsCommand {
    /// run the clients command
    pub async fn run(self) -> Result<()> {
        match self {
            ClientsCommand::Create(args) => create_client(args).await,
            ClientsCommand::List(args) => list_clients(args).await,
            ClientsCommand::Delete(args) => delete_client(args).await,
        }
    }
}

async fn create_client(args: CreateClientArgs) -> Result<()> {
    PublicKey::from_base64(&args.public_key)
        .map_err(|e| eyre!("invalid public key: {}", e))?;

    let (_, db) = args.config.connect().await?;
    let client = Client::new(
        generate_client_id(),
        args.public_key,
        args.admin,
        args.comment,
    );
    let created = db
        .create_client(&client)
        .await
        .context("failed to create client")?;

    println!("Created client:");
    println!("  Client ID:  {}", created.public_id);
    println!("  Public key: {}", created.public_key);
    println!("  Admin:      {}", created.is_admin);

    Ok(())
}

async fn list_clients(args: ListClientsArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    let clients = db.list_clients().await.context("failed to list clients")?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }

    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    println!("{:<34} {:<46} {:<6} COMMENT", "CLIENT ID", "PUBLIC KEY", "ADMIN");
    println!("{}", "-".repeat(100));
    for client in clients {
        println!(
            "{:<34} {:<46} {:<6} {}",
            client.public_id,
            client.public_key,
            if client.is_admin { "yes" } else { "no" },
            client.comment,
        );
    }

    Ok(())
}

async fn delete_client(args: DeleteClientArgs) -> Result<()> {
    let (_, db) = args.config.connect().await?;
    if !db
        .delete_client(&args.client_id)
        .await
        .context("failed to delete client")?
    {
        bail!("client {} not found", args.client_id);
    }
    println!("Deleted client {}", args.client_id);
    Ok(())
}
