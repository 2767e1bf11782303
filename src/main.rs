//! # Backup Audit Entry Point
//!
//! `serve` (the default) runs the API, `migrate` only applies pending
//! migrations and `create-user` registers a user and prints its API token.

use anyhow::{Context, Result};
use backup_audit::{
    config::ConfigLoader,
    db,
    repositories::UserRepository,
    server::run_server,
    telemetry::init_tracing,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "backup-audit", version, about = "Backup validation audit service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Create a user and print its API token
    CreateUser {
        #[arg(long)]
        username: String,
        /// Grant access to the administrative endpoints
        #[arg(long, default_value_t = false)]
        staff: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load().context("loading configuration")?;
    init_tracing(&config).context("initializing tracing")?;

    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Loaded configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config, db).await,
        Command::Migrate => {
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::CreateUser { username, staff } => {
            let (user, token) = UserRepository::new(&db)
                .create_user(&username, staff)
                .await
                .with_context(|| format!("creating user '{username}'"))?;

            println!("Created user '{}' (id {}, staff: {})", user.username, user.id, user.is_staff);
            println!("API token (shown once): {token}");
            Ok(())
        }
    }
}
