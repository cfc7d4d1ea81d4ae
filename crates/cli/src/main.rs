//! iPobre CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ipobre-cli migrate
//!
//! # Insert demo accounts, a store and its menu
//! ipobre-cli seed --password "demo-password-123"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed database with a demo marketplace

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ipobre-cli")]
#[command(author, version, about = "iPobre CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed {
        /// Password shared by the demo accounts
        #[arg(short, long, default_value = "ipobre-demo-2024")]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { password } => commands::seed::demo(&password).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seed_password() {
        let cli = Cli::try_parse_from(["ipobre-cli", "seed", "-p", "s3cret-pass"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Seed { ref password }) if password == "s3cret-pass"
        ));
    }
}
