//! Shopkeep CLI - Database migrations and tenant inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sk-cli migrate
//!
//! # Show how a request would be resolved
//! sk-cli resolve --host acme.shopkeep.in --path /checkout
//!
//! # ...and which store it lands on
//! sk-cli resolve --host shopkeep.in --path /acme --lookup
//!
//! # Show a tenant's subscription status and channel usage
//! sk-cli usage acme
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sk-cli")]
#[command(author, version, about = "Shopkeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Show the tenant candidates for a host and path
    Resolve {
        /// Request host, as sent in the Host header
        #[arg(long)]
        host: String,

        /// Request path
        #[arg(long, default_value = "/")]
        path: String,

        /// Also look the candidates up in the database
        #[arg(long)]
        lookup: bool,
    },
    /// Show a tenant's subscription status and channel usage
    Usage {
        /// Custom domain, subdomain, or slug
        identifier: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Resolve { host, path, lookup } => {
            commands::resolve::run(&host, &path, lookup).await?;
        }
        Commands::Usage { identifier } => commands::usage::run(&identifier).await?,
    }
    Ok(())
}
