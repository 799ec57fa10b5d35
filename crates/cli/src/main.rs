//! Shoppy CLI - database migrations and pipeline inspection.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! shoppy-cli migrate
//!
//! # Show the active lexicon
//! shoppy-cli lexicon
//!
//! # Run cart-intent detection offline
//! shoppy-cli detect --user "I want 1 burgundy t-shirt"
//! shoppy-cli detect --user "ok" --assistant "I've added the Burgundy V-Neck Tee to your cart"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shoppy-cli")]
#[command(author, version, about = "Shoppy CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Print the lexicon version and list sizes
    Lexicon,
    /// Run intent detection and product extraction against text
    Detect {
        /// The shopper's message
        #[arg(short, long)]
        user: String,

        /// The assistant's reply
        #[arg(short, long, default_value = "")]
        assistant: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Lexicon => commands::inspect::lexicon(),
        Commands::Detect { user, assistant } => commands::inspect::detect(&user, &assistant)?,
    }
    Ok(())
}
