//! Leavedesk CLI - Database migrations and local webhook tooling.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! leavedesk-cli migrate
//!
//! # Sign a request body for a local webhook test
//! leavedesk-cli sign --body 'command=%2Fleave&user_id=U1&channel_id=C1&trigger_id=T1'
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sign` - Print Slack signature headers for a request body

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "leavedesk-cli")]
#[command(author, version, about = "Leavedesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print Slack signature headers for a request body
    Sign {
        /// Raw request body, exactly as it will be sent
        #[arg(short, long)]
        body: String,

        /// Unix timestamp to sign with (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,
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
        Commands::Sign { body, timestamp } => {
            let headers = commands::sign::sign_body(&body, timestamp)?;
            #[allow(clippy::print_stdout)]
            {
                println!("{headers}");
            }
        }
    }
    Ok(())
}
