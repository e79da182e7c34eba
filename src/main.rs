//! Unified edgerelay CLI.
//!
//! - `edgerelay server` - Run the relay server
//! - `edgerelay auth` - Inspect token documents and mint identities
//!
//! Each subcommand can also be run as a standalone binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// edgerelay unified CLI.
#[derive(Parser)]
#[command(
    name = "edgerelay",
    version,
    about = "WebSocket tunnel relay",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server.
    #[command(name = "server", alias = "serve")]
    Server(Box<edgerelay_server::ServerArgs>),

    /// Inspect token documents.
    #[command(name = "auth")]
    Auth(edgerelay_auth::AuthArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => edgerelay_server::cli::run(*args).await.map(|()| true),
        Commands::Auth(args) => edgerelay_auth::cli::run(args).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
