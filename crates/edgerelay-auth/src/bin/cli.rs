//! edgerelay-auth standalone binary.

use std::process::ExitCode;

use clap::Parser;
use edgerelay_auth::{AuthArgs, cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = AuthArgs::parse();

    match cli::run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
