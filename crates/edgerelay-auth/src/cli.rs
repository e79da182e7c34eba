//! CLI module for edgerelay-auth.
//!
//! Inspects token documents and mints new identities. Usable as a standalone
//! binary or as the `auth` subcommand of the main `edgerelay` CLI.
//!
//! # Usage
//!
//! ```bash
//! # Mint a new identity for the binary protocol
//! edgerelay-auth generate
//!
//! # Check one token against a local document
//! edgerelay-auth check -f tokens.json 550e8400-e29b-41d4-a716-446655440000
//!
//! # List every token of a remote document
//! edgerelay-auth list -u https://github.com/acme/relay/blob/main/token.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::document::TokenDocument;
use crate::http::{RemoteDirectory, RemoteOptions};
use crate::memory::read_document;
use crate::result::TokenStatus;

/// Token directory management CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "edgerelay-auth",
    version,
    about = "Inspect edgerelay token documents"
)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Where to read the token document from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Local JSON token document.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Remote token document URL (GitHub page URLs are accepted).
    #[arg(short, long, env = "EDGERELAY_TOKEN_URL", conflicts_with = "file")]
    pub url: Option<String>,

    /// GitHub token for private repositories.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Auth CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommands {
    /// Print new random identities in canonical form.
    Generate {
        /// How many identities to print.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Resolve one token. Exits non-zero unless it is valid.
    Check {
        #[command(flatten)]
        source: SourceArgs,

        /// Token to resolve.
        token: String,

        /// Resolve as of this RFC 3339 instant instead of now.
        #[arg(long)]
        at: Option<String>,
    },

    /// List all tokens with their current status.
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (table, json).
        #[arg(long, default_value = "table")]
        format: String,
    },
}

/// Token row for display.
#[derive(Tabled)]
struct TokenDisplay {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Expires")]
    expire: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Remark")]
    remark: String,
}

/// Run the auth CLI with the given arguments.
///
/// Returns `Ok(false)` when `check` finds the token not valid.
pub async fn run(args: AuthArgs) -> Result<bool, Box<dyn std::error::Error>> {
    match args.command {
        AuthCommands::Generate { count } => {
            for _ in 0..count {
                println!("{}", uuid::Uuid::new_v4().hyphenated());
            }
            Ok(true)
        }
        AuthCommands::Check { source, token, at } => {
            let now = match at {
                Some(raw) => OffsetDateTime::parse(&raw, &Rfc3339)?,
                None => OffsetDateTime::now_utc(),
            };
            let document = load(&source).await?;
            let resolution = document.resolve(&token, now);
            match resolution.expires_at {
                Some(at) => println!("{} (expires {})", resolution.status, at.format(&Rfc3339)?),
                None => println!("{}", resolution.status),
            }
            Ok(resolution.is_valid())
        }
        AuthCommands::List { source, format } => {
            let document = load(&source).await?;
            print_list(&document, &format, OffsetDateTime::now_utc())?;
            Ok(true)
        }
    }
}

async fn load(source: &SourceArgs) -> Result<Arc<TokenDocument>, Box<dyn std::error::Error>> {
    if let Some(path) = &source.file {
        return Ok(Arc::new(read_document(path)?));
    }
    let Some(url) = &source.url else {
        return Err("either --file or --url is required".into());
    };
    let mut options = RemoteOptions::new(url.clone());
    options.github_token = source.github_token.clone();
    let remote = RemoteDirectory::new(options, TokenDocument::default())?;
    // Fetch directly so a failing remote is reported instead of masked.
    Ok(Arc::new(remote.fetch().await?))
}

fn print_list(
    document: &TokenDocument,
    format: &str,
    now: OffsetDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => {
            let rows: Vec<_> = document
                .tokens
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "token": row.token,
                        "expire": row.expire,
                        "remark": row.remark,
                        "status": row.status_at(now).0.as_str(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "table" => {
            if document.tokens.is_empty() {
                println!("No tokens.");
                return Ok(());
            }
            let rows: Vec<TokenDisplay> = document
                .tokens
                .iter()
                .map(|row| TokenDisplay {
                    token: row.token.clone(),
                    expire: row
                        .expire
                        .clone()
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| "never".into()),
                    status: status_label(row.status_at(now).0).into(),
                    remark: row.remark.clone().unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        other => return Err(format!("unknown format: {other} (expected table or json)").into()),
    }
    Ok(())
}

fn status_label(status: TokenStatus) -> &'static str {
    match status {
        TokenStatus::Valid => "valid",
        TokenStatus::Expired => "EXPIRED",
        TokenStatus::NotFound => "-",
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(args: &[&str]) -> AuthArgs {
        AuthArgs::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn source_is_required() {
        assert!(
            AuthArgs::try_parse_from(["edgerelay-auth", "list", "-f", "a.json", "-u", "http://x"])
                .is_err()
        );
        let args = AuthArgs {
            command: AuthCommands::List {
                source: SourceArgs {
                    file: None,
                    url: None,
                    github_token: None,
                },
                format: "table".into(),
            },
        };
        assert!(run(args).await.is_err());
    }

    #[tokio::test]
    async fn check_reports_validity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tokens":[{{"token":"ok"}},{{"token":"old","expire":"2000-01-01T00:00:00Z"}}]}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        assert!(run(parse(&["edgerelay-auth", "check", "-f", path, "ok"])).await.unwrap());
        assert!(!run(parse(&["edgerelay-auth", "check", "-f", path, "old"])).await.unwrap());
        assert!(!run(parse(&["edgerelay-auth", "check", "-f", path, "nobody"])).await.unwrap());
        assert!(
            run(parse(&[
                "edgerelay-auth",
                "check",
                "-f",
                path,
                "old",
                "--at",
                "1999-12-31T00:00:00Z"
            ]))
            .await
            .unwrap()
        );
    }

    #[tokio::test]
    async fn list_rejects_unknown_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["unused"]"#).unwrap();
        // A bare list of strings is not a valid document.
        let path = file.path().to_str().unwrap();
        assert!(run(parse(&["edgerelay-auth", "list", "-f", path])).await.is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"a": null}}"#).unwrap();
        let path = file.path().to_str().unwrap();
        assert!(
            run(parse(&["edgerelay-auth", "list", "-f", path, "--format", "csv"]))
                .await
                .is_err()
        );
        assert!(
            run(parse(&["edgerelay-auth", "list", "-f", path, "--format", "json"]))
                .await
                .unwrap()
        );
    }
}
