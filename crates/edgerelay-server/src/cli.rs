//! CLI module for edgerelay-server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as a subcommand of the main edgerelay CLI.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use edgerelay_auth::{
    AuthError, ReloadableDirectory, RemoteDirectory, RemoteOptions, StaticDirectory, TokenDirectory,
    TokenRow,
};
use edgerelay_config::{
    AuthConfig, CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};

use crate::{CancellationToken, run_with_shutdown};

/// Relay server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "edgerelay-server",
    version,
    about = "WebSocket tunnel relay server"
)]
pub struct ServerArgs {
    /// Config file path (json/jsonc/yaml/toml). Flags alone are enough when omitted.
    #[arg(short, long, env = "EDGERELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the relay server with the given arguments.
///
/// This is the main entry point for the server CLI, used by both the
/// standalone binary and the unified edgerelay CLI.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(args.config.as_deref(), &args.overrides)?;

    init_tracing(&config.logging);

    if let Some(listen) = &config.metrics.listen {
        match edgerelay_metrics::init_prometheus(listen) {
            Ok(()) => info!("metrics exporter listening on {}", listen),
            Err(e) => warn!("failed to start metrics exporter: {}", e),
        }
    }

    // Set up graceful shutdown on SIGTERM/SIGINT
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let directory = Arc::new(ReloadableDirectory::new(build_directory(&config.auth)?));
    info!(
        inline_tokens = config.auth.tokens.len(),
        token_file = ?config.auth.token_file,
        remote = config.auth.remote.is_some(),
        "token directory ready"
    );

    #[cfg(unix)]
    {
        let config_path = args.config.clone();
        let overrides = args.overrides.clone();
        let reload = directory.clone();
        tokio::spawn(async move {
            reload_signal_handler(config_path, overrides, reload).await;
        });
    }

    run_with_shutdown(config, directory, shutdown).await?;
    Ok(())
}

/// Load, override and validate the configuration.
pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Builds the token directory for `auth`.
///
/// Inline tokens and the token file form a static document. With a remote
/// source configured, that document becomes the remote's fallback.
pub fn build_directory(auth: &AuthConfig) -> Result<Arc<dyn TokenDirectory>, AuthError> {
    let rows: Vec<TokenRow> = auth
        .tokens
        .iter()
        .map(|t| TokenRow {
            token: t.token.clone(),
            expire: t.expire.clone(),
            remark: t.remark.clone(),
        })
        .collect();
    let local = StaticDirectory::load(&rows, auth.token_file.as_deref().map(Path::new))?;

    let Some(remote) = &auth.remote else {
        return Ok(Arc::new(local));
    };
    let mut options = RemoteOptions::new(remote.url.clone());
    options.github_token = remote.github_token.clone();
    options.cache_ttl = Duration::from_secs(remote.cache_ttl_secs);
    options.timeout = Duration::from_secs(remote.timeout_secs);
    let fallback = (*local.document()).clone();
    Ok(Arc::new(RemoteDirectory::new(options, fallback)?))
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Handle SIGHUP by rebuilding the token directory (Unix only).
#[cfg(unix)]
async fn reload_signal_handler(
    config_path: Option<PathBuf>,
    overrides: CliOverrides,
    directory: Arc<ReloadableDirectory>,
) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(sig) => sig,
        Err(e) => {
            warn!(
                "failed to install SIGHUP handler: {}, token reload disabled",
                e
            );
            return;
        }
    };

    loop {
        sighup.recv().await;
        info!("SIGHUP received, reloading tokens");

        match reload_tokens(config_path.as_deref(), &overrides, &directory) {
            Ok(()) => info!("token directory reloaded"),
            Err(e) => warn!("failed to reload tokens: {}", e),
        }
    }
}

/// Only the token sources are reloaded; everything else needs a restart.
#[cfg(unix)]
fn reload_tokens(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    directory: &ReloadableDirectory,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load(config_path, overrides)?;
    directory.reload_arc(build_directory(&config.auth)?);
    Ok(())
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(filter_directives(config))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

/// Base level followed by per-module directives, sorted for stable output.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.level.clone().unwrap_or_else(|| "info".into())];
    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort();
    directives.extend(filters.into_iter().map(|(module, level)| format!("{module}={level}")));
    directives.join(",")
}
