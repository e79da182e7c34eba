//! Main server loop and connection handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use edgerelay_auth::TokenDirectory;
use edgerelay_config::Config;
use edgerelay_core::defaults;
use edgerelay_metrics::{
    record_connection_accepted, record_connection_closed, record_connection_rejected,
    record_error,
};

use crate::error::ServerError;
use crate::outbound::OutboundConnector;
use crate::session::Session;
use crate::state::ServerState;
use crate::util::{ConnectionTracker, create_listener};
use crate::ws;

/// Default graceful shutdown timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration =
    Duration::from_secs(defaults::DEFAULT_SHUTDOWN_TIMEOUT_SECS);

/// Builds the shared state from config and a token directory.
pub fn build_state(config: &Config, directory: Arc<dyn TokenDirectory>) -> ServerState {
    ServerState {
        max_header_bytes: config.server.max_header_bytes,
        relay_buffer_size: config.server.relay_buffer_size,
        websocket: config.websocket.clone(),
        directory,
        connector: Arc::new(OutboundConnector::from_config(&config.outbound)),
    }
}

/// Run the server with a cancellation token for graceful shutdown.
pub async fn run_with_shutdown(
    config: Config,
    directory: impl TokenDirectory + 'static,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listen: SocketAddr = config
        .server
        .listen
        .parse()
        .map_err(|_| ServerError::Config(format!("invalid listen address '{}'", config.server.listen)))?;

    if !config.outbound.fallback_hosts.is_empty() {
        info!(hosts = ?config.outbound.fallback_hosts, "outbound fallback hosts configured");
    }
    let state = Arc::new(build_state(&config, Arc::new(directory)));
    let tracker = ConnectionTracker::new();

    // Connection limiter (None = unlimited)
    let conn_limit: Option<Arc<Semaphore>> = config.server.max_connections.map(|n| {
        info!("max_connections set to {}", n);
        Arc::new(Semaphore::new(n))
    });

    let backlog = config.server.connection_backlog;
    let listener = create_listener(listen, backlog)?;
    info!(
        version = edgerelay_core::VERSION,
        address = %listen,
        backlog,
        path = %config.websocket.path,
        "{} listening",
        edgerelay_core::PROJECT_NAME
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }

            result = listener.accept() => {
                let (tcp, peer) = match result {
                    Ok(v) => v,
                    Err(e) => {
                        // Transient (e.g. EMFILE); keep accepting.
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let permit: Option<OwnedSemaphorePermit> = match &conn_limit {
                    Some(sem) => match sem.clone().try_acquire_owned() {
                        Ok(p) => Some(p),
                        Err(_) => {
                            debug!(peer = %peer, reason = "max_connections", "connection rejected");
                            record_connection_rejected("max_connections");
                            drop(tcp);
                            continue;
                        }
                    },
                    None => None,
                };

                debug!(peer = %peer, "new connection");
                let state = state.clone();
                let guard = tracker.track();

                tokio::spawn(async move {
                    let _guard = guard;
                    let _permit = permit;
                    record_connection_accepted();
                    let start = Instant::now();

                    let result = handle_conn(tcp, state, peer).await;

                    let duration_secs = start.elapsed().as_secs_f64();
                    record_connection_closed(duration_secs);
                    match result {
                        Err(err) => {
                            record_error(err.error_type());
                            debug!(peer = %peer, duration_secs, error = %err, "connection closed with error");
                        }
                        Ok(()) => debug!(peer = %peer, duration_secs, "connection closed"),
                    }
                });
            }
        }
    }
    drop(listener);

    let active = tracker.count();
    if active > 0 {
        let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
        info!("waiting for {} active connections to drain", active);
        if tracker.wait_for_zero(timeout).await {
            info!("all connections drained");
        } else {
            warn!(
                "shutdown timeout, {} connections still active",
                tracker.count()
            );
        }
    }

    info!("server stopped");
    Ok(())
}

/// Run the server until the process exits.
pub async fn run(config: Config, directory: impl TokenDirectory + 'static) -> Result<(), ServerError> {
    run_with_shutdown(config, directory, CancellationToken::new()).await
}

/// Upgrade gate, then one session.
pub async fn handle_conn(
    tcp: TcpStream,
    state: Arc<ServerState>,
    peer: SocketAddr,
) -> Result<(), ServerError> {
    let Some(ws) = ws::accept(tcp, &state, peer).await? else {
        return Ok(());
    };
    Session::new(ws, state, peer).run().await
}
