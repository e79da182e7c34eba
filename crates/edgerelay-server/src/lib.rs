//! edgerelay server library.
//!
//! Accept loop, WebSocket upgrade gate, per-channel session state machine and
//! the outbound connector. Exposed for the unified CLI, integration tests and
//! embedding.

pub mod cli;
mod error;
pub mod outbound;
mod server;
pub mod session;
mod state;
mod util;
pub mod ws;

pub use cli::ServerArgs;
pub use error::ServerError;
pub use outbound::{
    ConnectError, ConnectionAttempt, Dialer, Endpoint, OutboundConnector, RetryPolicy, TcpDialer,
};
pub use server::{DEFAULT_SHUTDOWN_TIMEOUT, build_state, handle_conn, run, run_with_shutdown};
pub use session::{Protocol, Session, SessionState};
pub use state::ServerState;
pub use tokio_util::sync::CancellationToken;
