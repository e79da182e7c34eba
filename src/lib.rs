//! # edgerelay
//!
//! A WebSocket tunnel relay. Each WebSocket channel carries one session,
//! speaking either a compact binary header protocol or a line-oriented text
//! protocol, relayed to a TCP destination after token authorization.
//!
//! ## Crates
//!
//! - [`edgerelay_core`] - Shared defaults and I/O helpers
//! - [`edgerelay_proto`] - Binary header and text control frame codecs
//! - [`edgerelay_auth`] - Token directories (static, remote, reloadable)
//! - [`edgerelay_config`] - Configuration loading and validation
//! - [`edgerelay_metrics`] - Prometheus-compatible metrics
//! - [`edgerelay_server`] - Upgrade gate, sessions and outbound connector

pub use edgerelay_auth as auth;
pub use edgerelay_config as config;
pub use edgerelay_core as core;
pub use edgerelay_metrics as metrics;
pub use edgerelay_proto as proto;
pub use edgerelay_server as server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use edgerelay_auth::{ReloadableDirectory, StaticDirectory, TokenDirectory};
    pub use edgerelay_config::{Config, load_config, validate_config};
    pub use edgerelay_server::{CancellationToken, ServerError, run, run_with_shutdown};
}
