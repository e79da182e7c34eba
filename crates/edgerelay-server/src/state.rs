//! Server state shared across connections.

use std::sync::Arc;

use edgerelay_auth::TokenDirectory;
use edgerelay_config::WebSocketConfig;

use crate::outbound::OutboundConnector;

/// Shared server state for all connections.
#[derive(Clone)]
pub struct ServerState {
    pub max_header_bytes: usize,
    pub relay_buffer_size: usize,
    pub websocket: WebSocketConfig,
    pub directory: Arc<dyn TokenDirectory>,
    pub connector: Arc<OutboundConnector>,
}
