//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `edgerelay_core::defaults`.

use edgerelay_core::defaults;

/// Generate default value functions that forward to edgerelay_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

/// Generate default value functions that return Vec<String> from &[&str] constants.
macro_rules! default_list_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> Vec<String> {
                defaults::$const_name.iter().map(|s| s.to_string()).collect()
            }
        )*
    };
}

default_fns! {
    default_max_header_bytes      => DEFAULT_MAX_HEADER_BYTES: usize,
    min_header_bytes              => MIN_HEADER_BYTES: usize,
    default_relay_buffer_size     => DEFAULT_RELAY_BUFFER_SIZE: usize,
    min_relay_buffer_size         => MIN_RELAY_BUFFER_SIZE: usize,
    max_relay_buffer_size         => MAX_RELAY_BUFFER_SIZE: usize,
    default_connection_backlog    => DEFAULT_CONNECTION_BACKLOG: u32,
    default_shutdown_timeout_secs => DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64,
    default_ws_max_frame_bytes    => DEFAULT_WS_MAX_FRAME_BYTES: usize,
    default_ws_require_token      => DEFAULT_WS_REQUIRE_TOKEN: bool,
    default_connect_timeout_secs  => DEFAULT_CONNECT_TIMEOUT_SECS: u64,
    default_tcp_no_delay          => DEFAULT_TCP_NO_DELAY: bool,
    default_tcp_send_buffer       => DEFAULT_TCP_SEND_BUFFER: usize,
    default_tcp_recv_buffer       => DEFAULT_TCP_RECV_BUFFER: usize,
    default_token_cache_ttl_secs  => DEFAULT_TOKEN_CACHE_TTL_SECS: u64,
    default_token_fetch_timeout_secs => DEFAULT_TOKEN_FETCH_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_listen  => DEFAULT_LISTEN,
    default_ws_path => DEFAULT_WS_PATH,
}

default_list_fns! {
    default_retry_error_kinds => DEFAULT_RETRY_ERROR_KINDS,
    default_retry_messages    => DEFAULT_RETRY_MESSAGES,
}
