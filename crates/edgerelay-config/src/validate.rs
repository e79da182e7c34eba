//! Configuration validation logic.

use edgerelay_core::io::error_kind_from_name;

use crate::Config;
use crate::defaults::{max_relay_buffer_size, min_header_bytes, min_relay_buffer_size};
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.trim().is_empty() {
        return Err(ConfigError::Validation("server.listen is empty".into()));
    }
    if config.server.max_header_bytes < min_header_bytes() {
        return Err(ConfigError::Validation(format!(
            "server.max_header_bytes too small (min {})",
            min_header_bytes()
        )));
    }
    if config.server.relay_buffer_size < min_relay_buffer_size() {
        return Err(ConfigError::Validation(format!(
            "server.relay_buffer_size must be >= {}",
            min_relay_buffer_size()
        )));
    }
    if config.server.relay_buffer_size > max_relay_buffer_size() {
        return Err(ConfigError::Validation(
            "server.relay_buffer_size must be <= 1MB".into(),
        ));
    }
    if config.server.connection_backlog == 0 {
        return Err(ConfigError::Validation(
            "server.connection_backlog must be > 0".into(),
        ));
    }
    if config.server.max_connections == Some(0) {
        return Err(ConfigError::Validation(
            "server.max_connections must be > 0 (omit for unlimited)".into(),
        ));
    }

    if !config.websocket.path.starts_with('/') {
        return Err(ConfigError::Validation(
            "websocket.path must start with '/'".into(),
        ));
    }
    if let Some(host) = &config.websocket.host
        && host.trim().is_empty()
    {
        return Err(ConfigError::Validation("websocket.host is empty".into()));
    }

    if !config.auth.has_source() {
        return Err(ConfigError::Validation(
            "auth: at least one of 'tokens', 'token_file' or 'remote' must be set".into(),
        ));
    }
    if config.auth.tokens.iter().any(|t| t.token.is_empty()) {
        return Err(ConfigError::Validation("auth.tokens contains an empty token".into()));
    }
    if let Some(path) = &config.auth.token_file
        && path.trim().is_empty()
    {
        return Err(ConfigError::Validation("auth.token_file is empty".into()));
    }
    if let Some(remote) = &config.auth.remote {
        if remote.url.trim().is_empty() {
            return Err(ConfigError::Validation("auth.remote.url is empty".into()));
        }
        if !remote.url.starts_with("http://") && !remote.url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "auth.remote.url must be an http(s) URL".into(),
            ));
        }
        if remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.remote.timeout_secs must be > 0".into(),
            ));
        }
    }

    if config.outbound.fallback_hosts.iter().any(|h| h.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "outbound.fallback_hosts contains an empty host".into(),
        ));
    }
    for name in &config.outbound.retry.error_kinds {
        if error_kind_from_name(name).is_none() {
            return Err(ConfigError::Validation(format!(
                "outbound.retry.error_kinds: unknown error kind '{name}'"
            )));
        }
    }
    if config.outbound.retry.messages.iter().any(|m| m.is_empty()) {
        return Err(ConfigError::Validation(
            "outbound.retry.messages contains an empty pattern".into(),
        ));
    }

    if let Some(format) = &config.logging.format {
        let valid = ["pretty", "json", "compact"];
        if !valid.contains(&format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.format must be one of: {:?}",
                valid
            )));
        }
    }
    if let Some(output) = &config.logging.output {
        let valid = ["stdout", "stderr"];
        if !valid.contains(&output.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.output must be one of: {:?}",
                valid
            )));
        }
    }
    Ok(())
}
