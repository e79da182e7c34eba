//! Configuration loading and CLI definitions.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, ConfigFormat, load_config};
pub use types::*;
pub use validate::validate_config;

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(ext: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn minimal() -> Config {
        let mut config = Config::default();
        config.auth.tokens.push(TokenEntry::permanent("t"));
        config
    }

    #[test]
    fn loads_toml_with_defaults() {
        let file = write_config(
            "toml",
            r#"
[server]
listen = "127.0.0.1:9000"

[[auth.tokens]]
token = "550e8400-e29b-41d4-a716-446655440000"
expire = "2026-12-31T23:59:59Z"

[outbound]
fallback_hosts = ["proxy.example.net"]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.server.relay_buffer_size, 32768);
        assert_eq!(config.websocket.path, "/");
        assert!(!config.websocket.require_token);
        assert_eq!(config.auth.tokens.len(), 1);
        assert_eq!(config.outbound.fallback_hosts, vec!["proxy.example.net"]);
        assert_eq!(config.outbound.connect_timeout_secs, 0);
        assert!(config.outbound.tcp.no_delay);
        assert!(config.outbound.retry.error_kinds.contains(&"connection_refused".to_string()));
        assert!(config.outbound.retry.messages.contains(&"cloudflare".to_string()));
        validate_config(&config).unwrap();
    }

    #[test]
    fn loads_jsonc_and_yaml() {
        let jsonc = write_config(
            "jsonc",
            r#"{
  // remote token document
  "auth": {"remote": {"url": "https://github.com/acme/relay/blob/main/token.json"}},
  "websocket": {"path": "/tunnel", "require_token": true}
}"#,
        );
        let config = load_config(jsonc.path()).unwrap();
        let remote = config.auth.remote.as_ref().unwrap();
        assert_eq!(remote.cache_ttl_secs, 60);
        assert!(config.websocket.require_token);
        validate_config(&config).unwrap();

        let yaml = write_config(
            "yaml",
            "auth:\n  token_file: tokens.json\noutbound:\n  retry:\n    error_kinds: [timed_out]\n    messages: []\n",
        );
        let config = load_config(yaml.path()).unwrap();
        assert_eq!(config.outbound.retry.error_kinds, vec!["timed_out"]);
        assert!(config.outbound.retry.messages.is_empty());
        validate_config(&config).unwrap();
    }

    #[test]
    fn unsupported_extension() {
        let file = write_config("ini", "listen=1");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::UnsupportedFormat { extension, .. } if extension == "ini"
        ));
        assert!(err.to_string().contains(&*file.path().to_string_lossy()));
    }

    #[test]
    fn errors_name_the_file() {
        let file = write_config("yaml", "server: [unclosed");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::Parse { format: ConfigFormat::Yaml, path, .. } if path == file.path()
        ));
        assert!(err.to_string().contains("invalid yaml"));

        let missing = file.path().with_extension("toml");
        let err = load_config(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if *path == missing));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("JSONC"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("ini"), None);
    }

    #[test]
    fn example_config_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.outbound.fallback_hosts, vec!["ProxyIP.CMLiussss.net"]);
        assert_eq!(config.auth.tokens.len(), 2);
        validate_config(&config).unwrap();

        // Without the key no fallback is tried.
        assert!(Config::default().outbound.fallback_hosts.is_empty());
    }

    #[test]
    fn requires_a_token_source() {
        let err = validate_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("auth"));
        validate_config(&minimal()).unwrap();
    }

    #[test]
    fn rejects_unknown_retry_kind() {
        let mut config = minimal();
        config.outbound.retry.error_kinds.push("connection_vanished".into());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("connection_vanished"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = minimal();
        config.server.relay_buffer_size = 512;
        assert!(validate_config(&config).is_err());

        let mut config = minimal();
        config.server.relay_buffer_size = 2 * 1024 * 1024;
        assert!(validate_config(&config).is_err());

        let mut config = minimal();
        config.websocket.path = "tunnel".into();
        assert!(validate_config(&config).is_err());

        let mut config = minimal();
        config.logging.format = Some("xml".into());
        assert!(validate_config(&config).is_err());

        let mut config = minimal();
        config.auth.remote = Some(RemoteAuthConfig::new("ftp://example.com/t.json"));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn overrides_apply() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            listen: Some("0.0.0.0:443".into()),
            max_connections: Some(0),
            token: Some(vec!["a".into(), "b".into()]),
            token_url: Some("https://tokens.example.com/t.json".into()),
            github_token: Some("ghp_x".into()),
            fallback_host: Some(vec!["f1".into(), "f2".into()]),
            require_token: Some(true),
            ..Default::default()
        };
        apply_overrides(&mut config, &overrides);

        assert_eq!(config.server.listen, "0.0.0.0:443");
        assert_eq!(config.server.max_connections, None);
        assert_eq!(config.auth.tokens.len(), 2);
        let remote = config.auth.remote.as_ref().unwrap();
        assert_eq!(remote.url, "https://tokens.example.com/t.json");
        assert_eq!(remote.github_token.as_deref(), Some("ghp_x"));
        assert_eq!(config.outbound.fallback_hosts, vec!["f1", "f2"]);
        assert!(config.websocket.require_token);
        validate_config(&config).unwrap();
    }
}
