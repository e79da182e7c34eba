//! Reads a config file, picking the parser from its extension.
//!
//! Every error names the file, so the server CLI can report which one of a
//! reloaded set failed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: invalid {format}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        message: String,
    },
    #[error(
        "{}: unsupported extension '{extension}' (expected json, jsonc, yaml, yml or toml)",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Config file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON, comments allowed.
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" | "jsonc" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    fn parse(self, data: &str) -> Result<Config, String> {
        match self {
            Self::Json => {
                let stripped = json_comments::StripComments::new(data.as_bytes());
                serde_json::from_reader(stripped).map_err(|e| e.to_string())
            }
            Self::Yaml => serde_yaml::from_str(data).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(data).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        })
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let Some(format) = ConfigFormat::from_extension(extension) else {
        return Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: extension.to_string(),
        });
    };
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&data).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        format,
        message,
    })
}
