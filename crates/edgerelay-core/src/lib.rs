//! Core types and constants shared across edgerelay crates.
//!
//! This crate provides:
//! - Default configuration values
//! - Error type constants for metrics/logging
//! - Small I/O adapters used by the server
//! - Common project metadata

pub mod defaults;
pub mod errors;
pub mod io;

// Re-export commonly used items at crate root
pub use defaults::*;
pub use errors::*;

/// Project name.
pub const PROJECT_NAME: &str = "edgerelay";
/// Project version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
