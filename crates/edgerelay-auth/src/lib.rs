//! Token directory for edgerelay.
//!
//! Resolves a client credential to a validity decision. The directory is
//! backed by a JSON token document which may come from inline configuration,
//! a local file, or a remote URL with TTL memoisation.
//!
//! # Example
//!
//! ```
//! use edgerelay_auth::{StaticDirectory, TokenDirectory, TokenRow};
//! use time::OffsetDateTime;
//!
//! # async fn example() -> Result<(), edgerelay_auth::AuthError> {
//! let directory = StaticDirectory::from_rows([TokenRow::permanent("alice-token")]);
//! let resolution = directory.resolve("alice-token", OffsetDateTime::now_utc()).await?;
//! assert!(resolution.is_valid());
//! # Ok(())
//! # }
//! ```

mod cache;
pub mod cli;
mod document;
mod error;
pub mod http;
mod memory;
mod reloadable;
mod result;
mod traits;

pub use cache::{CacheLookup, DocumentCache};
pub use cli::AuthArgs;
pub use document::{TokenDocument, TokenRow, parse_expiry};
pub use error::AuthError;
pub use http::{RemoteDirectory, RemoteOptions};
pub use memory::StaticDirectory;
pub use reloadable::ReloadableDirectory;
pub use result::{Resolution, TokenStatus};
pub use traits::TokenDirectory;
