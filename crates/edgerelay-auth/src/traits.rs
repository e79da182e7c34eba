//! Token directory trait.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::result::Resolution;

/// Resolves client credentials to a validity decision.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are shared by
/// every session.
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    /// Resolve `token` as of `now`.
    ///
    /// An unknown or expired token is a successful lookup with a non-valid
    /// status. `Err` is reserved for backend failures.
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError>;
}

/// Blanket implementation for `Arc<D>` where `D: TokenDirectory`.
#[async_trait]
impl<D: TokenDirectory + ?Sized> TokenDirectory for Arc<D> {
    #[inline]
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError> {
        (**self).resolve(token, now).await
    }
}

/// Blanket implementation for `Box<D>` where `D: TokenDirectory`.
#[async_trait]
impl<D: TokenDirectory + ?Sized> TokenDirectory for Box<D> {
    #[inline]
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError> {
        (**self).resolve(token, now).await
    }
}
