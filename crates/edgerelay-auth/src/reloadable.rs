//! Hot-reloadable token directory wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::error::AuthError;
use crate::result::Resolution;
use crate::traits::TokenDirectory;

/// A wrapper that allows hot-swapping the underlying directory.
///
/// Uses `parking_lot::RwLock` which doesn't poison on panic.
///
/// # Example
/// ```
/// use edgerelay_auth::{ReloadableDirectory, StaticDirectory, TokenRow};
///
/// let dir = ReloadableDirectory::new(StaticDirectory::from_rows([TokenRow::permanent("old")]));
///
/// // Later, reload with a new token set
/// dir.reload(StaticDirectory::from_rows([TokenRow::permanent("new")]));
/// ```
pub struct ReloadableDirectory {
    inner: RwLock<Arc<dyn TokenDirectory>>,
}

impl ReloadableDirectory {
    pub fn new<D: TokenDirectory + 'static>(directory: D) -> Self {
        Self {
            inner: RwLock::new(Arc::new(directory)),
        }
    }

    /// Replace the directory. Lookups already in flight finish against the
    /// old one.
    pub fn reload<D: TokenDirectory + 'static>(&self, directory: D) {
        *self.inner.write() = Arc::new(directory);
    }

    /// Replace the directory with a pre-wrapped Arc.
    pub fn reload_arc(&self, directory: Arc<dyn TokenDirectory>) {
        *self.inner.write() = directory;
    }

    #[inline]
    pub fn get(&self) -> Arc<dyn TokenDirectory> {
        self.inner.read().clone()
    }
}

// Cannot derive Debug due to dyn TokenDirectory
impl std::fmt::Debug for ReloadableDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableDirectory").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenDirectory for ReloadableDirectory {
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError> {
        // Clone the Arc so we don't hold the lock across await
        let directory = self.get();
        directory.resolve(token, now).await
    }
}
