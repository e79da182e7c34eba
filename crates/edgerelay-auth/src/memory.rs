//! In-memory token directory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::document::{TokenDocument, TokenRow};
use crate::error::AuthError;
use crate::result::Resolution;
use crate::traits::TokenDirectory;

/// Directory over a fixed, already loaded token document.
///
/// Built from inline configuration rows and/or a local JSON file. Also used
/// as the fallback document of [`RemoteDirectory`](crate::RemoteDirectory).
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    document: Arc<TokenDocument>,
}

impl StaticDirectory {
    #[inline]
    pub fn new(document: TokenDocument) -> Self {
        Self {
            document: Arc::new(document),
        }
    }

    /// Create from token rows.
    ///
    /// # Example
    /// ```
    /// use edgerelay_auth::{StaticDirectory, TokenRow};
    ///
    /// let dir = StaticDirectory::from_rows([
    ///     TokenRow::permanent("ops"),
    ///     TokenRow::expiring("trial", "2026-12-31T23:59:59Z"),
    /// ]);
    /// assert_eq!(dir.len(), 2);
    /// ```
    pub fn from_rows(rows: impl IntoIterator<Item = TokenRow>) -> Self {
        Self::new(TokenDocument::from_rows(rows))
    }

    /// Load a token document from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        Ok(Self::new(read_document(path)?))
    }

    /// Inline rows first, then the rows of `file` if given.
    pub fn load(rows: &[TokenRow], file: Option<&Path>) -> Result<Self, AuthError> {
        let mut document = TokenDocument::from_rows(rows.iter().cloned());
        if let Some(path) = file {
            document.merge(read_document(path)?);
        }
        Ok(Self::new(document))
    }

    #[inline]
    pub fn document(&self) -> Arc<TokenDocument> {
        self.document.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.document.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }
}

pub(crate) fn read_document(path: &Path) -> Result<TokenDocument, AuthError> {
    let bytes = std::fs::read(path)?;
    TokenDocument::from_json(&bytes)
}

#[async_trait]
impl TokenDirectory for StaticDirectory {
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError> {
        Ok(self.document.resolve(token, now))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::result::TokenStatus;

    #[tokio::test]
    async fn resolves_inline_rows() {
        let dir = StaticDirectory::from_rows([
            TokenRow::permanent("a"),
            TokenRow::expiring("b", "2001-01-01T00:00:00Z"),
        ]);
        let now = OffsetDateTime::now_utc();
        assert!(dir.resolve("a", now).await.unwrap().is_valid());
        assert_eq!(
            dir.resolve("b", now).await.unwrap().status,
            TokenStatus::Expired
        );
        assert_eq!(
            dir.resolve("c", now).await.unwrap().status,
            TokenStatus::NotFound
        );
    }

    #[tokio::test]
    async fn loads_file_after_inline_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"from-file": null}}"#).unwrap();

        let dir = StaticDirectory::load(&[TokenRow::permanent("inline")], Some(file.path())).unwrap();
        assert_eq!(dir.len(), 2);
        let now = OffsetDateTime::now_utc();
        assert!(dir.resolve("inline", now).await.unwrap().is_valid());
        assert!(dir.resolve("from-file", now).await.unwrap().is_valid());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = StaticDirectory::from_file(Path::new("/nonexistent/tokens.json")).unwrap_err();
        assert!(matches!(err, AuthError::Io(_)));
    }
}
