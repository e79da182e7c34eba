//! Token directory error types.

/// Token directory error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Backend error (network, HTTP status, etc.).
    #[error("backend error: {0}")]
    Backend(String),

    /// The token document could not be parsed.
    #[error("invalid token document: {0}")]
    Document(String),

    /// Reading a local token file failed.
    #[error("token file error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    #[inline]
    pub fn document<E: std::fmt::Display>(err: E) -> Self {
        Self::Document(err.to_string())
    }
}
