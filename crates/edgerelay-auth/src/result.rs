//! Resolution result types.

use time::OffsetDateTime;

/// Outcome of looking a token up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
    NotFound,
}

impl TokenStatus {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenStatus::Valid => "valid",
            TokenStatus::Expired => "expired",
            TokenStatus::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving a token at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub status: TokenStatus,
    /// Expiry instant, if the token has a parseable one.
    pub expires_at: Option<OffsetDateTime>,
    /// Free-form note attached to the token row.
    pub remark: Option<String>,
}

impl Resolution {
    #[inline]
    pub fn not_found() -> Self {
        Self {
            status: TokenStatus::NotFound,
            expires_at: None,
            remark: None,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status == TokenStatus::Valid
    }
}
