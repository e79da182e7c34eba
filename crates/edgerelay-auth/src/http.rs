//! Remote token directory.
//!
//! Fetches the token document over HTTP and memoises it for a TTL. GitHub
//! URLs are supported directly: `github.com/<owner>/<repo>/blob/<ref>/<path>`
//! pages are rewritten to `raw.githubusercontent.com`, and
//! `api.github.com/repos/...` contents URLs are requested with the raw media
//! type. A GitHub token, when set, is sent as `Authorization: token <t>`.
//!
//! # Example
//!
//! ```no_run
//! use edgerelay_auth::{RemoteDirectory, RemoteOptions, TokenDocument};
//!
//! let dir = RemoteDirectory::new(
//!     RemoteOptions::new("https://github.com/acme/relay/blob/main/token.json"),
//!     TokenDocument::default(),
//! ).unwrap();
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use edgerelay_core::{
    DEFAULT_TOKEN_CACHE_TTL_SECS, DEFAULT_TOKEN_FETCH_TIMEOUT_SECS, TOKEN_FETCH_USER_AGENT,
};

use crate::cache::{CacheLookup, DocumentCache};
use crate::document::TokenDocument;
use crate::error::AuthError;
use crate::result::Resolution;
use crate::traits::TokenDirectory;

const GITHUB_RAW_ACCEPT: &str = "application/vnd.github.v3.raw";

/// Connection settings for [`RemoteDirectory`].
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub url: String,
    pub github_token: Option<String>,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl RemoteOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            github_token: None,
            cache_ttl: Duration::from_secs(DEFAULT_TOKEN_CACHE_TTL_SECS),
            timeout: Duration::from_secs(DEFAULT_TOKEN_FETCH_TIMEOUT_SECS),
        }
    }
}

/// Rewrites GitHub page URLs to raw content URLs.
///
/// Returns the URL to fetch and whether the raw media type must be requested.
pub fn normalize_url(url: &str) -> (String, bool) {
    if url.contains("api.github.com/repos/") {
        return (url.to_string(), true);
    }
    if url.contains("github.com") && !url.contains("raw.githubusercontent.com") {
        let raw = url
            .replacen("github.com", "raw.githubusercontent.com", 1)
            .replacen("/blob/", "/", 1)
            .replacen("/tree/", "/", 1);
        return (raw, false);
    }
    (url.to_string(), false)
}

/// Token directory backed by a remote JSON document.
///
/// On a failed refresh the last fetched document is served even if stale.
/// With nothing cached, the fallback document is served and cached for one
/// TTL so a dead remote is not hammered.
#[derive(Debug)]
pub struct RemoteDirectory {
    client: Client,
    fetch_url: String,
    cache: DocumentCache,
    fallback: Arc<TokenDocument>,
    refresh: Mutex<()>,
}

impl RemoteDirectory {
    pub fn new(options: RemoteOptions, fallback: TokenDocument) -> Result<Self, AuthError> {
        let (fetch_url, raw_accept) = normalize_url(&options.url);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(TOKEN_FETCH_USER_AGENT));
        if raw_accept {
            headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_RAW_ACCEPT));
        }
        if let Some(token) = options.github_token.as_deref().filter(|t| !t.is_empty()) {
            let mut value =
                HeaderValue::from_str(&format!("token {token}")).map_err(AuthError::backend)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(AuthError::backend)?;

        Ok(Self::with_client(client, fetch_url, options.cache_ttl, fallback))
    }

    /// Create with a custom reqwest [`Client`]. `fetch_url` is used as-is.
    pub fn with_client(
        client: Client,
        fetch_url: impl Into<String>,
        cache_ttl: Duration,
        fallback: TokenDocument,
    ) -> Self {
        Self {
            client,
            fetch_url: fetch_url.into(),
            cache: DocumentCache::new(cache_ttl),
            fallback: Arc::new(fallback),
            refresh: Mutex::new(()),
        }
    }

    #[inline]
    pub fn fetch_url(&self) -> &str {
        &self.fetch_url
    }

    /// Drop the cached document so the next lookup refetches.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Current document, refreshing it if the cached copy is not fresh.
    pub async fn document(&self) -> Arc<TokenDocument> {
        if let CacheLookup::Fresh(doc) = self.cache.lookup(Instant::now()) {
            return doc;
        }

        let _guard = self.refresh.lock().await;
        // Another task may have refreshed while we waited.
        let stale = match self.cache.lookup(Instant::now()) {
            CacheLookup::Fresh(doc) => return doc,
            CacheLookup::Stale(doc) => Some(doc),
            CacheLookup::Miss => None,
        };

        match self.fetch().await {
            Ok(doc) => {
                let doc = Arc::new(doc);
                debug!(url = %self.fetch_url, tokens = doc.tokens.len(), "token document refreshed");
                self.cache.store(doc.clone(), Instant::now());
                doc
            }
            Err(e) => match stale {
                Some(doc) => {
                    warn!(url = %self.fetch_url, error = %e, "token document refresh failed, serving stale copy");
                    doc
                }
                None => {
                    warn!(url = %self.fetch_url, error = %e, "token document fetch failed, serving fallback");
                    self.cache.store(self.fallback.clone(), Instant::now());
                    self.fallback.clone()
                }
            },
        }
    }

    /// Fetch and parse the document, bypassing the cache.
    pub async fn fetch(&self) -> Result<TokenDocument, AuthError> {
        let resp = self
            .client
            .get(&self.fetch_url)
            .send()
            .await
            .map_err(AuthError::backend)?;

        if !resp.status().is_success() {
            return Err(AuthError::Backend(format!(
                "HTTP {}",
                resp.status().as_u16()
            )));
        }

        let bytes = resp.bytes().await.map_err(AuthError::backend)?;
        TokenDocument::from_json(&bytes)
    }
}

#[async_trait]
impl TokenDirectory for RemoteDirectory {
    async fn resolve(&self, token: &str, now: OffsetDateTime) -> Result<Resolution, AuthError> {
        Ok(self.document().await.resolve(token, now))
    }
}
