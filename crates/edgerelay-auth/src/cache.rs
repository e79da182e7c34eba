//! TTL cache for a fetched token document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::document::TokenDocument;

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Fetched less than one TTL ago.
    Fresh(Arc<TokenDocument>),
    /// Present but older than the TTL. Usable when a refresh fails.
    Stale(Arc<TokenDocument>),
    Miss,
}

#[derive(Debug)]
struct Slot {
    value: Arc<TokenDocument>,
    fetched_at: Instant,
}

/// Single-value cache holding the last fetched document and when it was
/// fetched.
///
/// Instants are passed in by the caller so expiry is testable without
/// sleeping.
#[derive(Debug)]
pub struct DocumentCache {
    slot: RwLock<Option<Slot>>,
    ttl: Duration,
}

impl DocumentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&self, now: Instant) -> CacheLookup {
        match &*self.slot.read() {
            Some(slot) if now.saturating_duration_since(slot.fetched_at) < self.ttl => {
                CacheLookup::Fresh(slot.value.clone())
            }
            Some(slot) => CacheLookup::Stale(slot.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    pub fn store(&self, value: Arc<TokenDocument>, now: Instant) {
        *self.slot.write() = Some(Slot {
            value,
            fetched_at: now,
        });
    }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }

    /// When the cached value was fetched, if any.
    pub fn fetched_at(&self) -> Option<Instant> {
        self.slot.read().as_ref().map(|s| s.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TokenRow;

    fn doc(token: &str) -> Arc<TokenDocument> {
        Arc::new(TokenDocument::from_rows([TokenRow::permanent(token)]))
    }

    #[test]
    fn fresh_then_stale() {
        let cache = DocumentCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(matches!(cache.lookup(t0), CacheLookup::Miss));

        cache.store(doc("a"), t0);
        assert!(matches!(cache.lookup(t0 + Duration::from_secs(59)), CacheLookup::Fresh(_)));
        match cache.lookup(t0 + Duration::from_secs(60)) {
            CacheLookup::Stale(d) => assert_eq!(d.tokens[0].token, "a"),
            other => panic!("expected stale, got {other:?}"),
        }
    }

    #[test]
    fn store_replaces_and_invalidate_clears() {
        let cache = DocumentCache::new(Duration::from_secs(1));
        let t0 = Instant::now();
        cache.store(doc("a"), t0);
        cache.store(doc("b"), t0);
        match cache.lookup(t0) {
            CacheLookup::Fresh(d) => assert_eq!(d.tokens[0].token, "b"),
            other => panic!("expected fresh, got {other:?}"),
        }
        assert_eq!(cache.fetched_at(), Some(t0));

        cache.invalidate();
        assert!(matches!(cache.lookup(t0), CacheLookup::Miss));
        assert!(cache.fetched_at().is_none());
    }
}
