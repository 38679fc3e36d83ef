//! Page cache identity and lookup results.

use serde::{Deserialize, Serialize};

/// Identifies a cacheable response and its freshness window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Cache key.
    pub key: String,
    /// Time-to-live in seconds.
    pub expire: u64,
    /// Whether a stale entry may be served.
    #[serde(default)]
    pub stale: bool,
}

impl CacheInfo {
    /// Create cache info for a key with a TTL in seconds.
    pub fn new(key: impl Into<String>, expire: u64) -> Self {
        Self {
            key: key.into(),
            expire,
            stale: false,
        }
    }

    /// Allow serving stale content.
    pub fn with_stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    /// Whether this info carries a usable key.
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }
}

/// A cache hit: the cache info plus the cached content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCache {
    #[serde(flatten)]
    pub cache_info: CacheInfo,
    /// Cached page content.
    pub content: String,
}

/// Content found by a `findCache` callback, stamped with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindCacheResult {
    /// Cached page content.
    pub content: String,
    /// Plugin that found the content.
    pub render_by: String,
}
