//! Page storage.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CacheResult;

/// A cached page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// The cached HTML.
    pub content: String,
    /// When the entry was created, in seconds since the Unix epoch.
    pub created_at: u64,
    /// Time-to-live in seconds.
    pub ttl_secs: u64,
}

impl CachedPage {
    /// Create an entry created now.
    pub fn new(content: impl Into<String>, ttl: Duration) -> Self {
        Self {
            content: content.into(),
            created_at: current_timestamp(),
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        current_timestamp() > self.created_at.saturating_add(self.ttl_secs)
    }

    /// Get remaining TTL in seconds.
    pub fn remaining_ttl(&self) -> u64 {
        self.created_at
            .saturating_add(self.ttl_secs)
            .saturating_sub(current_timestamp())
    }

    /// Encode for backends storing bytes.
    pub fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an entry stored with `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Page cache backend.
#[async_trait]
pub trait PageCacheBackend: Send + Sync {
    /// Get a cached page, expired or not.
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>>;

    /// Store a page.
    async fn set(&self, key: &str, page: CachedPage) -> CacheResult<()>;

    /// Remove a page.
    async fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Default number of pages kept by `MemoryPageCache`.
pub const DEFAULT_MAX_PAGES: usize = 1024;

/// In-memory page cache backend.
///
/// Holds at most `max_pages` pages. Storing a new key into a full cache first
/// drops expired pages, then the least recently stored page if it is still
/// full.
#[derive(Debug)]
pub struct MemoryPageCache {
    pages: RwLock<PageMap>,
    max_pages: usize,
}

#[derive(Debug, Default)]
struct PageMap {
    /// Pages with the sequence number of their last store.
    entries: HashMap<String, (u64, CachedPage)>,
    next_seq: u64,
}

impl Default for MemoryPageCache {
    fn default() -> Self {
        Self::with_max_pages(DEFAULT_MAX_PAGES)
    }
}

impl MemoryPageCache {
    /// Create an empty cache holding up to `DEFAULT_MAX_PAGES` pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding up to `max_pages` pages (at least one).
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self {
            pages: RwLock::new(PageMap::default()),
            max_pages: max_pages.max(1),
        }
    }

    /// Maximum number of stored pages.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of stored pages.
    pub async fn len(&self) -> usize {
        self.pages.read().await.entries.len()
    }

    /// Whether no page is stored.
    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.entries.is_empty()
    }

    /// Drop expired pages and return how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut map = self.pages.write().await;
        let pages = &mut map.entries;
        let before = pages.len();
        pages.retain(|_, (_, page)| !page.is_expired());
        before - pages.len()
    }
}

#[async_trait]
impl PageCacheBackend for MemoryPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedPage>> {
        Ok(self
            .pages
            .read()
            .await
            .entries
            .get(key)
            .map(|(_, page)| page.clone()))
    }

    async fn set(&self, key: &str, page: CachedPage) -> CacheResult<()> {
        let mut map = self.pages.write().await;
        let seq = map.next_seq;
        map.next_seq += 1;

        let pages = &mut map.entries;
        if !pages.contains_key(key) && pages.len() >= self.max_pages {
            pages.retain(|_, (_, page)| !page.is_expired());
        }
        while !pages.contains_key(key) && pages.len() >= self.max_pages {
            let Some(oldest) = pages
                .iter()
                .min_by_key(|(_, (stored, _))| *stored)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            tracing::debug!(key = %oldest, "evicting least recently stored page");
            pages.remove(&oldest);
        }
        pages.insert(key.to_string(), (seq, page));
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.pages.write().await.entries.remove(key);
        Ok(())
    }
}
