//! The `vise:page-cache` plugin.

use std::sync::Arc;
use std::time::Duration;

use vise_core::{CacheConfig, CacheInfo, HttpRequest, RenderOutcome, RenderResult};
use vise_hooks::{Enforce, HookSet, Plugin};

use crate::store::{CachedPage, PageCacheBackend};

/// Name of the page cache plugin.
pub const PAGE_CACHE_PLUGIN: &str = "vise:page-cache";

/// Derives the cache key of a request; `None` disables caching for it.
pub type KeyGenerator = Arc<dyn Fn(&HttpRequest) -> Option<String> + Send + Sync>;

/// Caches rendered pages in a `PageCacheBackend`.
///
/// - `beforeUseCache`: yields cache info for every request without `noCache`.
/// - `findCache`: serves fresh pages, and expired ones when the cache info
///   allows stale content.
/// - `hitCache`: traces the hit.
/// - `afterRender`: stores the page of a successful render carrying cache info.
///
/// Backend errors are logged and treated as misses.
#[derive(Clone)]
pub struct PageCachePlugin {
    backend: Arc<dyn PageCacheBackend>,
    key_generator: KeyGenerator,
    expire: u64,
    stale: bool,
}

impl PageCachePlugin {
    /// Create a plugin over a backend. Pages are keyed by URL and kept for
    /// 60 seconds.
    pub fn new(backend: Arc<dyn PageCacheBackend>) -> Self {
        Self {
            backend,
            key_generator: Arc::new(|request: &HttpRequest| Some(request.url.clone())),
            expire: 60,
            stale: false,
        }
    }

    /// Create a plugin from configuration.
    pub fn from_config(backend: Arc<dyn PageCacheBackend>, config: &CacheConfig) -> Self {
        Self::new(backend).with_expire(config.expire_secs)
    }

    /// Set the key generator.
    pub fn with_key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest) -> Option<String> + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(f);
        self
    }

    /// Set the TTL in seconds.
    pub fn with_expire(mut self, expire: u64) -> Self {
        self.expire = expire;
        self
    }

    /// Allow serving expired pages.
    pub fn with_stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    /// Build the plugin.
    pub fn into_plugin(self) -> Plugin {
        let Self {
            backend,
            key_generator,
            expire,
            stale,
        } = self;
        let lookup = backend.clone();

        let hooks = HookSet::new()
            .on_before_use_cache(move |ctx| {
                let info = if ctx.extra.no_cache {
                    None
                } else {
                    key_generator(&ctx.request)
                        .map(|key| CacheInfo::new(key, expire).with_stale(stale))
                };
                async move { Ok(info) }
            })
            .on_find_cache(move |info| {
                let backend = lookup.clone();
                async move { Ok(find_page(backend.as_ref(), &info).await) }
            })
            .on_hit_cache(|hit| async move {
                tracing::debug!(key = %hit.cache_info.key, "page served from cache");
                Ok(())
            })
            .on_after_render(move |result| {
                let backend = backend.clone();
                async move {
                    store_page(backend.as_ref(), &result).await;
                    Ok(result)
                }
            })
            .enforce(Enforce::Post);

        Plugin::new(PAGE_CACHE_PLUGIN, hooks)
    }
}

impl std::fmt::Debug for PageCachePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCachePlugin")
            .field("expire", &self.expire)
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

async fn find_page(backend: &dyn PageCacheBackend, info: &CacheInfo) -> Option<String> {
    match backend.get(&info.key).await {
        Ok(Some(page)) if !page.is_expired() || info.stale => Some(page.content),
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(key = %info.key, error = %err, "page cache lookup failed");
            None
        }
    }
}

async fn store_page(backend: &dyn PageCacheBackend, result: &RenderResult) {
    let RenderOutcome::Render {
        ssr_result,
        cache_info: Some(info),
    } = &result.outcome
    else {
        return;
    };
    if result.context.extra.no_cache || !info.has_key() {
        return;
    }

    let page = CachedPage::new(ssr_result.html.clone(), Duration::from_secs(info.expire));
    if let Err(err) = backend.set(&info.key, page).await {
        tracing::warn!(key = %info.key, error = %err, "page cache store failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, CacheResult};
    use crate::store::MemoryPageCache;
    use async_trait::async_trait;
    use vise_core::{RenderContext, RenderContextExtra, SsrResult};

    struct BrokenBackend;

    #[async_trait]
    impl PageCacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> CacheResult<Option<CachedPage>> {
            Err(CacheError::Storage("offline".into()))
        }

        async fn set(&self, _key: &str, _page: CachedPage) -> CacheResult<()> {
            Err(CacheError::Storage("offline".into()))
        }

        async fn remove(&self, _key: &str) -> CacheResult<()> {
            Ok(())
        }
    }

    fn rendered(html: &str, info: Option<CacheInfo>) -> RenderResult {
        let ctx = RenderContext::new(HttpRequest::new("/a"), RenderContextExtra::default());
        let mut result = RenderResult::rendered(
            ctx,
            "app-demo",
            SsrResult {
                html: html.into(),
                ..Default::default()
            },
        );
        if let Some(info) = info {
            result.attach_cache_info(info);
        }
        result
    }

    // === Lookup Tests ===

    #[tokio::test]
    async fn test_find_fresh_page() {
        let cache = MemoryPageCache::new();
        cache
            .set("/a", CachedPage::new("<p>a</p>", Duration::from_secs(60)))
            .await
            .unwrap();
        let found = find_page(&cache, &CacheInfo::new("/a", 60)).await;
        assert_eq!(found.as_deref(), Some("<p>a</p>"));
    }

    #[tokio::test]
    async fn test_expired_page_served_only_when_stale_allowed() {
        let cache = MemoryPageCache::new();
        cache
            .set(
                "/a",
                CachedPage::new("<p>old</p>", Duration::from_secs(1)).with_created_at(0),
            )
            .await
            .unwrap();

        assert!(find_page(&cache, &CacheInfo::new("/a", 60)).await.is_none());
        let stale = CacheInfo::new("/a", 60).with_stale(true);
        assert_eq!(find_page(&cache, &stale).await.as_deref(), Some("<p>old</p>"));
    }

    #[tokio::test]
    async fn test_backend_error_is_miss() {
        assert!(find_page(&BrokenBackend, &CacheInfo::new("/a", 60)).await.is_none());
        store_page(&BrokenBackend, &rendered("<p></p>", Some(CacheInfo::new("/a", 60)))).await;
    }

    // === Store Tests ===

    #[tokio::test]
    async fn test_store_rendered_page() {
        let cache = MemoryPageCache::new();
        store_page(&cache, &rendered("<p>new</p>", Some(CacheInfo::new("/a", 30)))).await;

        let page = cache.get("/a").await.unwrap().unwrap();
        assert_eq!(page.content, "<p>new</p>");
        assert_eq!(page.ttl_secs, 30);
    }

    #[tokio::test]
    async fn test_store_skips_without_cache_info_or_with_no_cache() {
        let cache = MemoryPageCache::new();
        store_page(&cache, &rendered("<p></p>", None)).await;

        let mut result = rendered("<p></p>", Some(CacheInfo::new("/a", 30)));
        result.context.extra.no_cache = true;
        store_page(&cache, &result).await;

        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_plugin_declares_cache_hooks() {
        let plugin = PageCachePlugin::new(Arc::new(MemoryPageCache::new())).into_plugin();
        assert_eq!(plugin.name, PAGE_CACHE_PLUGIN);

        let hooks: Vec<_> = plugin
            .hooks
            .decls()
            .iter()
            .map(|decl| (decl.hook.as_str(), decl.enforce))
            .collect();
        assert_eq!(
            hooks,
            vec![
                ("beforeUseCache", None),
                ("findCache", None),
                ("hitCache", None),
                ("afterRender", Some(Enforce::Post)),
            ]
        );
    }
}
