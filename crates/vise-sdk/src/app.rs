//! ViseApp configuration and setup.

use std::sync::Arc;

use vise_cache::{MemoryPageCache, PageCacheBackend, PageCachePlugin};
use vise_core::{HttpRequest, HttpResponse, ViseConfig};
use vise_hooks::{
    HookLifeCycle, HookObserver, HookResult, HookSet, LifecycleOutput, Plugin, ViseHooks,
};
use vise_observability::HookLogger;

/// Vise application builder.
///
/// Collects the app's own hooks and its plugins, then wires the page cache
/// and hook logger from the configuration.
///
/// # Example
///
/// ```rust,ignore
/// let server = ViseApp::new(ViseConfig::new("shop"))
///     .with_hooks(hooks)
///     .with_plugin(analytics)
///     .build()?;
/// ```
pub struct ViseApp {
    config: ViseConfig,
    hooks: ViseHooks,
    cache_backend: Option<Arc<dyn PageCacheBackend>>,
    observer: Option<Arc<dyn HookObserver>>,
}

impl ViseApp {
    /// Create an app from its configuration.
    pub fn new(config: ViseConfig) -> Self {
        let hooks = ViseHooks::new(config.app_name.clone());
        Self {
            config,
            hooks,
            cache_backend: None,
            observer: None,
        }
    }

    /// Set the app's own hooks.
    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = self.hooks.with_hooks(hooks);
        self
    }

    /// Add a plugin after the ones already added.
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.hooks = self.hooks.with_plugin(plugin);
        self
    }

    /// Store cached pages in `backend` instead of memory.
    ///
    /// Retention is then up to the backend.
    pub fn with_cache_backend(mut self, backend: Arc<dyn PageCacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Replace the configured hook logger.
    pub fn with_observer(mut self, observer: Arc<dyn HookObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ViseConfig {
        &self.config
    }

    /// Merge every plugin and build the server.
    ///
    /// The page cache plugin is added last when caching is enabled. Without a
    /// custom backend, pages live in a `MemoryPageCache` bounded by
    /// `cache.max_pages`: a full cache drops expired pages, then the least
    /// recently stored page.
    pub fn build(self) -> HookResult<ViseServer> {
        let Self {
            config,
            mut hooks,
            cache_backend,
            observer,
        } = self;

        if config.cache.enabled {
            let backend: Arc<dyn PageCacheBackend> = match cache_backend {
                Some(backend) => backend,
                None => Arc::new(MemoryPageCache::with_max_pages(config.cache.max_pages)),
            };
            let cache = PageCachePlugin::from_config(backend, &config.cache);
            hooks = hooks.with_plugin(cache.into_plugin());
            tracing::debug!(app = %config.app_name, expire = config.cache.expire_secs, "page cache enabled");
        }

        let observer: Arc<dyn HookObserver> = match observer {
            Some(observer) => observer,
            None => Arc::new(HookLogger::from_config(&config.logging)),
        };
        let lifecycle = HookLifeCycle::new(hooks)?.with_observer(observer);

        Ok(ViseServer { config, lifecycle })
    }
}

impl std::fmt::Debug for ViseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViseApp")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// A built app serving requests.
#[derive(Debug, Clone)]
pub struct ViseServer {
    config: ViseConfig,
    lifecycle: HookLifeCycle,
}

impl ViseServer {
    /// Get the configuration.
    pub fn config(&self) -> &ViseConfig {
        &self.config
    }

    /// Get the lifecycle.
    pub fn lifecycle(&self) -> &HookLifeCycle {
        &self.lifecycle
    }

    /// Serve one request, resolving its router base from the configuration.
    pub async fn run(&self, request: HttpRequest) -> HookResult<LifecycleOutput> {
        let session = self.config.session_extra(&request.url)?;
        self.lifecycle.run(request, &session).await
    }

    /// Serve one request and return only the response.
    pub async fn handle(&self, request: HttpRequest) -> HookResult<HttpResponse> {
        Ok(self.run(request).await?.response)
    }

    /// Serve a request received through the `http` crate.
    pub async fn handle_http(
        &self,
        request: http::Request<String>,
    ) -> HookResult<http::Response<String>> {
        let response = self.handle(HttpRequest::from_http(&request)).await?;
        Ok(response.into_http())
    }
}
