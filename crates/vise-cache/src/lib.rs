//! Page caching for vise server-side rendering.
//!
//! This crate provides:
//! - `PageCacheBackend` - Async page store, with `MemoryPageCache` in memory
//! - `CachedPage` - A stored page with its TTL
//! - `PageCachePlugin` - The `vise:page-cache` plugin wiring a backend into
//!   the `beforeUseCache` / `findCache` / `hitCache` / `afterRender` hooks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vise_cache::{MemoryPageCache, PageCachePlugin};
//! use vise_hooks::ViseHooks;
//!
//! let cache = PageCachePlugin::new(Arc::new(MemoryPageCache::new())).with_expire(300);
//! let hooks = ViseHooks::new("shop").with_plugin(cache.into_plugin());
//! ```

mod error;
mod plugin;
mod store;

pub use error::*;
pub use plugin::*;
pub use store::*;
