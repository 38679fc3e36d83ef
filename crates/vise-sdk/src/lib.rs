//! Public SDK for vise server-side rendering.
//!
//! This crate re-exports the vise crates and adds `ViseApp`, which builds a
//! request handler from a `ViseConfig`:
//!
//! ```ignore
//! use vise_sdk::prelude::*;
//!
//! let config = ViseConfig::load("vise.toml")?;
//! let server = ViseApp::new(config)
//!     .with_hooks(HookSet::new().on_render(|ctx| async move {
//!         let page = SsrResult { html: "<p>hello</p>".into(), ..Default::default() };
//!         Ok(Some(RenderResult::rendered(ctx, "", page)))
//!     }))
//!     .build()?;
//!
//! let response = server.handle(HttpRequest::new("/")).await?;
//! ```

mod app;

pub use app::*;

pub use vise_cache;
pub use vise_core;
pub use vise_hooks;
pub use vise_observability;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::app::*;
    pub use vise_cache::*;
    pub use vise_core::*;
    pub use vise_hooks::*;
    pub use vise_observability::*;
}
