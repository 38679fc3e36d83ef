//! Plugin hooks and the request lifecycle for vise server-side rendering.
//!
//! This crate provides:
//! - `HookName` / `HookSlotId` - Public hook names and internal dispatch slots
//! - `Plugin` / `HookSet` / `ViseHooks` - Plugin hook declarations
//! - `HookRegistry` - Per-slot composition strategies and callback lists
//! - `HookCaller` - Typed hook invocation with tracing through `HookObserver`
//! - `HookLifeCycle` - Turns one `HttpRequest` into one `HttpResponse`
//!
//! # Example
//!
//! ```ignore
//! use vise_hooks::{HookLifeCycle, HookSet, ViseHooks};
//! use vise_core::{RenderResult, SessionExtra, SsrResult};
//!
//! let hooks = ViseHooks::new("demo").with_hooks(HookSet::new().on_render(|ctx| async move {
//!     let page = SsrResult { html: "<p>hello</p>".into(), ..Default::default() };
//!     Ok(Some(RenderResult::rendered(ctx, "", page)))
//! }));
//!
//! let lifecycle = HookLifeCycle::new(hooks)?;
//! let response = lifecycle.start(request, &SessionExtra::new()).await?;
//! ```

mod caller;
mod callback;
mod error;
mod lifecycle;
mod name;
mod phase;
mod plugin;
mod registry;
mod value;
mod wrap;

pub use caller::*;
pub use callback::*;
pub use error::*;
pub use lifecycle::*;
pub use name::*;
pub use phase::*;
pub use plugin::*;
pub use registry::*;
pub use value::*;
