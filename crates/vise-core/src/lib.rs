//! Core data model for the vise server-side rendering lifecycle.
//!
//! This crate provides the values threaded through the hook pipeline:
//! - `HttpRequest` / `HttpResponse` - Request input and terminal output
//! - `RenderContext` / `ResolvedRequest` - Per-request rendering state
//! - `CacheInfo` / `HitCache` - Page cache identity and hits
//! - `RenderResult` - Tagged outcome of one lifecycle run
//! - `json` - Deep equality and structural cloning over JSON values
//! - `ViseConfig` - App configuration and router-base resolution

mod cache;
mod config;
mod context;
mod error;
pub mod json;
mod message;
mod result;
mod router;
mod template;

pub use cache::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use message::*;
pub use result::*;
pub use router::*;
pub use template::*;
