//! Hook trace logging for vise server-side rendering.
//!
//! This crate provides:
//! - `HookLogger` - A `HookObserver` that traces hook interceptions
//! - `summarize` - Per-hook, truncated summaries of intercepting values
//! - `LogSink` - Output targets: `tracing`, stderr, or memory

mod logger;
mod processor;
mod sink;

pub use logger::*;
pub use processor::*;
pub use sink::*;
