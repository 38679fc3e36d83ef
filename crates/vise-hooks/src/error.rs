//! Hook error type.

use thiserror::Error;
use vise_core::CoreError;

/// Result type for hook callbacks and hook invocation.
pub type HookResult<T> = Result<T, HookError>;

/// Errors raised while merging plugins or invoking hooks.
#[derive(Error, Debug)]
pub enum HookError {
    /// A plugin name does not match the legal naming pattern.
    ///
    /// Raised while merging plugins, before any request is served.
    #[error("illegal vise plugin name: {0}")]
    InvalidPluginName(String),

    /// A hook name is not one of the recognized hooks.
    #[error("unknown hook: {0}")]
    UnknownHook(String),

    /// A callback failed.
    #[error("{0}")]
    Failed(#[from] anyhow::Error),

    /// A callback panicked.
    #[error("callback of plugin '{plugin}' on hook '{hook}' panicked: {message}")]
    Panicked {
        hook: &'static str,
        plugin: String,
        message: String,
    },

    /// A callback received or returned a value of the wrong shape.
    #[error("hook '{hook}' expected {expected} but got {found}")]
    ValueMismatch {
        hook: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A core value could not be built.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl HookError {
    /// Create a callback failure from a message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{}", message))
    }
}
