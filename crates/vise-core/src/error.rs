//! Core error type.

use thiserror::Error;

/// Errors raised while building or converting core values.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A router base pattern is not a valid regular expression.
    #[error("invalid router base pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Session extra could not be merged into a render context extra.
    #[error("invalid render context extra: {0}")]
    InvalidExtra(String),

    /// A shared JSON graph contains a cycle and has no tree form.
    #[error("cyclic value cannot be converted to a JSON tree")]
    CyclicValue,

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization or parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
