//! App configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::SessionExtra;
use crate::error::CoreError;
use crate::router::{match_app_for_url, AppMatch, AppRouterBase, RouterBase};

/// Configuration of one vise app, loaded from `vise.toml` or `vise.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViseConfig {
    /// App name; the app's own hooks form the plugin `app-<app_name>`.
    pub app_name: String,

    /// Router base of this app.
    #[serde(default)]
    pub router_base: RouterBase,

    /// Title used when no plugin sets one.
    #[serde(default)]
    pub default_title: String,

    /// Router bases of every app served by the same host, in match order.
    #[serde(default)]
    pub apps: Vec<AppRouterBase>,

    /// Hook trace logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Page cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ViseConfig {
    /// Create a config with defaults for everything but the app name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            router_base: RouterBase::default(),
            default_title: String::new(),
            apps: Vec::new(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Parse a TOML config.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a JSON config.
    pub fn from_json_str(content: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Resolve which app serves `url`, across all configured apps.
    pub fn match_app(&self, url: &str) -> Result<AppMatch, CoreError> {
        match_app_for_url(&self.apps, url)
    }

    /// Session extra for a request to this app: the router base found in the
    /// URL and the default title.
    pub fn session_extra(&self, url: &str) -> Result<SessionExtra, CoreError> {
        let router_base = self
            .router_base
            .find_in(url)?
            .unwrap_or_else(|| "/".to_string());

        let mut extra = SessionExtra::new();
        extra.insert("routerBase".into(), Value::String(router_base));
        if !self.default_title.is_empty() {
            extra.insert("title".into(), Value::String(self.default_title.clone()));
        }
        Ok(extra)
    }
}

/// Where hook traces are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogSinkKind {
    /// `tracing` events.
    #[default]
    Tracing,
    /// JSON lines on stderr.
    StderrJson,
    /// Human-readable lines on stderr.
    StderrHuman,
}

/// Hook trace logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether hook traces are emitted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log complete values instead of truncated summaries.
    #[serde(default)]
    pub full_log: bool,
    /// Output sink.
    #[serde(default)]
    pub sink: LogSinkKind,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            full_log: false,
            sink: LogSinkKind::default(),
        }
    }
}

/// Page cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the page cache plugin is installed.
    #[serde(default)]
    pub enabled: bool,
    /// Cache TTL in seconds.
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,
    /// Maximum number of pages kept by the in-memory cache.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_expire_secs() -> u64 {
    60
}

fn default_max_pages() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            expire_secs: default_expire_secs(),
            max_pages: default_max_pages(),
        }
    }
}
