//! Router-base resolution and stripping.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Router base patterns compiled so far, keyed by their configured source.
static COMPILED_PATTERNS: LazyLock<RwLock<HashMap<String, Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Router base of an app: a literal prefix or an ordered list of patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouterBase {
    /// Literal base, matched by substring containment.
    Prefix(String),
    /// Regular expressions, optionally written as `/regex/`.
    Patterns(Vec<String>),
}

impl Default for RouterBase {
    fn default() -> Self {
        Self::Prefix("/".to_string())
    }
}

impl RouterBase {
    /// Find the router base of `url` under this configuration.
    ///
    /// A prefix yields itself when contained in the URL; patterns yield the
    /// first non-empty match, in declared order.
    pub fn find_in(&self, url: &str) -> Result<Option<String>, CoreError> {
        match self {
            Self::Prefix(prefix) => Ok(url.contains(prefix.as_str()).then(|| prefix.clone())),
            Self::Patterns(patterns) => {
                for pattern in patterns {
                    let regex = compiled_pattern(pattern)?;
                    if let Some(found) = regex.find(url) {
                        if !found.as_str().is_empty() {
                            return Ok(Some(found.as_str().to_string()));
                        }
                    }
                }
                Ok(None)
            }
        }
    }
}

/// Compiled form of a router base pattern; each pattern is compiled once.
fn compiled_pattern(pattern: &str) -> Result<Regex, CoreError> {
    let cached = COMPILED_PATTERNS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
        .cloned();
    if let Some(regex) = cached {
        return Ok(regex);
    }

    let regex = compile_pattern(pattern)?;
    COMPILED_PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Compile a router base pattern, dropping one leading and one trailing `/`.
fn compile_pattern(pattern: &str) -> Result<Regex, CoreError> {
    let source = pattern.strip_prefix('/').unwrap_or(pattern);
    let source = source.strip_suffix('/').unwrap_or(source);
    Regex::new(source).map_err(|source| CoreError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Router base configuration of one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRouterBase {
    /// App (project) name.
    pub name: String,
    /// Router base of the app.
    pub router_base: RouterBase,
}

impl AppRouterBase {
    /// Create an app router base entry.
    pub fn new(name: impl Into<String>, router_base: RouterBase) -> Self {
        Self {
            name: name.into(),
            router_base,
        }
    }
}

/// The app an incoming URL belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMatch {
    /// Matching app name; empty when no app matched.
    pub project_name: String,
    /// Router base found in the URL; `/` when no app matched.
    pub router_base: String,
}

/// Resolve which app serves `url`. The first matching app wins, in declared order.
pub fn match_app_for_url(apps: &[AppRouterBase], url: &str) -> Result<AppMatch, CoreError> {
    for app in apps {
        if let Some(router_base) = app.router_base.find_in(url)? {
            return Ok(AppMatch {
                project_name: app.name.clone(),
                router_base,
            });
        }
    }

    Ok(AppMatch {
        project_name: String::new(),
        router_base: "/".to_string(),
    })
}

/// Strip `router_base` from the front of `url`.
///
/// Everything after the first occurrence of the base is kept, and a leading
/// `/` is added when missing. When the base does not occur, the first
/// `len(router_base) - 1` characters of the URL are cut.
pub fn strip_router_base(url: &str, router_base: &str) -> String {
    let path = match url.find(router_base) {
        Some(index) => &url[index + router_base.len()..],
        None => {
            let skip = router_base.chars().count().saturating_sub(1);
            let start = url.char_indices().nth(skip).map_or(url.len(), |(i, _)| i);
            &url[start..]
        }
    };

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
