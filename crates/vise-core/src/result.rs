//! Render results: the tagged outcome of one lifecycle run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheInfo;
use crate::context::RenderContext;
use crate::template::fill_ssr_template;

/// A render failure with an HTTP-mappable status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderError {
    /// HTTP status code.
    pub code: u16,
    /// Message served as the response body.
    pub message: String,
    /// Optional diagnostic detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<BTreeMap<String, Value>>,
}

impl RenderError {
    /// Create a render error.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Add a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Markup fragments produced by a renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrResult {
    /// Rendered app markup.
    #[serde(default)]
    pub app: String,
    /// Assembled page; served as the response body.
    #[serde(default)]
    pub html: String,
    /// Page template with `<!--ssr-*-->` placeholders.
    #[serde(default)]
    pub template: String,
    /// Preload link tags.
    #[serde(default)]
    pub preload_links: String,
}

/// Category of a render result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderResultCategory {
    Render,
    Error,
    ReceiveRequest,
    HitCache,
}

impl RenderResultCategory {
    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Error => "error",
            Self::ReceiveRequest => "receiveRequest",
            Self::HitCache => "hitCache",
        }
    }
}

impl fmt::Display for RenderResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific payload of a render result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RenderOutcome {
    /// Successful render.
    Render {
        ssr_result: SsrResult,
        /// Cache info carried from a cache miss, for the caller to populate a store.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_info: Option<CacheInfo>,
    },
    /// Render failure.
    Error { error: RenderError },
    /// Request intercepted by `receiveRequest`.
    ReceiveRequest,
    /// Page served from cache.
    HitCache { content: String, cache_info: CacheInfo },
}

/// The tagged outcome of one lifecycle run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Context the result was produced for.
    pub context: RenderContext,
    /// Name of the plugin that produced the defining value.
    pub render_by: String,
    #[serde(flatten)]
    pub outcome: RenderOutcome,
}

impl RenderResult {
    /// A successful render.
    pub fn rendered(context: RenderContext, render_by: impl Into<String>, ssr_result: SsrResult) -> Self {
        Self {
            context,
            render_by: render_by.into(),
            outcome: RenderOutcome::Render {
                ssr_result,
                cache_info: None,
            },
        }
    }

    /// A render failure.
    pub fn error(context: RenderContext, render_by: impl Into<String>, error: RenderError) -> Self {
        Self {
            context,
            render_by: render_by.into(),
            outcome: RenderOutcome::Error { error },
        }
    }

    /// An intercepted request.
    pub fn intercepted(context: RenderContext, render_by: impl Into<String>) -> Self {
        Self {
            context,
            render_by: render_by.into(),
            outcome: RenderOutcome::ReceiveRequest,
        }
    }

    /// A cache hit.
    pub fn cache_hit(
        context: RenderContext,
        render_by: impl Into<String>,
        content: impl Into<String>,
        cache_info: CacheInfo,
    ) -> Self {
        Self {
            context,
            render_by: render_by.into(),
            outcome: RenderOutcome::HitCache {
                content: content.into(),
                cache_info,
            },
        }
    }

    /// Category of this result.
    pub fn category(&self) -> RenderResultCategory {
        match &self.outcome {
            RenderOutcome::Render { .. } => RenderResultCategory::Render,
            RenderOutcome::Error { .. } => RenderResultCategory::Error,
            RenderOutcome::ReceiveRequest => RenderResultCategory::ReceiveRequest,
            RenderOutcome::HitCache { .. } => RenderResultCategory::HitCache,
        }
    }

    /// Whether this is a successful render.
    pub fn is_rendered(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Render { .. })
    }

    /// Cache info attached to this result, if any.
    pub fn cache_info(&self) -> Option<&CacheInfo> {
        match &self.outcome {
            RenderOutcome::Render { cache_info, .. } => cache_info.as_ref(),
            RenderOutcome::HitCache { cache_info, .. } => Some(cache_info),
            _ => None,
        }
    }

    /// Attach cache info to a successful render. Other categories are left as is.
    pub fn attach_cache_info(&mut self, info: CacheInfo) {
        if let RenderOutcome::Render { cache_info, .. } = &mut self.outcome {
            *cache_info = Some(info);
        }
    }

    /// Copy of this result with `ssrResult.html` rebuilt from the template and
    /// the context's extra. Non-render results are returned unchanged.
    pub fn refill(&self) -> Self {
        let mut result = self.clone();
        if let RenderOutcome::Render { ssr_result, .. } = &mut result.outcome {
            ssr_result.html = fill_ssr_template(ssr_result, &self.context.extra);
        }
        result
    }
}

/// Value returned by a `receiveRequest` callback to intercept a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interception {
    /// Context describing the intercepted request.
    pub context: RenderContext,
}

impl Interception {
    /// Intercept with the given context.
    pub fn new(context: RenderContext) -> Self {
        Self { context }
    }
}
