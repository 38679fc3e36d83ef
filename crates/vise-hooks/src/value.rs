//! Values flowing through hook slots.

use serde::Serialize;
use vise_core::{
    CacheInfo, FindCacheResult, HitCache, HttpRequest, HttpResponse, Interception, RenderContext,
    RenderResult, ResolvedRequest,
};

/// A value passed into or returned from a hook slot.
///
/// Serializes as the wrapped value, without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HookValue {
    Request(HttpRequest),
    Interception(Interception),
    Resolved(ResolvedRequest),
    Context(RenderContext),
    CacheInfo(CacheInfo),
    CacheContent(String),
    CacheFound(FindCacheResult),
    HitCache(HitCache),
    Result(RenderResult),
    Response(HttpResponse),
}

impl HookValue {
    /// Name of the wrapped value's type, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => HttpRequest::KIND,
            Self::Interception(_) => Interception::KIND,
            Self::Resolved(_) => ResolvedRequest::KIND,
            Self::Context(_) => RenderContext::KIND,
            Self::CacheInfo(_) => CacheInfo::KIND,
            Self::CacheContent(_) => String::KIND,
            Self::CacheFound(_) => FindCacheResult::KIND,
            Self::HitCache(_) => HitCache::KIND,
            Self::Result(_) => RenderResult::KIND,
            Self::Response(_) => HttpResponse::KIND,
        }
    }

    /// Serialize to JSON for tracing and comparison.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A type that can travel through a hook slot.
pub trait HookPayload: Sized + Send + 'static {
    /// Type name used in mismatch errors.
    const KIND: &'static str;

    /// Wrap into a hook value.
    fn into_value(self) -> HookValue;

    /// Unwrap from a hook value, handing the value back on mismatch.
    fn from_value(value: HookValue) -> Result<Self, HookValue>;
}

macro_rules! hook_payload {
    ($($ty:ty => $variant:ident, $kind:literal;)*) => {
        $(
            impl HookPayload for $ty {
                const KIND: &'static str = $kind;

                fn into_value(self) -> HookValue {
                    HookValue::$variant(self)
                }

                fn from_value(value: HookValue) -> Result<Self, HookValue> {
                    match value {
                        HookValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

hook_payload! {
    HttpRequest => Request, "HttpRequest";
    Interception => Interception, "Interception";
    ResolvedRequest => Resolved, "ResolvedRequest";
    RenderContext => Context, "RenderContext";
    CacheInfo => CacheInfo, "CacheInfo";
    String => CacheContent, "cache content";
    FindCacheResult => CacheFound, "FindCacheResult";
    HitCache => HitCache, "HitCache";
    RenderResult => Result, "RenderResult";
    HttpResponse => Response, "HttpResponse";
}
