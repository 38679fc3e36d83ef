//! Hook callbacks and the per-plugin hook declaration builder.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use vise_core::{
    CacheInfo, HitCache, HttpRequest, HttpResponse, Interception, RenderContext, RenderResult,
    ResolvedRequest,
};

use crate::error::{HookError, HookResult};
use crate::name::HookName;
use crate::value::{HookPayload, HookValue};

/// Future returned by a type-erased callback.
pub type HookFuture = BoxFuture<'static, HookResult<Option<HookValue>>>;

/// A type-erased callback, as stored in the registry.
///
/// `None` is the undefined result: Parallel-Bail moves on to the next
/// callback, Series-Waterfall keeps the previous value.
pub type RawCallback = Arc<dyn Fn(HookValue) -> HookFuture + Send + Sync>;

/// Ordering constraint of a callback within its hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enforce {
    /// Runs before every unmarked callback.
    Pre,
    /// Runs after every unmarked callback.
    Post,
}

/// One callback declared by a plugin.
#[derive(Clone)]
pub struct HookDecl {
    /// Hook the callback is declared for.
    pub hook: HookName,
    /// The callback, unwrapped.
    pub callback: RawCallback,
    /// Ordering constraint.
    pub enforce: Option<Enforce>,
}

impl std::fmt::Debug for HookDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDecl")
            .field("hook", &self.hook)
            .field("enforce", &self.enforce)
            .finish_non_exhaustive()
    }
}

/// Erase a closure over raw hook values.
pub fn raw_callback<F>(f: F) -> RawCallback
where
    F: Fn(HookValue) -> HookFuture + Send + Sync + 'static,
{
    Arc::new(f)
}

fn mismatch(hook: HookName, expected: &'static str, found: &HookValue) -> HookError {
    HookError::ValueMismatch {
        hook: hook.as_str(),
        expected,
        found: found.kind(),
    }
}

/// Erase a callback that may leave its result undefined.
pub fn optional_callback<I, O, F, Fut>(hook: HookName, f: F) -> RawCallback
where
    I: HookPayload,
    O: HookPayload,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Option<O>>> + Send + 'static,
{
    raw_callback(move |value: HookValue| match I::from_value(value) {
        Ok(input) => f(input)
            .map(|out| out.map(|out| out.map(HookPayload::into_value)))
            .boxed(),
        Err(value) => {
            let err = mismatch(hook, I::KIND, &value);
            async move { Err(err) }.boxed()
        }
    })
}

/// Erase a callback that always returns a value of its input type.
pub fn piped_callback<T, F, Fut>(hook: HookName, f: F) -> RawCallback
where
    T: HookPayload,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<T>> + Send + 'static,
{
    optional_callback(hook, move |input: T| f(input).map(|out| out.map(Some)))
}

/// Erase a callback run for its side effects only.
pub fn effect_callback<I, F, Fut>(hook: HookName, f: F) -> RawCallback
where
    I: HookPayload,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<()>> + Send + 'static,
{
    optional_callback(hook, move |input: I| {
        f(input).map(|out| out.map(|()| None::<HookValue>))
    })
}

/// Hook payloads are themselves payloads, so erased callbacks can be wrapped
/// again without converting.
impl HookPayload for HookValue {
    const KIND: &'static str = "HookValue";

    fn into_value(self) -> HookValue {
        self
    }

    fn from_value(value: HookValue) -> Result<Self, HookValue> {
        Ok(value)
    }
}

/// The hook callbacks declared by one plugin, in registration order.
///
/// Each `on_*` method appends one callback; calling the same method twice
/// registers two callbacks for that hook.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    decls: Vec<HookDecl>,
}

impl HookSet {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an already erased callback.
    pub fn on(mut self, hook: HookName, callback: RawCallback) -> Self {
        self.decls.push(HookDecl {
            hook,
            callback,
            enforce: None,
        });
        self
    }

    /// Set the ordering constraint of the most recently added callback.
    pub fn enforce(mut self, enforce: Enforce) -> Self {
        if let Some(last) = self.decls.last_mut() {
            last.enforce = Some(enforce);
        }
        self
    }

    /// Intercept a request before it is resolved. Returning an interception
    /// ends the lifecycle without rendering.
    pub fn on_receive_request<F, Fut>(self, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<Interception>>> + Send + 'static,
    {
        let hook = HookName::ReceiveRequest;
        self.on(hook, optional_callback(hook, f))
    }

    /// Rewrite the resolved context. The `original` field of the output is
    /// always restored.
    pub fn on_request_resolved<F, Fut>(self, f: F) -> Self
    where
        F: Fn(ResolvedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<ResolvedRequest>> + Send + 'static,
    {
        let hook = HookName::RequestResolved;
        self.on(hook, piped_callback(hook, f))
    }

    /// Decide whether and how the page is cached.
    pub fn on_before_use_cache<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<CacheInfo>>> + Send + 'static,
    {
        let hook = HookName::BeforeUseCache;
        self.on(hook, optional_callback(hook, f))
    }

    /// Look up cached content for a cache key.
    pub fn on_find_cache<F, Fut>(self, f: F) -> Self
    where
        F: Fn(CacheInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<String>>> + Send + 'static,
    {
        let hook = HookName::FindCache;
        self.on(hook, optional_callback(hook, f))
    }

    /// Be notified of a cache hit.
    pub fn on_hit_cache<F, Fut>(self, f: F) -> Self
    where
        F: Fn(HitCache) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<()>> + Send + 'static,
    {
        let hook = HookName::HitCache;
        self.on(hook, effect_callback(hook, f))
    }

    /// Enrich the context before rendering.
    pub fn on_before_render<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<RenderContext>> + Send + 'static,
    {
        let hook = HookName::BeforeRender;
        self.on(hook, piped_callback(hook, f))
    }

    /// Render the page.
    pub fn on_render<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RenderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<RenderResult>>> + Send + 'static,
    {
        let hook = HookName::Render;
        self.on(hook, optional_callback(hook, f))
    }

    /// Post-process or replace the render result.
    pub fn on_after_render<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RenderResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<RenderResult>> + Send + 'static,
    {
        let hook = HookName::AfterRender;
        self.on(hook, piped_callback(hook, f))
    }

    /// Produce the response yourself instead of the default one.
    pub fn on_before_response<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RenderResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Option<HttpResponse>>> + Send + 'static,
    {
        let hook = HookName::BeforeResponse;
        self.on(hook, optional_callback(hook, f))
    }

    /// Declared callbacks, in registration order.
    pub fn decls(&self) -> &[HookDecl] {
        &self.decls
    }

    /// Number of declared callbacks.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Whether no callback is declared.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}
