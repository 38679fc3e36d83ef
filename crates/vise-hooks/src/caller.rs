//! Typed hook invocation with tracing.

use std::sync::Arc;
use std::time::Duration;

use vise_core::json::deep_equal;
use vise_core::{
    CacheInfo, FindCacheResult, HitCache, HttpRequest, HttpResponse, RenderContext, RenderResult,
    ResolvedRequest,
};

use crate::error::{HookError, HookResult};
use crate::name::HookName;
use crate::phase::LifecyclePhase;
use crate::registry::HookRegistry;
use crate::value::{HookPayload, HookValue};

/// Observer of hook interceptions and lifecycle phases.
pub trait HookObserver: Send + Sync {
    /// Called when a hook intercepted the lifecycle with `value`.
    fn on_hook(&self, hook: HookName, value: &HookValue);

    /// Called when a lifecycle phase is entered.
    fn on_phase(&self, _phase: LifecyclePhase, _elapsed: Duration) {}
}

/// Invokes hooks through a registry, one typed method per hook.
///
/// When an observer is set, it is notified whenever a hook intercepts:
/// - Parallel-Bail hooks: the output is defined.
/// - Series-Waterfall hooks: the output differs from the input
///   (`requestResolved`: `resolved` differs from `original`).
/// - `render` and `hitCache`: always.
#[derive(Clone)]
pub struct HookCaller {
    registry: Arc<HookRegistry>,
    observer: Option<Arc<dyn HookObserver>>,
}

impl HookCaller {
    /// Create a caller over a registry.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self {
            registry,
            observer: None,
        }
    }

    /// Set the observer.
    pub fn with_observer(mut self, observer: Arc<dyn HookObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The registry hooks are invoked through.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub(crate) fn observer(&self) -> Option<&Arc<dyn HookObserver>> {
        self.observer.as_ref()
    }

    async fn call(&self, hook: HookName, input: HookValue) -> HookResult<Option<HookValue>> {
        self.registry.invoke(hook.slot(), input).await
    }

    fn notify(&self, hook: HookName, value: &HookValue) {
        if let Some(observer) = &self.observer {
            observer.on_hook(hook, value);
        }
    }

    fn notify_changed<T>(&self, hook: HookName, before: &T, after: &T)
    where
        T: HookPayload + Clone + serde::Serialize,
    {
        if self.observer.is_some() && !deep_equal(before, after) {
            self.notify(hook, &after.clone().into_value());
        }
    }

    /// Run `receiveRequest`. A defined result is an intercepted `RenderResult`.
    pub async fn receive_request(&self, request: &HttpRequest) -> HookResult<Option<RenderResult>> {
        let hook = HookName::ReceiveRequest;
        let output = self.call(hook, request.clone().into_value()).await?;
        self.bail_output(hook, output)
    }

    /// Run `requestResolved` over a fresh `{original, resolved}` pair.
    pub async fn request_resolved(&self, context: &RenderContext) -> HookResult<ResolvedRequest> {
        let hook = HookName::RequestResolved;
        let output = self
            .call(hook, ResolvedRequest::new(context.clone()).into_value())
            .await?;
        let resolved: ResolvedRequest = waterfall_output(hook, output)?;
        self.notify_changed(hook, &resolved.original, &resolved.resolved);
        Ok(resolved)
    }

    /// Run `beforeUseCache`.
    pub async fn before_use_cache(&self, context: &RenderContext) -> HookResult<Option<CacheInfo>> {
        let hook = HookName::BeforeUseCache;
        let output = self.call(hook, context.clone().into_value()).await?;
        self.bail_output(hook, output)
    }

    /// Run `findCache`. A defined result carries the finding plugin.
    pub async fn find_cache(&self, info: &CacheInfo) -> HookResult<Option<FindCacheResult>> {
        let hook = HookName::FindCache;
        let output = self.call(hook, info.clone().into_value()).await?;
        self.bail_output(hook, output)
    }

    /// Run `hitCache` and wait for every callback.
    pub async fn hit_cache(&self, hit: &HitCache) -> HookResult<()> {
        let hook = HookName::HitCache;
        let value = hit.clone().into_value();
        self.notify(hook, &value);
        self.call(hook, value).await?;
        Ok(())
    }

    /// Run `beforeRender`.
    pub async fn before_render(&self, context: RenderContext) -> HookResult<RenderContext> {
        let hook = HookName::BeforeRender;
        let before = self.observer.as_ref().map(|_| context.clone());
        let output = self.call(hook, context.into_value()).await?;
        let context: RenderContext = waterfall_output(hook, output)?;
        if let Some(before) = before {
            self.notify_changed(hook, &before, &context);
        }
        Ok(context)
    }

    /// Run `render`.
    pub async fn render(&self, context: &RenderContext) -> HookResult<Option<RenderResult>> {
        let hook = HookName::Render;
        let output = self.call(hook, context.clone().into_value()).await?;
        match output {
            Some(value) => {
                self.notify(hook, &value);
                decode(hook, value).map(Some)
            }
            None => {
                self.notify(hook, &context.clone().into_value());
                Ok(None)
            }
        }
    }

    /// Run `afterRender`.
    pub async fn after_render(&self, result: RenderResult) -> HookResult<RenderResult> {
        let hook = HookName::AfterRender;
        let before = self.observer.as_ref().map(|_| result.clone());
        let output = self.call(hook, result.into_value()).await?;
        let result: RenderResult = waterfall_output(hook, output)?;
        if let Some(before) = before {
            self.notify_changed(hook, &before, &result);
        }
        Ok(result)
    }

    /// Run `beforeResponse`.
    pub async fn before_response(&self, result: &RenderResult) -> HookResult<Option<HttpResponse>> {
        let hook = HookName::BeforeResponse;
        let output = self.call(hook, result.clone().into_value()).await?;
        self.bail_output(hook, output)
    }

    fn bail_output<T: HookPayload>(
        &self,
        hook: HookName,
        output: Option<HookValue>,
    ) -> HookResult<Option<T>> {
        let Some(value) = output else {
            return Ok(None);
        };
        self.notify(hook, &value);
        decode(hook, value).map(Some)
    }
}

impl std::fmt::Debug for HookCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookCaller")
            .field("registry", &self.registry)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

fn decode<T: HookPayload>(hook: HookName, value: HookValue) -> HookResult<T> {
    T::from_value(value).map_err(|value| HookError::ValueMismatch {
        hook: hook.as_str(),
        expected: T::KIND,
        found: value.kind(),
    })
}

fn waterfall_output<T: HookPayload>(hook: HookName, output: Option<HookValue>) -> HookResult<T> {
    match output {
        Some(value) => decode(hook, value),
        None => Err(HookError::ValueMismatch {
            hook: hook.as_str(),
            expected: T::KIND,
            found: "nothing",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::HookSet;
    use crate::plugin::{Plugin, ViseHooks};
    use std::sync::Mutex;
    use vise_core::{RenderContextExtra, SsrResult};

    #[derive(Default)]
    struct Recorder {
        hooks: Mutex<Vec<HookName>>,
    }

    impl HookObserver for Recorder {
        fn on_hook(&self, hook: HookName, _value: &HookValue) {
            self.hooks.lock().unwrap().push(hook);
        }
    }

    impl Recorder {
        fn seen(&self) -> Vec<HookName> {
            self.hooks.lock().unwrap().clone()
        }
    }

    fn caller(hooks: HookSet) -> (HookCaller, Arc<Recorder>) {
        let registry = HookRegistry::from_hooks(&ViseHooks::new("demo").with_hooks(hooks)).unwrap();
        let recorder = Arc::new(Recorder::default());
        let caller = HookCaller::new(Arc::new(registry)).with_observer(recorder.clone());
        (caller, recorder)
    }

    fn context(url: &str) -> RenderContext {
        RenderContext::new(HttpRequest::new(url), RenderContextExtra::default())
    }

    // === Interception Tracing Tests ===

    #[tokio::test]
    async fn test_undefined_bail_output_is_not_traced() {
        let (caller, recorder) = caller(HookSet::new().on_before_use_cache(|_| async { Ok(None) }));
        assert!(caller.before_use_cache(&context("/a")).await.unwrap().is_none());
        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_defined_bail_output_is_traced() {
        let (caller, recorder) = caller(
            HookSet::new().on_before_use_cache(|ctx| async move {
                Ok(Some(CacheInfo::new(ctx.request.url, 30)))
            }),
        );
        let info = caller.before_use_cache(&context("/a")).await.unwrap();
        assert_eq!(info, Some(CacheInfo::new("/a", 30)));
        assert_eq!(recorder.seen(), vec![HookName::BeforeUseCache]);
    }

    #[tokio::test]
    async fn test_unchanged_waterfall_is_not_traced() {
        let (caller, recorder) = caller(
            HookSet::new()
                .on_before_render(|ctx| async move { Ok(ctx) })
                .on_request_resolved(|resolved| async move { Ok(resolved) }),
        );
        caller.before_render(context("/a")).await.unwrap();
        caller.request_resolved(&context("/a")).await.unwrap();
        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn test_changed_waterfall_is_traced() {
        let (caller, recorder) = caller(
            HookSet::new()
                .on_request_resolved(|mut resolved| async move {
                    resolved.resolved.request.url = "/b".into();
                    Ok(resolved)
                })
                .on_before_render(|mut ctx| async move {
                    ctx.extra.title = "Title".into();
                    Ok(ctx)
                }),
        );
        let resolved = caller.request_resolved(&context("/a")).await.unwrap();
        assert_eq!(resolved.original.request.url, "/a");
        assert_eq!(resolved.resolved.request.url, "/b");

        let ctx = caller.before_render(context("/a")).await.unwrap();
        assert_eq!(ctx.extra.title, "Title");
        assert_eq!(
            recorder.seen(),
            vec![HookName::RequestResolved, HookName::BeforeRender]
        );
    }

    #[tokio::test]
    async fn test_render_always_traced() {
        let (caller, recorder) = caller(HookSet::new().on_render(|_| async { Ok(None) }));
        assert!(caller.render(&context("/a")).await.unwrap().is_none());
        assert_eq!(recorder.seen(), vec![HookName::Render]);
    }

    #[tokio::test]
    async fn test_hit_cache_always_traced() {
        let (caller, recorder) = caller(HookSet::new());
        let hit = HitCache {
            cache_info: CacheInfo::new("k", 1),
            content: "cached".into(),
        };
        caller.hit_cache(&hit).await.unwrap();
        assert_eq!(recorder.seen(), vec![HookName::HitCache]);
    }

    // === Typed Output Tests ===

    #[tokio::test]
    async fn test_render_result_is_stamped() {
        let (caller, _) = caller(HookSet::new().on_render(|ctx| async move {
            Ok(Some(RenderResult::rendered(ctx, "", SsrResult::default())))
        }));
        let result = caller.render(&context("/a")).await.unwrap().unwrap();
        assert_eq!(result.render_by, "app-demo");
    }

    #[tokio::test]
    async fn test_find_cache_uses_inner_slot() {
        let registry = HookRegistry::from_hooks(
            &ViseHooks::new("demo").with_plugin(Plugin::new(
                "vise:page-cache",
                HookSet::new().on_find_cache(|_| async { Ok(Some("cached".to_string())) }),
            )),
        )
        .unwrap();
        let caller = HookCaller::new(Arc::new(registry));

        let found = caller.find_cache(&CacheInfo::new("k", 1)).await.unwrap().unwrap();
        assert_eq!(found.content, "cached");
        assert_eq!(found.render_by, "vise:page-cache");
    }
}
