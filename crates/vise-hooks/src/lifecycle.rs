//! The request lifecycle: one `HttpRequest` in, one `HttpResponse` out.
//!
//! ```text
//! ReceivingRequest -> RequestResolved -> CacheCheck -> Rendering -> End
//!        |                                   |                      ^
//!        +---------- intercepted ------------+------ cache hit -----+
//! ```

use std::sync::Arc;

use vise_core::{
    strip_router_base, HitCache, HttpRequest, HttpResponse, RenderContext,
    RenderContextExtra, RenderError, RenderOutcome, RenderResult, SessionExtra,
};

use crate::caller::{HookCaller, HookObserver};
use crate::error::{HookError, HookResult};
use crate::phase::{LifecyclePhase, TimingContext};
use crate::plugin::ViseHooks;
use crate::registry::HookRegistry;

/// Provenance of results produced by the lifecycle itself.
pub const DEFAULT_RENDER: &str = "vise:core";

/// Body served when an intercepted request reaches the end of the lifecycle
/// without a plugin producing the response.
pub const INTERCEPTED_WITHOUT_RESPONSE: &str =
    "Fatal Error: Hooks intercept the request with receiveRequest without finish rendering";

/// Message of the error result produced when no `render` callback yields.
pub const NO_RENDER_RESULT: &str = "no render hook produced a result";

/// Everything one lifecycle run produced.
#[derive(Debug, Clone)]
pub struct LifecycleOutput {
    /// Final render result, after `afterRender`.
    pub result: RenderResult,
    /// Response for the hosting server.
    pub response: HttpResponse,
    /// Phase timings.
    pub timing: TimingContext,
}

/// Drives requests through the hook phases of one app.
///
/// The registry is built once and shared; `run` may be called concurrently.
#[derive(Debug, Clone)]
pub struct HookLifeCycle {
    caller: HookCaller,
}

impl HookLifeCycle {
    /// Merge an app's plugins and build its lifecycle.
    ///
    /// Fails with `HookError::InvalidPluginName` before any request is served
    /// when a plugin name is illegal.
    pub fn new(hooks: ViseHooks) -> HookResult<Self> {
        let registry = HookRegistry::from_hooks(&hooks)?;
        tracing::info!(app = %hooks.app_name, plugins = hooks.plugins.len() + 1, "vise hooks ready");
        Ok(Self::from_registry(Arc::new(registry)))
    }

    /// Build a lifecycle over an existing registry.
    pub fn from_registry(registry: Arc<HookRegistry>) -> Self {
        Self {
            caller: HookCaller::new(registry),
        }
    }

    /// Set the observer notified of hook interceptions and phases.
    pub fn with_observer(mut self, observer: Arc<dyn HookObserver>) -> Self {
        self.caller = self.caller.with_observer(observer);
        self
    }

    /// The hook caller.
    pub fn caller(&self) -> &HookCaller {
        &self.caller
    }

    /// Serve one request and return only the response.
    pub async fn start(&self, request: HttpRequest, session: &SessionExtra) -> HookResult<HttpResponse> {
        Ok(self.run(request, session).await?.response)
    }

    /// Serve one request.
    ///
    /// Errors raised by callbacks outside `render` are returned; the hosting
    /// server is expected to answer with its own fallback response.
    pub async fn run(&self, request: HttpRequest, session: &SessionExtra) -> HookResult<LifecycleOutput> {
        let mut timing = TimingContext::new();
        let context = initial_context(request, session)?;

        self.enter(&mut timing, LifecyclePhase::ReceivingRequest);
        let result = match self.caller.receive_request(&context.request).await? {
            Some(intercepted) => {
                tracing::debug!(render_by = %intercepted.render_by, "request intercepted");
                intercepted
            }
            None => self.resolve_and_render(context, &mut timing).await?,
        };

        self.enter(&mut timing, LifecyclePhase::End);
        let result = self.caller.after_render(result).await?;
        let response = match self.caller.before_response(&result).await? {
            Some(response) => response,
            None => default_response(&result),
        };

        Ok(LifecycleOutput {
            result,
            response,
            timing,
        })
    }

    async fn resolve_and_render(
        &self,
        context: RenderContext,
        timing: &mut TimingContext,
    ) -> HookResult<RenderResult> {
        self.enter(timing, LifecyclePhase::RequestResolved);
        let context = self.caller.request_resolved(&context).await?.resolved;

        self.enter(timing, LifecyclePhase::CacheCheck);
        let cache_info = self.caller.before_use_cache(&context).await?;
        if let Some(info) = cache_info.as_ref().filter(|info| info.has_key()) {
            if let Some(found) = self.caller.find_cache(info).await? {
                let hit = HitCache {
                    cache_info: info.clone(),
                    content: found.content,
                };
                self.caller.hit_cache(&hit).await?;
                return Ok(RenderResult::cache_hit(
                    context,
                    found.render_by,
                    hit.content,
                    hit.cache_info,
                ));
            }
        }

        self.enter(timing, LifecyclePhase::Rendering);
        let context = self.caller.before_render(context).await?;
        let mut result = self.render(context).await;
        if let Some(info) = cache_info.filter(|info| info.has_key()) {
            result.attach_cache_info(info);
        }
        Ok(result)
    }

    async fn render(&self, context: RenderContext) -> RenderResult {
        if let Some(error) = context.error.clone() {
            return RenderResult::error(context, DEFAULT_RENDER, error);
        }

        match self.caller.render(&context).await {
            Ok(Some(result)) => result,
            Ok(None) => {
                tracing::warn!(url = %context.request.url, "{}", NO_RENDER_RESULT);
                RenderResult::error(context, DEFAULT_RENDER, RenderError::new(500, NO_RENDER_RESULT))
            }
            Err(err) => {
                tracing::error!(url = %context.request.url, error = %err, "render failed");
                RenderResult::error(context, DEFAULT_RENDER, render_failure(&err))
            }
        }
    }

    fn enter(&self, timing: &mut TimingContext, phase: LifecyclePhase) {
        timing.enter(phase);
        if let Some(observer) = self.caller.observer() {
            observer.on_phase(phase, timing.elapsed());
        }
    }
}

/// Build the initial context: merge the session extra over the defaults and
/// strip the router base from the request URL.
pub fn initial_context(request: HttpRequest, session: &SessionExtra) -> HookResult<RenderContext> {
    let extra = RenderContextExtra::with_session(session)?;
    let url = strip_router_base(&request.url, &extra.router_base);
    Ok(RenderContext::new(HttpRequest { url, ..request }, extra))
}

fn render_failure(err: &HookError) -> RenderError {
    RenderError::new(500, err.to_string()).with_detail("stack", format!("{:?}", err))
}

/// The response served when no `beforeResponse` callback produced one.
pub fn default_response(result: &RenderResult) -> HttpResponse {
    match &result.outcome {
        RenderOutcome::Render { ssr_result, .. } => HttpResponse::html(200, ssr_result.html.clone()),
        RenderOutcome::HitCache { content, .. } => HttpResponse::html(200, content.clone()),
        RenderOutcome::Error { error } => HttpResponse::html(error.code, error.message.clone()),
        RenderOutcome::ReceiveRequest => {
            tracing::error!(render_by = %result.render_by, "{}", INTERCEPTED_WITHOUT_RESPONSE);
            HttpResponse::html(500, INTERCEPTED_WITHOUT_RESPONSE)
        }
    }
}
