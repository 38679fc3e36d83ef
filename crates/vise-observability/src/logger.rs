//! Hook interception logger.

use std::sync::Arc;
use std::time::Duration;

use vise_core::{LogSinkKind, LoggingConfig};
use vise_hooks::{HookName, HookObserver, HookValue, LifecyclePhase};

use crate::processor::summarize;
use crate::sink::{LogEntry, LogFormat, LogLevel, LogSink, StderrSink, TracingSink};

/// Traces every hook that intercepts a lifecycle run.
///
/// Each trace is one info entry: `[hook] "<name>" intercept with: <summary>`.
/// Phase changes are written at debug level.
#[derive(Clone)]
pub struct HookLogger {
    sink: Arc<dyn LogSink>,
    full_log: bool,
    enabled: bool,
}

impl HookLogger {
    /// Create a logger writing to a sink.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            full_log: false,
            enabled: true,
        }
    }

    /// Create a logger from configuration.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let sink: Arc<dyn LogSink> = match config.sink {
            LogSinkKind::Tracing => Arc::new(TracingSink),
            LogSinkKind::StderrJson => Arc::new(StderrSink::new(LogFormat::Json)),
            LogSinkKind::StderrHuman => Arc::new(StderrSink::new(LogFormat::Human)),
        };
        Self {
            sink,
            full_log: config.full_log,
            enabled: config.enabled,
        }
    }

    /// Log complete values instead of summaries.
    pub fn with_full_log(mut self, full_log: bool) -> Self {
        self.full_log = full_log;
        self
    }

    /// Enable or disable tracing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Format the trace line of an interception, if there is anything to trace.
    pub fn format(&self, hook: HookName, value: &HookValue) -> Option<String> {
        let summary = summarize(hook, value, self.full_log);
        (!summary.is_empty()).then(|| format!("[hook] \"{}\" intercept with: {}", hook, summary))
    }

    /// Trace an interception.
    pub fn log(&self, hook: HookName, value: &HookValue) {
        if !self.enabled {
            return;
        }
        if let Some(message) = self.format(hook, value) {
            self.sink
                .write(&LogEntry::new(LogLevel::Info, message).with_hook(hook.as_str()));
        }
    }
}

impl HookObserver for HookLogger {
    fn on_hook(&self, hook: HookName, value: &HookValue) {
        self.log(hook, value);
    }

    fn on_phase(&self, phase: LifecyclePhase, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let entry = LogEntry::new(LogLevel::Debug, format!("entered {}", phase))
            .with_field("phase", phase.as_str())
            .with_field("elapsed_us", elapsed.as_micros() as u64);
        self.sink.write(&entry);
    }
}

impl std::fmt::Debug for HookLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookLogger")
            .field("full_log", &self.full_log)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use vise_core::{
        CacheInfo, HttpRequest, RenderContext, RenderContextExtra, RenderResult, SessionExtra,
        SsrResult,
    };
    use vise_hooks::{HookLifeCycle, HookSet, ViseHooks};

    fn logger() -> (HookLogger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (HookLogger::new(sink.clone()), sink)
    }

    #[test]
    fn test_trace_line_format() {
        let (logger, sink) = logger();
        logger.log(
            HookName::BeforeUseCache,
            &HookValue::CacheInfo(CacheInfo::new("/a", 10)),
        );
        assert_eq!(
            sink.messages(LogLevel::Info),
            vec![r#"[hook] "beforeUseCache" intercept with: {"expire":10,"key":"/a","stale":false}"#
                .to_string()]
        );
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let (logger, sink) = logger();
        let logger = logger.with_enabled(false);
        logger.log(
            HookName::BeforeUseCache,
            &HookValue::CacheInfo(CacheInfo::new("/a", 10)),
        );
        logger.on_phase(LifecyclePhase::End, Duration::from_millis(1));
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = LoggingConfig {
            enabled: true,
            full_log: true,
            sink: LogSinkKind::StderrHuman,
        };
        let logger = HookLogger::from_config(&config);
        assert!(logger.full_log);
        assert!(logger.enabled);
    }

    #[tokio::test]
    async fn test_observes_lifecycle() {
        let hooks = HookSet::new()
            .on_before_render(|mut ctx: RenderContext| async move {
                ctx.extra.title = "Home".into();
                Ok(ctx)
            })
            .on_render(|ctx| async move {
                let page = SsrResult {
                    app: "<p>hi</p>".into(),
                    html: "<p>hi</p>".into(),
                    ..Default::default()
                };
                Ok(Some(RenderResult::rendered(ctx, "", page)))
            })
            .on_after_render(|result| async move { Ok(result) });

        let (logger, sink) = logger();
        let lifecycle = HookLifeCycle::new(ViseHooks::new("demo").with_hooks(hooks))
            .unwrap()
            .with_observer(Arc::new(logger));
        lifecycle
            .start(HttpRequest::new("/"), &SessionExtra::new())
            .await
            .unwrap();

        let traced: Vec<_> = sink
            .entries()
            .into_iter()
            .filter(|entry| entry.level == LogLevel::Info)
            .filter_map(|entry| entry.hook)
            .collect();
        assert_eq!(traced, vec!["beforeRender", "render"]);

        let phases = sink.entries().len() - traced.len();
        assert_eq!(phases, 5);
    }

    #[test]
    fn test_render_with_context_is_traced() {
        let (logger, sink) = logger();
        let ctx = RenderContext::new(HttpRequest::new("/"), RenderContextExtra::default());
        logger.on_hook(HookName::Render, &HookValue::Context(ctx));
        assert_eq!(
            sink.messages(LogLevel::Info),
            vec![r#"[hook] "render" intercept with: {"renderBy":null,"result":null}"#.to_string()]
        );
    }
}
