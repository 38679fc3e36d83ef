//! Lifecycle phase tracking.

use std::fmt;
use std::time::{Duration, Instant};

/// Phases of one lifecycle run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// `receiveRequest` may intercept the request.
    ReceivingRequest,
    /// `requestResolved` rewrites the context.
    RequestResolved,
    /// `beforeUseCache` / `findCache` / `hitCache`.
    CacheCheck,
    /// `beforeRender` / `render`.
    Rendering,
    /// `afterRender` / `beforeResponse`, then the response is built.
    End,
}

impl LifecyclePhase {
    /// Phase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceivingRequest => "receiving_request",
            Self::RequestResolved => "request_resolved",
            Self::CacheCheck => "cache_check",
            Self::Rendering => "rendering",
            Self::End => "end",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase timings of one lifecycle run.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: Vec<(LifecyclePhase, Instant)>,
}

impl TimingContext {
    /// Start timing now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Record entering a phase.
    pub fn enter(&mut self, phase: LifecyclePhase) {
        self.marks.push((phase, Instant::now()));
    }

    /// Phases entered so far, in order.
    pub fn phases(&self) -> Vec<LifecyclePhase> {
        self.marks.iter().map(|(phase, _)| *phase).collect()
    }

    /// Whether a phase was entered.
    pub fn visited(&self, phase: LifecyclePhase) -> bool {
        self.marks.iter().any(|(p, _)| *p == phase)
    }

    /// Time from start to entering a phase.
    pub fn time_to(&self, phase: LifecyclePhase) -> Option<Duration> {
        self.marks
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, at)| at.duration_since(self.start))
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}
