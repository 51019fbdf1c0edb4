//! Spans and trace contexts.
//!
//! A [`Span`] is a cheap clonable handle; clones share identity, so the
//! span stored in a [`TraceContext`] is the very span handed back to the
//! caller. A span is ended exactly once no matter how many handles call
//! [`Span::finish`].

use crate::provider::{NoopProvider, TracerProvider};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

/// How the traced unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SpanOutcome {
    /// Finished without an explicit status.
    Unset,
    Success,
    Failed(String),
    Cancelled,
}

/// Backend-specific recording for one span.
pub trait SpanHandle: Send {
    fn set_attribute(&mut self, key: &str, value: &str);

    /// End the span. Called at most once.
    fn end(&mut self, outcome: &SpanOutcome, at: SystemTime);

    /// OpenTelemetry context holding this span, used to parent children.
    fn otel_context(&self) -> opentelemetry::Context;
}

/// Result of finishing a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub duration: Duration,
    pub outcome: SpanOutcome,
}

struct SpanState {
    handle: Box<dyn SpanHandle>,
    finished: Option<Finished>,
}

struct SpanInner {
    name: String,
    started_at: SystemTime,
    started: Instant,
    provider: Arc<dyn TracerProvider>,
    state: Mutex<SpanState>,
}

/// Handle to one traced unit of work.
#[derive(Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl Span {
    /// Start a span on `provider`, as a child of `parent` when given.
    pub fn start(provider: Arc<dyn TracerProvider>, name: &str, parent: Option<&Span>) -> Self {
        let handle = provider.start_span(name, parent);
        Self {
            inner: Arc::new(SpanInner {
                name: name.to_string(),
                started_at: SystemTime::now(),
                started: Instant::now(),
                provider,
                state: Mutex::new(SpanState {
                    handle,
                    finished: None,
                }),
            }),
        }
    }

    /// Start a span that records nothing.
    pub fn noop(name: &str) -> Self {
        Self::start(Arc::new(NoopProvider), name, None)
    }

    /// Start a child span on the same provider.
    pub fn child(&self, name: &str) -> Span {
        Span::start(Arc::clone(&self.inner.provider), name, Some(self))
    }

    fn state(&self) -> MutexGuard<'_, SpanState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn started_at(&self) -> SystemTime {
        self.inner.started_at
    }

    /// Provider the span was started on.
    pub fn provider(&self) -> &Arc<dyn TracerProvider> {
        &self.inner.provider
    }

    /// Attach a string attribute. Ignored once the span is finished.
    pub fn set_attribute(&self, key: &str, value: &str) {
        let mut state = self.state();
        if state.finished.is_none() {
            state.handle.set_attribute(key, value);
        }
    }

    /// Finish the span without an explicit status.
    pub fn finish(&self) -> bool {
        self.finish_with(SpanOutcome::Unset)
    }

    /// Finish the span with an outcome.
    ///
    /// Returns `true` if this call ended the span, `false` if it was
    /// already finished.
    pub fn finish_with(&self, outcome: SpanOutcome) -> bool {
        let mut state = self.state();
        if state.finished.is_some() {
            return false;
        }
        let duration = self.inner.started.elapsed();
        let end_time = self.inner.started_at + duration;
        state.handle.end(&outcome, end_time);
        state.finished = Some(Finished { duration, outcome });
        true
    }

    pub fn is_finished(&self) -> bool {
        self.state().finished.is_some()
    }

    /// Duration and outcome, once finished.
    pub fn finished(&self) -> Option<Finished> {
        self.state().finished.clone()
    }

    /// OpenTelemetry context for parenting children of this span.
    pub fn otel_context(&self) -> opentelemetry::Context {
        self.state().handle.otel_context()
    }

    /// Whether two handles refer to the same span.
    pub fn ptr_eq(a: &Span, b: &Span) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        Span::ptr_eq(self, other)
    }
}

impl Eq for Span {}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.inner.name)
            .field("backend", &self.inner.provider.backend())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Carries the active span to nested operations.
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    span: Option<Span>,
}

impl TraceContext {
    /// Context with no active span.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context whose active span is `span`.
    pub fn with_span(&self, span: Span) -> Self {
        Self { span: Some(span) }
    }

    /// The active span, if any.
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    /// Start a child of the active span and a context carrying it.
    ///
    /// Without an active span the child is a no-op root span, so callers
    /// never have to check whether tracing is enabled.
    pub fn start_child(&self, name: &str) -> (Span, TraceContext) {
        let span = match &self.span {
            Some(parent) => parent.child(name),
            None => Span::noop(name),
        };
        let cx = self.with_span(span.clone());
        (span, cx)
    }
}
