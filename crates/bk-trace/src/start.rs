//! Opening the job span and the cleanup guard that closes it.

use crate::config::TracingConfig;
use crate::provider::TracerProvider;
use crate::registry::TracerRegistry;
use crate::span::{Span, SpanOutcome, TraceContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the root span for a job run.
pub const JOB_SPAN_NAME: &str = "job.run";

/// Job metadata attached to the job span.
///
/// Fields left as `None` are not recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobMetadata {
    pub job_id: Option<String>,
    pub build_id: Option<String>,
    pub build_number: Option<String>,
    pub pipeline_slug: Option<String>,
    pub organization_slug: Option<String>,
    pub agent_name: Option<String>,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
}

impl JobMetadata {
    /// Attribute key/value pairs for the fields that are set.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let fields = [
            ("buildkite.job_id", &self.job_id),
            ("buildkite.build_id", &self.build_id),
            ("buildkite.build_number", &self.build_number),
            ("buildkite.pipeline_slug", &self.pipeline_slug),
            ("buildkite.organization_slug", &self.organization_slug),
            ("buildkite.agent_name", &self.agent_name),
            ("buildkite.repository", &self.repository),
            ("buildkite.branch", &self.branch),
            ("buildkite.commit", &self.commit),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
            .collect()
    }
}

/// Register the configured tracer and open the job span.
///
/// The span is a child of `parent`'s active span when there is one. The
/// returned context carries the returned span. The guard must be kept
/// alive for the duration of the job; it finishes the span when it is
/// finished explicitly or dropped.
pub fn start_tracing(
    registry: &TracerRegistry,
    parent: &TraceContext,
    config: &TracingConfig,
    metadata: &JobMetadata,
) -> (Span, TraceContext, TracingGuard) {
    let provider = registry.install(config);
    let span = Span::start(Arc::clone(&provider), JOB_SPAN_NAME, parent.span());
    for (key, value) in metadata.attributes() {
        span.set_attribute(key, value);
    }
    tracing::debug!(backend = %provider.backend(), span = JOB_SPAN_NAME, "started job span");

    let cx = parent.with_span(span.clone());
    let guard = TracingGuard {
        span: span.clone(),
        provider,
        done: false,
    };
    (span, cx, guard)
}

/// Cleanup action for a job span.
///
/// Finishing records the span's duration and outcome and flushes the
/// provider. A guard dropped without being finished finishes the span as
/// cancelled, or as failed if the thread is panicking.
#[must_use = "dropping the guard immediately ends the job span as cancelled"]
pub struct TracingGuard {
    span: Span,
    provider: Arc<dyn TracerProvider>,
    done: bool,
}

impl TracingGuard {
    /// The span this guard closes.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Finish the span without an explicit status.
    pub fn finish(self) {
        self.finish_with(SpanOutcome::Unset);
    }

    /// Finish the span with the job's outcome.
    pub fn finish_with(mut self, outcome: SpanOutcome) {
        self.close(outcome);
    }

    fn close(&mut self, outcome: SpanOutcome) {
        if self.done {
            return;
        }
        self.done = true;
        if !self.span.finish_with(outcome) {
            tracing::debug!(span = self.span.name(), "span already finished");
        }
        self.provider.force_flush();
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        let outcome = if std::thread::panicking() {
            SpanOutcome::Failed("panicked".to_string())
        } else {
            SpanOutcome::Cancelled
        };
        self.close(outcome);
    }
}

impl std::fmt::Debug for TracingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingGuard")
            .field("span", &self.span)
            .field("done", &self.done)
            .finish()
    }
}
