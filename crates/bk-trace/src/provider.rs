//! Tracer providers.
//!
//! A [`TracerProvider`] is the seam between the span lifecycle and a real
//! tracing library. [`NoopProvider`] records nothing and never touches the
//! network. [`OtelProvider`] records spans with the OpenTelemetry SDK and
//! exports them over OTLP/HTTP, which is how spans reach a Datadog agent.

use crate::config::{TracingBackend, TracingConfig};
use crate::error::{Result, TraceError};
use crate::span::{Span, SpanHandle, SpanOutcome};
use opentelemetry::trace::{Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_sdk::Resource;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// Instrumentation scope reported with every span.
const INSTRUMENTATION_NAME: &str = "bk-trace";

/// Capability that starts spans for one tracing backend.
pub trait TracerProvider: Send + Sync + fmt::Debug {
    /// Which backend this provider talks to.
    fn backend(&self) -> TracingBackend;

    /// Start recording a span.
    fn start_span(&self, name: &str, parent: Option<&Span>) -> Box<dyn SpanHandle>;

    /// Push buffered spans to the backend.
    fn force_flush(&self) {}

    /// Flush and release backend resources.
    fn shutdown(&self) {}
}

/// Provider whose spans do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

struct NoopHandle;

impl SpanHandle for NoopHandle {
    fn set_attribute(&mut self, _key: &str, _value: &str) {}

    fn end(&mut self, _outcome: &SpanOutcome, _at: SystemTime) {}

    fn otel_context(&self) -> Context {
        Context::new()
    }
}

impl TracerProvider for NoopProvider {
    fn backend(&self) -> TracingBackend {
        TracingBackend::None
    }

    fn start_span(&self, _name: &str, _parent: Option<&Span>) -> Box<dyn SpanHandle> {
        Box::new(NoopHandle)
    }
}

/// Provider backed by the OpenTelemetry SDK.
///
/// Shut down explicitly or when the last handle is dropped. Spans hold a
/// handle, so a provider replaced in the registry keeps exporting until the
/// jobs that started on it have finished.
pub struct OtelProvider {
    backend: TracingBackend,
    provider: sdktrace::TracerProvider,
    tracer: sdktrace::Tracer,
    shut_down: AtomicBool,
}

impl OtelProvider {
    /// Provider exporting to the Datadog agent's OTLP receiver.
    ///
    /// Spans are exported synchronously when they end, bounded by the
    /// configured export timeout.
    pub fn datadog(config: &TracingConfig) -> Result<Self> {
        let endpoint = config.otlp_endpoint()?;
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .with_timeout(config.export_timeout())
            .build()
            .map_err(|e| TraceError::Exporter(e.to_string()))?;

        Ok(Self::with_exporter(
            TracingBackend::Datadog,
            exporter,
            &config.service_name,
        ))
    }

    /// Provider exporting to an arbitrary span exporter.
    pub fn with_exporter<E>(backend: TracingBackend, exporter: E, service_name: &str) -> Self
    where
        E: SpanExporter + 'static,
    {
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]);
        let provider = sdktrace::TracerProvider::builder()
            .with_simple_exporter(exporter)
            .with_config(sdktrace::Config::default().with_resource(resource))
            .build();
        let tracer = provider.tracer(INSTRUMENTATION_NAME);

        Self {
            backend,
            provider,
            tracer,
            shut_down: AtomicBool::new(false),
        }
    }
}

impl Drop for OtelProvider {
    fn drop(&mut self) {
        TracerProvider::shutdown(self);
    }
}

impl fmt::Debug for OtelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelProvider")
            .field("backend", &self.backend)
            .finish()
    }
}

struct OtelHandle {
    cx: Context,
}

impl SpanHandle for OtelHandle {
    fn set_attribute(&mut self, key: &str, value: &str) {
        self.cx
            .span()
            .set_attribute(KeyValue::new(key.to_string(), value.to_string()));
    }

    fn end(&mut self, outcome: &SpanOutcome, at: SystemTime) {
        let span = self.cx.span();
        match outcome {
            SpanOutcome::Unset => {}
            SpanOutcome::Success => span.set_status(Status::Ok),
            SpanOutcome::Failed(message) => span.set_status(Status::error(message.clone())),
            SpanOutcome::Cancelled => {
                span.set_attribute(KeyValue::new("job.cancelled", true));
                span.set_status(Status::error("cancelled"));
            }
        }
        span.end_with_timestamp(at);
    }

    fn otel_context(&self) -> Context {
        self.cx.clone()
    }
}

impl TracerProvider for OtelProvider {
    fn backend(&self) -> TracingBackend {
        self.backend
    }

    fn start_span(&self, name: &str, parent: Option<&Span>) -> Box<dyn SpanHandle> {
        let parent_cx = parent.map(Span::otel_context).unwrap_or_default();
        let span = self.tracer.start_with_context(name.to_string(), &parent_cx);
        Box::new(OtelHandle {
            cx: parent_cx.with_span(span),
        })
    }

    fn force_flush(&self) {
        for result in self.provider.force_flush() {
            if let Err(err) = result {
                tracing::warn!(error = %err, backend = %self.backend, "failed to flush spans");
            }
        }
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.provider.shutdown() {
            tracing::warn!(error = %err, backend = %self.backend, "failed to shut down tracer");
        }
    }
}

/// Build the provider selected by `config`.
///
/// Never fails: a backend that cannot be constructed degrades to
/// [`NoopProvider`] with a warning.
pub fn build_provider(config: &TracingConfig) -> std::sync::Arc<dyn TracerProvider> {
    match config.backend {
        TracingBackend::None => std::sync::Arc::new(NoopProvider),
        TracingBackend::Datadog => match OtelProvider::datadog(config) {
            Ok(provider) => {
                tracing::debug!(address = %config.address, "registered datadog tracer");
                std::sync::Arc::new(provider)
            }
            Err(err) => {
                tracing::warn!(error = %err, "datadog tracer unavailable, tracing disabled");
                std::sync::Arc::new(NoopProvider)
            }
        },
    }
}
