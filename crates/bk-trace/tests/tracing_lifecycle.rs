//! Job span lifecycle tests.
//!
//! Spans are recorded with the SDK's in-memory exporter so parent/child
//! links and statuses can be checked without any network egress.

use bk_trace::{
    start_tracing, JobMetadata, OtelProvider, SpanOutcome, TraceContext, TracerProvider,
    TracerRegistry, TracingBackend, TracingConfig, JOB_SPAN_NAME,
};
use opentelemetry::trace::Status;
use opentelemetry::Value;
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
use std::sync::Arc;

fn in_memory_registry(service: &str) -> (TracerRegistry, InMemorySpanExporter, TracingConfig) {
    let exporter = InMemorySpanExporter::default();
    let provider = OtelProvider::with_exporter(TracingBackend::Datadog, exporter.clone(), service);
    let config = TracingConfig::datadog("127.0.0.1:1").with_service_name(service);
    let registry = TracerRegistry::new();
    registry.install_provider(config.clone(), Arc::new(provider));
    (registry, exporter, config)
}

fn finished(exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    exporter.get_finished_spans().unwrap()
}

fn find<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("span {name} not exported"))
}

fn attribute<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

// ============================================================================
// Backend selection
// ============================================================================

#[test]
fn default_config_registers_noop() {
    let registry = TracerRegistry::new();
    let (span, cx, guard) = start_tracing(
        &registry,
        &TraceContext::background(),
        &TracingConfig::default(),
        &JobMetadata::default(),
    );

    assert_eq!(registry.current().backend(), TracingBackend::None);
    assert_eq!(span.provider().backend(), TracingBackend::None);
    assert_eq!(cx.span(), Some(&span));
    guard.finish();
}

#[test]
fn datadog_config_registers_otel_provider() {
    let registry = TracerRegistry::new();
    let config = TracingConfig::datadog("127.0.0.1:1")
        .with_export_timeout(std::time::Duration::from_millis(50));
    let (span, cx, guard) = start_tracing(
        &registry,
        &TraceContext::background(),
        &config,
        &JobMetadata::default(),
    );

    assert_eq!(registry.current().backend(), TracingBackend::Datadog);
    assert_eq!(cx.span(), Some(&span));

    // Nothing listens on port 1; export fails quietly.
    guard.finish_with(SpanOutcome::Success);
    assert!(span.is_finished());
    registry.shutdown();
}

#[test]
fn misconfigured_datadog_degrades_to_noop() {
    let registry = TracerRegistry::new();
    let (span, _cx, guard) = start_tracing(
        &registry,
        &TraceContext::background(),
        &TracingConfig::datadog(""),
        &JobMetadata::default(),
    );
    assert_eq!(span.provider().backend(), TracingBackend::None);
    guard.finish_with(SpanOutcome::Success);
}

// ============================================================================
// Cleanup
// ============================================================================

#[test]
fn early_return_records_cancellation() {
    fn run_job(registry: &TracerRegistry, config: &TracingConfig) -> Result<(), String> {
        let (_span, _cx, _guard) = start_tracing(
            registry,
            &TraceContext::background(),
            config,
            &JobMetadata::default(),
        );
        Err("checkout failed".to_string())
    }

    let (registry, exporter, config) = in_memory_registry("early-return");
    assert!(run_job(&registry, &config).is_err());

    let spans = finished(&exporter);
    assert_eq!(spans.len(), 1);
    let job = find(&spans, JOB_SPAN_NAME);
    assert_eq!(attribute(job, "job.cancelled"), Some(&Value::Bool(true)));
}

#[test]
fn cleanup_exports_exactly_one_span() {
    let (registry, exporter, config) = in_memory_registry("exactly-once");
    let (span, _cx, guard) = start_tracing(
        &registry,
        &TraceContext::background(),
        &config,
        &JobMetadata::default(),
    );

    assert!(span.finish_with(SpanOutcome::Success));
    guard.finish_with(SpanOutcome::Failed("late".into()));
    assert!(!span.finish());

    let spans = finished(&exporter);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, Status::Ok);
}

#[test]
fn failed_outcome_records_error_status() {
    let (registry, exporter, config) = in_memory_registry("failed");
    let (_span, _cx, guard) = start_tracing(
        &registry,
        &TraceContext::background(),
        &config,
        &JobMetadata::default(),
    );
    guard.finish_with(SpanOutcome::Failed("exit status 1".into()));

    let spans = finished(&exporter);
    assert_eq!(spans[0].status, Status::error("exit status 1"));
}

// ============================================================================
// Trace tree
// ============================================================================

#[test]
fn children_share_the_job_trace() {
    let (registry, exporter, config) = in_memory_registry("tree");
    let metadata = JobMetadata {
        job_id: Some("0190-job".into()),
        pipeline_slug: Some("deploy".into()),
        ..JobMetadata::default()
    };
    let (_span, cx, guard) = start_tracing(&registry, &TraceContext::background(), &config, &metadata);

    let (checkout, checkout_cx) = cx.start_child("checkout");
    let (fetch, _) = checkout_cx.start_child("git.fetch");
    fetch.finish_with(SpanOutcome::Success);
    checkout.finish_with(SpanOutcome::Success);
    guard.finish_with(SpanOutcome::Success);

    let spans = finished(&exporter);
    assert_eq!(spans.len(), 3);
    let job = find(&spans, JOB_SPAN_NAME);
    let checkout = find(&spans, "checkout");
    let fetch = find(&spans, "git.fetch");

    let trace_id = job.span_context.trace_id();
    assert_eq!(checkout.span_context.trace_id(), trace_id);
    assert_eq!(fetch.span_context.trace_id(), trace_id);
    assert_eq!(checkout.parent_span_id, job.span_context.span_id());
    assert_eq!(fetch.parent_span_id, checkout.span_context.span_id());

    assert_eq!(
        attribute(job, "buildkite.job_id"),
        Some(&Value::from("0190-job".to_string()))
    );
    assert_eq!(
        attribute(job, "buildkite.pipeline_slug"),
        Some(&Value::from("deploy".to_string()))
    );
    assert!(attribute(job, "buildkite.build_id").is_none());
}

#[test]
fn job_span_nests_under_parent_context() {
    let (registry, exporter, config) = in_memory_registry("nested");
    let (outer, outer_cx, outer_guard) =
        start_tracing(&registry, &TraceContext::background(), &config, &JobMetadata::default());
    let (inner, inner_cx, inner_guard) =
        start_tracing(&registry, &outer_cx, &config, &JobMetadata::default());

    assert_eq!(inner_cx.span(), Some(&inner));
    assert_ne!(inner, outer);
    inner_guard.finish();
    outer_guard.finish();

    let spans = finished(&exporter);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].parent_span_id, spans[1].span_context.span_id());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_reuses_and_replaces() {
    let registry = TracerRegistry::new();
    let config = TracingConfig::default();
    let first = registry.install(&config);
    let again = registry.install(&config);
    assert!(Arc::ptr_eq(&first, &again));

    let replaced = registry.install(&config.clone().with_service_name("other"));
    assert!(!Arc::ptr_eq(&first, &replaced));
    assert!(Arc::ptr_eq(&replaced, &registry.current()));
}

#[test]
fn overlapping_jobs_with_different_configs_both_export() {
    let (registry, exporter, config) = in_memory_registry("job-a");

    let (span_a, _, guard_a) = start_tracing(
        &registry,
        &TraceContext::background(),
        &config,
        &JobMetadata::default(),
    );
    // A second job with another configuration replaces the registered
    // provider while the first job is still running.
    let (span_b, _, guard_b) = start_tracing(
        &registry,
        &TraceContext::background(),
        &TracingConfig::default(),
        &JobMetadata::default(),
    );
    assert_eq!(registry.current().backend(), TracingBackend::None);
    assert_eq!(span_a.provider().backend(), TracingBackend::Datadog);

    guard_b.finish_with(SpanOutcome::Success);
    guard_a.finish_with(SpanOutcome::Success);
    assert!(span_b.is_finished());

    // `span_a` still holds provider A, so the exporter has not been reset.
    let spans = finished(&exporter);
    assert_eq!(spans.len(), 1);
    assert_eq!(find(&spans, JOB_SPAN_NAME).status, Status::Ok);
    drop(span_a);
}

#[test]
fn concurrent_first_install_has_one_winner() {
    let registry = Arc::new(TracerRegistry::new());
    let config = TracingConfig::default().with_service_name("race");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let config = config.clone();
            std::thread::spawn(move || registry.install(&config))
        })
        .collect();
    let providers: Vec<Arc<dyn TracerProvider>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let current = registry.current();
    for provider in &providers {
        assert!(Arc::ptr_eq(provider, &current));
    }
}

#[test]
fn separate_registries_do_not_interfere() {
    let (a, exporter_a, config_a) = in_memory_registry("a");
    let (b, exporter_b, config_b) = in_memory_registry("b");

    let (_, _, guard_a) = start_tracing(&a, &TraceContext::background(), &config_a, &JobMetadata::default());
    let (_, _, guard_b) = start_tracing(&b, &TraceContext::background(), &config_b, &JobMetadata::default());
    guard_a.finish();
    guard_b.finish();

    assert_eq!(finished(&exporter_a).len(), 1);
    assert_eq!(finished(&exporter_b).len(), 1);
}
