//! Job-run tracing for the agent bootstrap.
//!
//! [`start_tracing`] registers the configured tracer provider with a
//! [`TracerRegistry`], opens the `job.run` span and hands back a
//! [`TracingGuard`] that closes it on every exit path. Tracing is
//! diagnostic only: a backend that cannot be built degrades to the no-op
//! provider instead of failing the job.
//!
//! # Example
//!
//! ```
//! use bk_trace::{start_tracing, JobMetadata, SpanOutcome, TraceContext, TracerRegistry, TracingConfig};
//!
//! let registry = TracerRegistry::new();
//! let (span, cx, guard) = start_tracing(
//!     &registry,
//!     &TraceContext::background(),
//!     &TracingConfig::default(),
//!     &JobMetadata::default(),
//! );
//! let (checkout, _) = cx.start_child("checkout");
//! checkout.finish_with(SpanOutcome::Success);
//! guard.finish_with(SpanOutcome::Success);
//! assert!(span.is_finished());
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod span;
pub mod start;

pub use config::{TracingBackend, TracingConfig};
pub use error::{Result, TraceError};
pub use provider::{build_provider, NoopProvider, OtelProvider, TracerProvider};
pub use registry::TracerRegistry;
pub use span::{Finished, Span, SpanHandle, SpanOutcome, TraceContext};
pub use start::{start_tracing, JobMetadata, TracingGuard, JOB_SPAN_NAME};
