//! Error types for tracer backends.

use thiserror::Error;

/// Result type for tracer backend construction.
pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors raised while building a tracer backend.
///
/// These never reach a job: the registry logs them and falls back to the
/// no-op provider.
#[derive(Error, Debug)]
pub enum TraceError {
    /// The backend address is empty or unusable.
    #[error("invalid tracing address: {0:?}")]
    InvalidAddress(String),

    /// The span exporter could not be constructed.
    #[error("exporter error: {0}")]
    Exporter(String),
}
