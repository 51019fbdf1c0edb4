//! Error types for the bootstrap.

use thiserror::Error;

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors that end a bootstrap run.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Required configuration is missing or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The job was cancelled before it completed.
    #[error("job cancelled")]
    Cancelled,

    /// The job body reported a failure.
    #[error("job failed: {0}")]
    Job(String),

    /// I/O error while loading configuration or writing job output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BootstrapError {
    /// Job failure with a message.
    pub fn job(message: impl Into<String>) -> Self {
        BootstrapError::Job(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BootstrapError::Cancelled)
    }

    /// Rewrite the message carried by this error, keeping the variant.
    ///
    /// Wrapped `io` and `json` errors are only rebuilt when `f` changes
    /// their text; the rebuilt error keeps the I/O error kind.
    pub fn map_message(self, f: impl Fn(&str) -> String) -> Self {
        match self {
            BootstrapError::Config(msg) => BootstrapError::Config(f(&msg)),
            BootstrapError::Job(msg) => BootstrapError::Job(f(&msg)),
            BootstrapError::Cancelled => BootstrapError::Cancelled,
            BootstrapError::Io(err) => {
                let text = err.to_string();
                let mapped = f(&text);
                if mapped == text {
                    BootstrapError::Io(err)
                } else {
                    BootstrapError::Io(std::io::Error::new(err.kind(), mapped))
                }
            }
            BootstrapError::Json(err) => {
                let text = err.to_string();
                let mapped = f(&text);
                if mapped == text {
                    BootstrapError::Json(err)
                } else {
                    BootstrapError::Json(serde::de::Error::custom(mapped))
                }
            }
        }
    }
}
