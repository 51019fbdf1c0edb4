//! Secret discovery and log scrubbing for the agent bootstrap.
//!
//! Redaction runs in two phases:
//!
//! - **Discovery**: [`values_to_redact`] matches redaction patterns against
//!   the names in an environment snapshot and returns the values to hide.
//! - **Scrubbing**: [`Redactor`] wraps any [`std::io::Write`] sink and
//!   replaces every occurrence of those values with a mask token, even when
//!   a value is split across several writes.
//!
//! # Example
//!
//! ```
//! use bk_common::{DiscardLogger, Environment};
//! use bk_redact::{values_to_redact, Redactor};
//! use std::io::Write;
//!
//! let env: Environment = [("DATABASE_PASSWORD", "hunter2")].into_iter().collect();
//! let secrets = values_to_redact(&DiscardLogger, &["*_PASSWORD"], &env);
//!
//! let mut log = Redactor::new(Vec::new(), &secrets);
//! log.write_all(b"connecting with hunt").unwrap();
//! log.write_all(b"er2\n").unwrap();
//! let out = log.finish().unwrap();
//! assert_eq!(out, b"connecting with [REDACTED]\n");
//! ```

pub mod discover;
pub mod pattern;
pub mod redactor;

pub use discover::values_to_redact;
pub use pattern::{NamePattern, PatternProblem};
pub use redactor::{Redactor, SecretMatcher, SharedRedactor, DEFAULT_MASK};
