//! Shared types for the agent bootstrap core.
//!
//! This crate provides the foundational pieces every other bootstrap crate
//! builds on:
//! - An immutable, ordered environment snapshot
//! - The diagnostic logger capability handed in by callers
//! - The identifier sanitizer used for workspace directory names

pub mod env;
pub mod logger;
pub mod sanitize;

pub use env::Environment;
pub use logger::{DiscardLogger, LogEntry, LogLevel, Logger, MemoryLogger, TracingLogger};
pub use sanitize::{dir_for_agent_name, dir_for_repository, is_safe_char, sanitize};
