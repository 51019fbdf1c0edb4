//! Identifier sanitization for workspace directory names.
//!
//! Agent names and repository URLs come from job configuration and can
//! contain anything. Before they are used as path segments every character
//! outside `[A-Za-z0-9_-]` is replaced with a single `-`. Replacements are
//! never collapsed, so the output has exactly one character per input
//! character and the same input always maps to the same directory.

/// Replacement for every disallowed character.
const REPLACEMENT: char = '-';

/// Returns whether a character may appear in a sanitized segment.
pub fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Sanitize an untrusted string into a filesystem-safe directory segment.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if is_safe_char(c) { c } else { REPLACEMENT })
        .collect()
}

/// Directory segment for an agent name.
pub fn dir_for_agent_name(agent_name: &str) -> String {
    sanitize(agent_name)
}

/// Directory segment for a repository URL.
pub fn dir_for_repository(repository: &str) -> String {
    sanitize(repository)
}
