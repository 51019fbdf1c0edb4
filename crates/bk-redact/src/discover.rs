//! Secret value discovery.
//!
//! Walks an environment snapshot in name order and collects the values of
//! every variable whose name matches a redaction pattern.

use crate::pattern::NamePattern;
use bk_common::{Environment, Logger};
use std::collections::HashSet;

/// Collect the values that must be scrubbed from job output.
///
/// The result contains each non-empty value once, in the order it was first
/// seen while walking `env` by name. Patterns that match nothing, and
/// patterns that cannot be parsed, are reported to `logger` as warnings and
/// otherwise ignored.
pub fn values_to_redact<P: AsRef<str>>(
    logger: &dyn Logger,
    patterns: &[P],
    env: &Environment,
) -> Vec<String> {
    let parsed: Vec<(&str, NamePattern)> = patterns
        .iter()
        .filter_map(|raw| {
            let raw = raw.as_ref();
            match NamePattern::parse(raw) {
                Ok(pattern) => Some((raw, pattern)),
                Err(problem) => {
                    logger.warn(&format!(
                        "Ignoring redaction pattern {:?}: {}",
                        raw, problem
                    ));
                    None
                }
            }
        })
        .collect();

    if parsed.is_empty() {
        return Vec::new();
    }

    let mut matched = vec![false; parsed.len()];
    let mut seen: HashSet<&str> = HashSet::new();
    let mut values = Vec::new();

    for (name, value) in env.iter() {
        let mut name_matched = false;
        for (idx, (_, pattern)) in parsed.iter().enumerate() {
            if pattern.matches(name) {
                matched[idx] = true;
                name_matched = true;
            }
        }

        if name_matched && !value.is_empty() && seen.insert(value) {
            values.push(value.to_string());
        }
    }

    for ((raw, _), hit) in parsed.iter().zip(&matched) {
        if !hit {
            logger.warn(&format!(
                "Pattern {:?} does not match any environment variables",
                raw
            ));
        }
    }

    tracing::debug!(
        patterns = parsed.len(),
        secrets = values.len(),
        "computed values to redact"
    );

    values
}
