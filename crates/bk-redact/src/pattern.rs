//! Redaction patterns over environment variable names.
//!
//! Patterns are tiny globs: an optional `*` at the start, an optional `*`
//! at the end, and a literal in between. Matching is a fixed dispatch on
//! the parsed shape rather than a general glob or regex engine.

use serde::{Deserialize, Serialize};

/// Wildcard character.
const WILDCARD: char = '*';

/// Parsed shape of a redaction pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "literal", rename_all = "snake_case")]
pub enum NamePattern {
    /// `*` on its own.
    Any,
    /// No wildcard.
    Exact(String),
    /// `LITERAL*`
    Prefix(String),
    /// `*LITERAL`
    Suffix(String),
    /// `*LITERAL*`
    Contains(String),
}

/// Why a pattern could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternProblem {
    Empty,
    InteriorWildcard,
}

impl std::fmt::Display for PatternProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternProblem::Empty => write!(f, "pattern is empty"),
            PatternProblem::InteriorWildcard => {
                write!(f, "'*' is only supported at the start or end of a pattern")
            }
        }
    }
}

impl NamePattern {
    /// Parse a pattern string.
    pub fn parse(raw: &str) -> Result<Self, PatternProblem> {
        if raw.is_empty() {
            return Err(PatternProblem::Empty);
        }
        if raw.chars().all(|c| c == WILDCARD) {
            return Ok(NamePattern::Any);
        }

        let leading = raw.starts_with(WILDCARD);
        let trailing = raw.ends_with(WILDCARD);
        let start = usize::from(leading);
        let end = raw.len() - usize::from(trailing);
        let literal = &raw[start..end];

        if literal.contains(WILDCARD) {
            return Err(PatternProblem::InteriorWildcard);
        }

        let literal = literal.to_string();
        Ok(match (leading, trailing) {
            (false, false) => NamePattern::Exact(literal),
            (false, true) => NamePattern::Prefix(literal),
            (true, false) => NamePattern::Suffix(literal),
            (true, true) => NamePattern::Contains(literal),
        })
    }

    /// Case-sensitive match against a variable name.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Exact(lit) => name == lit,
            NamePattern::Prefix(lit) => name.starts_with(lit.as_str()),
            NamePattern::Suffix(lit) => name.ends_with(lit.as_str()),
            NamePattern::Contains(lit) => name.contains(lit.as_str()),
        }
    }
}
