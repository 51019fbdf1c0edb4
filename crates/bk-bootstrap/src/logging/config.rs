//! Where the bootstrap's own log level and format come from.
//!
//! Resolution order, later wins:
//!
//! 1. defaults (human, info)
//! 2. `RUST_LOG`, reduced to the part that concerns `bk*` targets
//! 3. `BUILDKITE_BOOTSTRAP_LOG` / `BUILDKITE_BOOTSTRAP_LOG_FORMAT`
//! 4. explicit overrides from the caller

use bk_common::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const LEVEL_VAR: &str = "BUILDKITE_BOOTSTRAP_LOG";
const FORMAT_VAR: &str = "BUILDKITE_BOOTSTRAP_LOG_FORMAT";
const RUST_LOG_VAR: &str = "RUST_LOG";

/// Target prefix shared by every bootstrap crate and the `bk::` targets.
const TARGET_PREFIX: &str = "bk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") || s.eq_ignore_ascii_case("jsonl") {
            Ok(LogFormat::Json)
        } else if s.eq_ignore_ascii_case("human") || s.eq_ignore_ascii_case("text") {
            Ok(LogFormat::Human)
        } else {
            Err(format!("unknown log format: {}", s))
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity of the bootstrap's own diagnostics, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("warning") {
            return Ok(LogLevel::Warn);
        }
        LogLevel::ALL
            .into_iter()
            .find(|level| s.eq_ignore_ascii_case(level.as_str()))
            .ok_or_else(|| format!("unknown log level: {}", s))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level a `RUST_LOG` value implies for the bootstrap's targets.
///
/// A `bk*=level` directive wins over a bare `level`; directives for other
/// targets and span/field filters are ignored. With several matching
/// directives the last one counts, as in `EnvFilter`.
pub fn level_from_rust_log(value: &str) -> Option<LogLevel> {
    let mut bare = None;
    let mut ours = None;

    for directive in value.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        match directive.split_once('=') {
            None => {
                if let Ok(level) = directive.parse() {
                    bare = Some(level);
                }
            }
            Some((target, level)) => {
                let target = target.trim();
                if target.starts_with(TARGET_PREFIX) && !target.contains('[') {
                    if let Ok(level) = level.parse() {
                        ours = Some(level);
                    }
                }
            }
        }
    }

    ours.or(bare)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Timestamps on human output.
    pub timestamps: bool,
    /// File and line on every event.
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            timestamps: true,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Resolve from an environment snapshot, then apply `level` and
    /// `format` if given. Unparseable values are ignored.
    pub fn from_env(env: &Environment, level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        let env_level = env
            .get_non_empty(LEVEL_VAR)
            .and_then(|v| v.parse().ok())
            .or_else(|| env.get_non_empty(RUST_LOG_VAR).and_then(level_from_rust_log));
        let env_format = env.get_non_empty(FORMAT_VAR).and_then(|v| v.parse().ok());

        let defaults = LogConfig::default();
        let level = level.or(env_level).unwrap_or(defaults.level);
        LogConfig {
            format: format.or(env_format).unwrap_or(defaults.format),
            level,
            source_location: level <= LogLevel::Debug,
            ..defaults
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}
