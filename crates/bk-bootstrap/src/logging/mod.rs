//! Diagnostic logging for the bootstrap.
//!
//! - stdout belongs to the job; every log line goes to stderr
//! - human output for interactive runs, one JSON object per line for agents
//!   that ship their logs somewhere
//!
//! Library crates only use the `tracing` macros. [`init_logging`] decides
//! where those events end up.

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive selecting every `bk_*` crate and the `bk::` targets.
fn filter_directive(level: LogLevel) -> String {
    format!("bk={}", level)
}

/// Initialize the logging subsystem.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is left alone.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::new(filter_directive(config.level));

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .with_current_span(false)
                .with_span_list(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };
    result.is_ok()
}

/// Generate an identifier for a run that has no job id.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}
