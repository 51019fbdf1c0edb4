//! Agent bootstrap core.
//!
//! Ties the pieces together for a single job run: configuration from the
//! job environment, workspace directories named by the identifier
//! sanitizer, job output scrubbed of secret values, and a `job.run` span
//! that is closed however the job ends.
//!
//! # Example
//!
//! ```
//! use bk_bootstrap::{Bootstrap, BootstrapConfig};
//! use bk_common::{Environment, TracingLogger};
//! use bk_trace::TracerRegistry;
//! use std::io::Write;
//!
//! let env = Environment::new()
//!     .with_var("BUILDKITE_AGENT_NAME", "ci-1")
//!     .with_var("BUILDKITE_BUILD_PATH", "/tmp/builds")
//!     .with_var("DEPLOY_TOKEN", "s3cr3t-value");
//! let config = BootstrapConfig::from_env(&env);
//!
//! let report = Bootstrap::new(config, TracingLogger).run(
//!     &TracerRegistry::new(),
//!     &env,
//!     Vec::new(),
//!     |job| {
//!         writeln!(job.output(), "token is s3cr3t-value")?;
//!         Ok(())
//!     },
//! );
//! assert_eq!(report.sink.unwrap(), b"token is [REDACTED]\n");
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod workspace;

pub use bootstrap::{Bootstrap, JobContext, RunReport};
pub use config::{parse_pattern_list, BootstrapConfig, DEFAULT_REDACTED_VARS};
pub use error::{BootstrapError, Result};
pub use logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
pub use workspace::{checkout_path, git_mirror_path, plugin_checkout_path, WorkspacePaths};
