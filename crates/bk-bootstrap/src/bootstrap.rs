//! Job bootstrap.
//!
//! [`Bootstrap::run`] prepares everything a job needs before its body runs:
//!
//! 1. discover secret values from the environment
//! 2. wrap the output sink in a scrubber
//! 3. resolve the workspace directories
//! 4. open the `job.run` span
//!
//! and tears it down again in reverse on every exit path.

use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::logging::generate_run_id;
use crate::workspace::{plugin_checkout_path, WorkspacePaths};
use bk_common::{Environment, Logger};
use bk_redact::{values_to_redact, Redactor, SecretMatcher, SharedRedactor, DEFAULT_MASK};
use bk_trace::{start_tracing, Span, SpanOutcome, TraceContext, TracerRegistry};
use std::io::Write;
use std::path::PathBuf;

/// Everything the job body can reach.
pub struct JobContext<'a, W: Write> {
    run_id: &'a str,
    config: &'a BootstrapConfig,
    env: &'a Environment,
    paths: WorkspacePaths,
    output: SharedRedactor<W>,
    trace: TraceContext,
    matcher: &'a SecretMatcher,
}

impl<'a, W: Write> JobContext<'a, W> {
    pub fn run_id(&self) -> &str {
        self.run_id
    }

    pub fn config(&self) -> &BootstrapConfig {
        self.config
    }

    pub fn env(&self) -> &Environment {
        self.env
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Scrubbed job output.
    pub fn output(&mut self) -> &mut SharedRedactor<W> {
        &mut self.output
    }

    /// Another handle to the scrubbed output, for a second producer such
    /// as a child's stderr.
    pub fn output_handle(&self) -> SharedRedactor<W> {
        self.output.clone()
    }

    /// Context carrying the job span.
    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    /// Start a child of the job span.
    pub fn start_span(&self, name: &str) -> (Span, TraceContext) {
        self.trace.start_child(name)
    }

    /// Mask secret values in text that does not go through the output.
    pub fn redact(&self, text: &str) -> String {
        self.matcher.redact_str(text, DEFAULT_MASK)
    }

    /// Checkout directory for a plugin repository.
    pub fn plugin_checkout_path(&self, plugin_repository: &str) -> Result<PathBuf> {
        let root = self
            .config
            .plugins_path
            .as_deref()
            .ok_or_else(|| BootstrapError::Config("plugins path is not set".to_string()))?;
        Ok(plugin_checkout_path(root, plugin_repository))
    }
}

/// What a finished run hands back.
#[derive(Debug)]
pub struct RunReport<W> {
    pub run_id: String,

    /// The job's result, or the setup/teardown error that prevented it.
    /// Secret values in the error message are already masked.
    pub result: Result<()>,

    /// The wrapped sink. `None` if the job kept an output handle alive.
    pub sink: Option<W>,

    /// The finished job span.
    pub span: Span,
}

impl<W> RunReport<W> {
    pub fn into_result(self) -> Result<()> {
        self.result
    }
}

/// Prepares and runs jobs for one configuration.
pub struct Bootstrap<L: Logger> {
    config: BootstrapConfig,
    logger: L,
}

impl<L: Logger> Bootstrap<L> {
    pub fn new(config: BootstrapConfig, logger: L) -> Self {
        Self { config, logger }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Run `job` with scrubbed output and an open job span.
    ///
    /// The span is finished with the job's outcome: success, cancelled for
    /// [`BootstrapError::Cancelled`], failed with the scrubbed error message
    /// otherwise. If `job` panics, the span is still finished as failed.
    /// The error handed back in [`RunReport::result`] is scrubbed the same way.
    pub fn run<W, F>(
        &self,
        registry: &TracerRegistry,
        env: &Environment,
        sink: W,
        job: F,
    ) -> RunReport<W>
    where
        W: Write,
        F: FnOnce(&mut JobContext<'_, W>) -> Result<()>,
    {
        let run_id = self
            .config
            .job_id
            .clone()
            .unwrap_or_else(generate_run_id);
        tracing::debug!(run_id = %run_id, "bootstrapping job");

        let secrets = values_to_redact(&self.logger, &self.config.redacted_vars, env);
        let matcher = SecretMatcher::new(&secrets);
        let output = SharedRedactor::new(Redactor::new(sink, &secrets));

        let (span, trace, guard) = start_tracing(
            registry,
            &TraceContext::background(),
            &self.config.tracing,
            &self.config.job_metadata(),
        );

        let mut result = match WorkspacePaths::resolve(&self.config) {
            Ok(paths) => {
                tracing::debug!(checkout = %paths.checkout.display(), "resolved workspace");
                let mut cx = JobContext {
                    run_id: &run_id,
                    config: &self.config,
                    env,
                    paths,
                    output: output.clone(),
                    trace,
                    matcher: &matcher,
                };
                job(&mut cx)
            }
            Err(err) => Err(err),
        };

        let outcome = match &result {
            Ok(()) => {
                self.logger.info(&format!("Job {} finished", run_id));
                SpanOutcome::Success
            }
            Err(BootstrapError::Cancelled) => {
                self.logger.warn(&format!("Job {} was cancelled", run_id));
                SpanOutcome::Cancelled
            }
            Err(err) => {
                let message = matcher.redact_str(&err.to_string(), DEFAULT_MASK);
                self.logger.error(&format!("Job {} failed: {}", run_id, message));
                SpanOutcome::Failed(message)
            }
        };
        guard.finish_with(outcome);

        let sink = match output.into_inner() {
            Some(redactor) => match redactor.finish() {
                Ok(sink) => Some(sink),
                Err(err) => {
                    if result.is_ok() {
                        result = Err(err.into());
                    }
                    None
                }
            },
            None => {
                self.logger
                    .warn("Job output is still in use after the job returned; sink not recovered");
                None
            }
        };

        let result =
            result.map_err(|err| err.map_message(|text| matcher.redact_str(text, DEFAULT_MASK)));
        RunReport {
            run_id,
            result,
            sink,
            span,
        }
    }
}

impl<L: Logger> std::fmt::Debug for Bootstrap<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("agent_name", &self.config.agent_name)
            .field("pipeline_slug", &self.config.pipeline_slug)
            .field("tracing", &self.config.tracing.backend)
            .finish()
    }
}
