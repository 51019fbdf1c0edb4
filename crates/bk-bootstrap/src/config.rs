//! Bootstrap configuration.
//!
//! Configuration normally arrives as `BUILDKITE_*` variables in the job
//! environment. It can also be loaded from, and saved to, a JSON file.

use crate::error::Result;
use bk_common::Environment;
use bk_trace::{JobMetadata, TracingBackend, TracingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Redaction patterns used when none are configured.
pub const DEFAULT_REDACTED_VARS: &[&str] = &[
    "*_PASSWORD",
    "*_SECRET",
    "*_TOKEN",
    "*_PRIVATE_KEY",
    "*_ACCESS_KEY",
    "*_SECRET_KEY",
    "*_CONNECTION_STRING",
];

/// Settings for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub agent_name: String,
    pub repository: String,
    pub organization_slug: String,
    pub pipeline_slug: String,
    pub job_id: Option<String>,
    pub build_id: Option<String>,
    pub build_number: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,

    /// Root under which job checkouts are created.
    pub build_path: Option<PathBuf>,

    /// Root for shared git mirrors.
    pub git_mirrors_path: Option<PathBuf>,

    /// Root for plugin checkouts.
    pub plugins_path: Option<PathBuf>,

    /// Glob patterns naming environment variables whose values are secret.
    pub redacted_vars: Vec<String>,

    pub tracing: TracingConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            agent_name: String::new(),
            repository: String::new(),
            organization_slug: String::new(),
            pipeline_slug: String::new(),
            job_id: None,
            build_id: None,
            build_number: None,
            branch: None,
            commit: None,
            build_path: None,
            git_mirrors_path: None,
            plugins_path: None,
            redacted_vars: DEFAULT_REDACTED_VARS.iter().map(|s| s.to_string()).collect(),
            tracing: TracingConfig::default(),
        }
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Split a comma-separated pattern list, dropping blank entries.
pub fn parse_pattern_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

impl BootstrapConfig {
    /// Build configuration from the job environment.
    ///
    /// Unset or empty variables keep their defaults.
    pub fn from_env(env: &Environment) -> Self {
        let mut config = Self::default();

        if let Some(v) = env.get_non_empty("BUILDKITE_AGENT_NAME") {
            config.agent_name = v.to_string();
        }
        if let Some(v) = env.get_non_empty("BUILDKITE_REPO") {
            config.repository = v.to_string();
        }
        if let Some(v) = env.get_non_empty("BUILDKITE_ORGANIZATION_SLUG") {
            config.organization_slug = v.to_string();
        }
        if let Some(v) = env.get_non_empty("BUILDKITE_PIPELINE_SLUG") {
            config.pipeline_slug = v.to_string();
        }
        config.job_id = owned(env.get_non_empty("BUILDKITE_JOB_ID"));
        config.build_id = owned(env.get_non_empty("BUILDKITE_BUILD_ID"));
        config.build_number = owned(env.get_non_empty("BUILDKITE_BUILD_NUMBER"));
        config.branch = owned(env.get_non_empty("BUILDKITE_BRANCH"));
        config.commit = owned(env.get_non_empty("BUILDKITE_COMMIT"));

        config.build_path = env.get_non_empty("BUILDKITE_BUILD_PATH").map(PathBuf::from);
        config.git_mirrors_path = env
            .get_non_empty("BUILDKITE_GIT_MIRRORS_PATH")
            .map(PathBuf::from);
        config.plugins_path = env.get_non_empty("BUILDKITE_PLUGINS_PATH").map(PathBuf::from);

        if let Some(v) = env.get_non_empty("BUILDKITE_REDACTED_VARS") {
            config.redacted_vars = parse_pattern_list(v);
        }

        if let Some(v) = env.get_non_empty("BUILDKITE_TRACING_BACKEND") {
            config.tracing.backend = TracingBackend::parse_lenient(v);
        }
        if let Some(v) = env.get_non_empty("BUILDKITE_TRACING_ADDRESS") {
            config.tracing.address = v.to_string();
        }
        if let Some(v) = env.get_non_empty("BUILDKITE_TRACING_SERVICE_NAME") {
            config.tracing.service_name = v.to_string();
        }

        config
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BootstrapConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Span attributes describing this job.
    pub fn job_metadata(&self) -> JobMetadata {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        JobMetadata {
            job_id: self.job_id.clone(),
            build_id: self.build_id.clone(),
            build_number: self.build_number.clone(),
            pipeline_slug: non_empty(&self.pipeline_slug),
            organization_slug: non_empty(&self.organization_slug),
            agent_name: non_empty(&self.agent_name),
            repository: non_empty(&self.repository),
            branch: self.branch.clone(),
            commit: self.commit.clone(),
        }
    }
}
