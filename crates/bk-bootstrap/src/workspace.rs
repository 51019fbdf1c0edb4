//! On-disk layout for job checkouts, git mirrors and plugins.
//!
//! Every path segment derived from user-controlled names goes through the
//! identifier sanitizer, so no segment can contain a separator or `..`.

use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use bk_common::{dir_for_agent_name, dir_for_repository, sanitize};
use std::path::{Path, PathBuf};

/// Resolved directories for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    /// Where the repository is checked out for this job.
    pub checkout: PathBuf,

    /// Shared mirror of the job's repository, when mirrors are enabled.
    pub git_mirror: Option<PathBuf>,
}

impl WorkspacePaths {
    /// Resolve the directories for `config`.
    ///
    /// Fails if no build path is configured.
    pub fn resolve(config: &BootstrapConfig) -> Result<Self> {
        let build_path = config
            .build_path
            .as_deref()
            .ok_or_else(|| BootstrapError::Config("build path is not set".to_string()))?;

        let checkout = checkout_path(
            build_path,
            &config.agent_name,
            &config.organization_slug,
            &config.pipeline_slug,
        );
        let git_mirror = match (&config.git_mirrors_path, config.repository.is_empty()) {
            (Some(root), false) => Some(git_mirror_path(root, &config.repository)),
            _ => None,
        };

        Ok(Self {
            checkout,
            git_mirror,
        })
    }
}

/// `build_path/<agent>/<org>/<pipeline>`.
pub fn checkout_path(build_path: &Path, agent_name: &str, org_slug: &str, pipeline_slug: &str) -> PathBuf {
    build_path
        .join(dir_for_agent_name(agent_name))
        .join(sanitize(org_slug))
        .join(sanitize(pipeline_slug))
}

/// `git_mirrors_path/<repository>`.
pub fn git_mirror_path(git_mirrors_path: &Path, repository: &str) -> PathBuf {
    git_mirrors_path.join(dir_for_repository(repository))
}

/// `plugins_path/<plugin repository>`.
pub fn plugin_checkout_path(plugins_path: &Path, plugin_repository: &str) -> PathBuf {
    plugins_path.join(dir_for_repository(plugin_repository))
}
