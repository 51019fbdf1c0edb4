//! Process-wide tracer registration.

use crate::config::TracingConfig;
use crate::provider::{build_provider, NoopProvider, TracerProvider};
use std::sync::{Arc, OnceLock, RwLock};

type Installed = (TracingConfig, Arc<dyn TracerProvider>);

/// Holds the tracer provider that new job spans are started on.
///
/// Installing the same configuration twice reuses the existing provider.
/// Installing a different one replaces it; the old provider stays usable by
/// spans already started on it and shuts down once the last of them is gone.
#[derive(Default)]
pub struct TracerRegistry {
    slot: RwLock<Option<Installed>>,
}

static GLOBAL: OnceLock<TracerRegistry> = OnceLock::new();

impl TracerRegistry {
    /// Empty registry. Jobs get no-op spans until something is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static TracerRegistry {
        GLOBAL.get_or_init(TracerRegistry::new)
    }

    /// Currently installed provider, or a no-op one.
    pub fn current(&self) -> Arc<dyn TracerProvider> {
        let slot = self.slot.read().unwrap_or_else(|p| p.into_inner());
        match slot.as_ref() {
            Some((_, provider)) => Arc::clone(provider),
            None => Arc::new(NoopProvider),
        }
    }

    /// Install the provider described by `config` and return it.
    pub fn install(&self, config: &TracingConfig) -> Arc<dyn TracerProvider> {
        {
            let slot = self.slot.read().unwrap_or_else(|p| p.into_inner());
            if let Some((installed, provider)) = slot.as_ref() {
                if installed == config {
                    return Arc::clone(provider);
                }
            }
        }

        let provider = build_provider(config);
        let previous = {
            let mut slot = self.slot.write().unwrap_or_else(|p| p.into_inner());
            if let Some((installed, existing)) = slot.as_ref() {
                // Lost a race with an identical install.
                if installed == config {
                    return Arc::clone(existing);
                }
            }
            slot.replace((config.clone(), Arc::clone(&provider)))
        };

        if let Some((old_config, old)) = previous {
            tracing::debug!(
                from = %old_config.backend,
                to = %config.backend,
                in_use = Arc::strong_count(&old) - 1,
                "replacing tracer provider"
            );
        }
        provider
    }

    /// Install an already-built provider under `config`.
    pub fn install_provider(&self, config: TracingConfig, provider: Arc<dyn TracerProvider>) {
        let previous = self
            .slot
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .replace((config, provider));
        drop(previous);
    }

    /// Remove and shut down the installed provider, even if spans started
    /// on it are still open.
    pub fn shutdown(&self) {
        let previous = self.slot.write().unwrap_or_else(|p| p.into_inner()).take();
        if let Some((_, provider)) = previous {
            provider.shutdown();
        }
    }
}

impl std::fmt::Debug for TracerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.read().unwrap_or_else(|p| p.into_inner());
        f.debug_struct("TracerRegistry")
            .field("installed", &slot.as_ref().map(|(c, _)| c.backend))
            .finish()
    }
}
