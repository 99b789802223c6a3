/// Discovery → load → validate → register pipeline and its reconciliation loop
///
/// The loader composes the definition source, validator and registry into a
/// batch pipeline plus an event-driven hot-reload path. Per-file failures
/// are collected, never fatal to the batch; only a catastrophic discovery
/// failure aborts a pass, and even that is reported inside the returned
/// result rather than thrown.

pub mod source;
pub mod watcher;

use crate::config::LoaderConfig;
use crate::definition::registry::DefinitionRegistry;
use crate::definition::types::Definition;
use crate::definition::validator::DefinitionValidator;
use crate::deploy::DeployTarget;
use crate::error::LoadError;
use crate::metrics::LoaderMetrics;
use crate::resilience::{CircuitBreaker, CircuitError, RetryPolicy};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use source::expected_export;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use watcher::{ChangeEvent, ChangeWatcher};

pub use source::{DefinitionSource, Discovery, FormatLoader, JsonLoader, LuaLoader, YamlLoader};

/// A definition accepted during a pass, with its source file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedDefinition {
    pub id: String,
    pub name: String,
    pub source_path: PathBuf,
}

/// A file that failed to load or validate; the batch continues without it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    pub source_path: PathBuf,
    pub errors: Vec<String>,
}

/// A path deliberately passed over during discovery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub source_path: PathBuf,
    pub reason: String,
}

/// A definition that registered fine but could not be published; it stays
/// registered.
#[derive(Debug, Clone, Serialize)]
pub struct PublishFailure {
    pub id: String,
    pub error: String,
}

/// Aggregate outcome of one discovery pass. Always complete: partial
/// failures never turn into an error return.
#[derive(Debug)]
pub struct LoadResult {
    pub loaded: Vec<LoadedDefinition>,
    pub errors: Vec<LoadFailure>,
    pub skipped: Vec<SkippedFile>,
    pub publish_failures: Vec<PublishFailure>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl LoadResult {
    fn begin() -> Self {
        Self {
            loaded: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            publish_failures: Vec::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }
}

/// Pseudo-path used when the discovery step itself fails.
const DISCOVERY_FAILURE_PATH: &str = "loader";

/// Consecutive publish failures before the publish circuit opens.
const PUBLISH_FAILURE_THRESHOLD: u32 = 5;
/// How long the publish circuit stays open before a trial call.
const PUBLISH_RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates discovery, loading, validation, registration and optional
/// publication of workflow definitions.
pub struct DefinitionLoader {
    config: LoaderConfig,
    source: DefinitionSource,
    validator: DefinitionValidator,
    registry: Arc<DefinitionRegistry>,
    publish: Option<Arc<dyn DeployTarget>>,
    publish_breaker: CircuitBreaker,
    discovery_retry: RetryPolicy,
    metrics: Arc<LoaderMetrics>,
    /// Source path → registered definition id, for the removal path
    path_index: Mutex<HashMap<PathBuf, String>>,
}

impl DefinitionLoader {
    /// Build a loader over the given registry and optional publish target.
    /// A fatally bad configuration is the only construction error.
    pub fn new(
        config: LoaderConfig,
        registry: Arc<DefinitionRegistry>,
        publish: Option<Arc<dyn DeployTarget>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.workflows_dir.as_os_str().is_empty(),
            "workflows directory must be configured"
        );
        anyhow::ensure!(
            !config.extensions.is_empty(),
            "at least one definition extension must be configured"
        );

        Ok(Self {
            config,
            source: DefinitionSource::new(),
            validator: DefinitionValidator::new(),
            registry,
            publish,
            publish_breaker: CircuitBreaker::new(PUBLISH_FAILURE_THRESHOLD, PUBLISH_RESET_TIMEOUT),
            discovery_retry: RetryPolicy::default(),
            metrics: Arc::new(LoaderMetrics::new()),
            path_index: Mutex::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    /// Run one full discovery pass: enumerate, then load → validate →
    /// register each file, then publish the accepted batch. Per-file
    /// failures are collected and never abort the pass.
    pub async fn load_all(&self) -> LoadResult {
        let mut result = LoadResult::begin();
        let timer = Instant::now();

        tracing::info!(
            "🔍 Scanning {} for definitions ({})",
            self.config.workflows_dir.display(),
            self.config.extensions.join(", ")
        );

        let discovery = self
            .discovery_retry
            .run(LoadError::is_transient, || async {
                self.source
                    .discover(&self.config.workflows_dir, &self.config.extensions)
            })
            .await;

        match discovery {
            Ok(discovery) => {
                result.skipped = discovery.skipped;
                for path in &discovery.paths {
                    self.load_one(path, &mut result).await;
                }
            }
            Err(err) => {
                // Catastrophic: the root itself was unreadable even after
                // retries. The pass aborts as a single pseudo-file entry.
                tracing::error!("❌ Definition discovery failed: {err}");
                result.errors.push(LoadFailure {
                    source_path: PathBuf::from(DISCOVERY_FAILURE_PATH),
                    errors: vec![format!("Discovery failed: {err}")],
                });
            }
        }

        self.publish_batch(&mut result).await;

        result.duration = timer.elapsed();
        self.metrics.record_scan(&result);
        tracing::info!(
            loaded = result.loaded.len(),
            failed = result.errors.len(),
            skipped = result.skipped.len(),
            "📦 Definition scan finished in {:?}",
            result.duration
        );
        result
    }

    /// Load, validate and register a single file, appending the outcome to
    /// the running result.
    async fn load_one(&self, path: &Path, result: &mut LoadResult) {
        match self.load_and_validate(path).await {
            Ok(definition) => {
                let loaded = LoadedDefinition {
                    id: definition.id.clone(),
                    name: definition.name.clone(),
                    source_path: path.to_path_buf(),
                };
                self.remember_path(path, &definition.id);
                self.registry.register(definition);
                self.metrics.record_loaded();
                result.loaded.push(loaded);
            }
            Err(errors) => {
                result.errors.push(LoadFailure {
                    source_path: path.to_path_buf(),
                    errors,
                });
            }
        }
    }

    /// Shared load+validate step for both the batch and hot-reload paths.
    /// Returns the accepted definition or the complete error list.
    async fn load_and_validate(&self, path: &Path) -> Result<Definition, Vec<String>> {
        let definition = match self.source.load(path).await {
            Ok(definition) => definition,
            Err(err) => {
                self.metrics.record_load_error();
                return Err(vec![err.to_string()]);
            }
        };

        let validation = self.validator.validate(&definition);
        if !validation.valid {
            self.metrics.record_validation_failure();
            return Err(validation.errors);
        }
        Ok(definition)
    }

    /// Push every accepted definition to the publish target, isolating
    /// failures per definition. Publish errors never unregister anything.
    async fn publish_batch(&self, result: &mut LoadResult) {
        let Some(target) = &self.publish else {
            return;
        };

        for loaded in &result.loaded {
            if let Err(error) = self.publish_one(target, loaded).await {
                result.publish_failures.push(PublishFailure {
                    id: loaded.id.clone(),
                    error,
                });
            }
        }
    }

    async fn publish_one(
        &self,
        target: &Arc<dyn DeployTarget>,
        loaded: &LoadedDefinition,
    ) -> Result<(), String> {
        let outcome = self
            .publish_breaker
            .execute(|| async {
                target
                    .deploy(loaded)
                    .await
                    .with_context(|| format!("publishing definition '{}'", loaded.id))
            })
            .await;

        match outcome {
            Ok(()) => {
                tracing::debug!("🚀 Published definition: {}", loaded.id);
                Ok(())
            }
            Err(CircuitError::Open) => {
                self.metrics.record_publish_failure();
                tracing::warn!(
                    "⚠️ Publish target circuit is open, skipping publish of {}",
                    loaded.id
                );
                Err("publish target circuit is open".to_string())
            }
            Err(CircuitError::Inner(err)) => {
                self.metrics.record_publish_failure();
                tracing::error!("❌ Failed to publish definition {}: {err:#}", loaded.id);
                Err(format!("{err:#}"))
            }
        }
    }

    /// React to one settled filesystem change. Added and modified files
    /// re-enter the load → validate → register path for that file only;
    /// removals unregister. Backend errors are handled by [`run`](Self::run).
    pub async fn handle_event(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::Added(path) | ChangeEvent::Modified(path) => {
                self.reload_file(&path).await;
            }
            ChangeEvent::Removed(path) => {
                self.remove_file(&path);
            }
            ChangeEvent::Error(message) => {
                tracing::error!("⚠️ Watcher error: {message}");
            }
        }
    }

    /// Hot-reload one file. On any failure the previous registry entry for
    /// that identifier stays active (last-known-good).
    async fn reload_file(&self, path: &Path) {
        tracing::info!("🔄 Definition changed: {}", path.display());

        match self.load_and_validate(path).await {
            Ok(definition) => {
                let loaded = LoadedDefinition {
                    id: definition.id.clone(),
                    name: definition.name.clone(),
                    source_path: path.to_path_buf(),
                };
                self.remember_path(path, &definition.id);
                self.registry.update(definition);
                self.metrics.record_reload();
                tracing::info!("✅ Definition reloaded: {} ({})", loaded.name, loaded.id);

                if let Some(target) = &self.publish {
                    if let Err(error) = self.publish_one(target, &loaded).await {
                        tracing::warn!("⚠️ Publish after reload failed for {}: {error}", loaded.id);
                    }
                }
            }
            Err(errors) => {
                tracing::warn!(
                    "❌ Reload rejected for {}, keeping last known good: {}",
                    path.display(),
                    errors.join("; ")
                );
            }
        }
    }

    /// Unregister the definition loaded from a deleted file. Prefers the id
    /// recorded at load time; falls back to the identifier derived from the
    /// file's base name for paths never seen before.
    fn remove_file(&self, path: &Path) {
        let recorded = self
            .path_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        let id = recorded.unwrap_or_else(|| expected_export(path));

        if self.registry.unregister(&id) {
            tracing::info!("➖ Definition removed: {} ({})", path.display(), id);
        } else {
            tracing::debug!(
                "⏭️ Removal for untracked path {} (id '{}')",
                path.display(),
                id
            );
        }
    }

    /// Consume watcher events until the channel closes. After a backend
    /// error the watcher can no longer be trusted, so the loop degrades to
    /// periodic full rescans alongside whatever events still arrive.
    pub async fn run(&self, mut watcher: ChangeWatcher) {
        let mut rescan: Option<tokio::time::Interval> = None;

        loop {
            let event = match rescan.as_mut() {
                None => watcher.next().await,
                Some(interval) => {
                    tokio::select! {
                        event = watcher.next() => event,
                        _ = interval.tick() => {
                            tracing::info!("🔁 Periodic rescan (watcher degraded)");
                            self.load_all().await;
                            continue;
                        }
                    }
                }
            };

            match event {
                None => break,
                Some(ChangeEvent::Error(message)) => {
                    tracing::error!(
                        "⚠️ Watcher backend failed ({message}), degrading to rescans every {}s",
                        self.config.rescan_secs
                    );
                    if rescan.is_none() {
                        rescan = Some(tokio::time::interval(Duration::from_secs(
                            self.config.rescan_secs.max(1),
                        )));
                    }
                }
                Some(event) => self.handle_event(event).await,
            }
        }

        tracing::info!("⏹️ Watcher channel closed, reconciliation loop exiting");
    }

    fn remember_path(&self, path: &Path, id: &str) {
        self.path_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), id.to_string());
    }
}

impl std::fmt::Debug for DefinitionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionLoader")
            .field("workflows_dir", &self.config.workflows_dir)
            .field("extensions", &self.config.extensions)
            .finish()
    }
}
