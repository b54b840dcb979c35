//! Provider registry: one synchronized map owning every descriptor and
//! client handle.
//!
//! The registry is an explicit value shared via `Arc`; the health monitor,
//! discovery, and the execution services all receive it from the caller.
//! Every operation takes the single lock briefly and never holds it across
//! an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use arbiter_core::{
    ChatProvider, EmbeddingProvider, HealthConfig, LockUnpoisoned as _, OrchestratorConfig,
    ProviderMode, TokenUsage,
};
use arbiter_local::{
    OllamaChatProvider, OllamaEmbeddingProvider, embedding_dimension as local_embedding_dimension,
};
use arbiter_providers::{OpenAiChatProvider, OpenAiEmbeddingProvider, OpenRouterChatProvider};

use crate::catalog::{CatalogModel, MODEL_CATALOG, cost_for};
use crate::descriptor::{
    ProviderClient, ProviderDescriptor, ProviderHealth, ProviderKind, ProviderStatus,
};
use crate::error::{OrchestratorError, Result};

/// A chat provider chosen for one attempt.
#[derive(Clone)]
pub struct SelectedChat {
    /// Registry id of the chosen provider.
    pub id: String,
    /// Model the provider serves.
    pub model_name: String,
    /// Mode the provider belongs to.
    pub mode: ProviderMode,
    /// Client handle for making the call.
    pub client: Arc<dyn ChatProvider>,
}

/// An embedding provider chosen for one attempt.
#[derive(Clone)]
pub struct SelectedEmbedding {
    /// Registry id of the chosen provider.
    pub id: String,
    /// Model the provider serves.
    pub model_name: String,
    /// Mode the provider belongs to.
    pub mode: ProviderMode,
    /// Expected vector dimension, when known.
    pub dimension: Option<usize>,
    /// Client handle for making the call.
    pub client: Arc<dyn EmbeddingProvider>,
}

/// Registry entry pairing a descriptor with its client and failure streak.
struct ProviderEntry {
    descriptor: ProviderDescriptor,
    client: ProviderClient,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// The synchronized provider map.
pub struct ProviderRegistry {
    entries: Mutex<HashMap<String, ProviderEntry>>,
    health: HealthConfig,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl ProviderRegistry {
    /// Creates an empty registry with the given failure thresholds.
    #[must_use]
    pub fn new(health: HealthConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            health,
        }
    }

    /// Seeds a registry from the built-in catalog and the configuration.
    ///
    /// Cloud models are registered only when the matching API key is
    /// available; local models need no key. Everything starts as `Unknown`
    /// until the health monitor probes it.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client for a cloud provider cannot be
    /// constructed.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        let registry = Self::new(config.health.clone());

        if config.providers.cloud_enabled {
            registry.seed_cloud(config)?;
        }
        if config.providers.local_enabled {
            registry.seed_local(config);
        }

        if registry.provider_count() == 0 {
            warn!("registry seeded empty: no providers enabled or no keys available");
        }
        Ok(registry)
    }

    /// Registers a provider, returning `false` when the id already exists.
    ///
    /// Duplicate registration leaves the existing entry, its status, and its
    /// statistics untouched. Ids are immutable once registered.
    pub fn register(&self, descriptor: ProviderDescriptor, client: ProviderClient) -> bool {
        let mut entries = self.entries.lock_unpoisoned();
        if entries.contains_key(&descriptor.id) {
            debug!(id = %descriptor.id, "provider already registered, keeping existing entry");
            return false;
        }

        info!(
            id = %descriptor.id,
            kind = %descriptor.kind,
            mode = %descriptor.mode,
            "registered provider"
        );
        entries.insert(
            descriptor.id.clone(),
            ProviderEntry {
                descriptor,
                client,
                consecutive_failures: 0,
                last_failure_at: None,
            },
        );
        true
    }

    /// Clones out the descriptor for an id.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` if no provider has this id.
    pub fn get(&self, id: &str) -> Result<ProviderDescriptor> {
        let entries = self.entries.lock_unpoisoned();
        entries
            .get(id)
            .map(|entry| entry.descriptor.clone())
            .ok_or_else(|| OrchestratorError::ProviderNotFound(id.to_owned()))
    }

    /// Snapshot of descriptors, optionally filtered by kind and mode.
    ///
    /// Sorted by id so output is stable.
    #[must_use]
    pub fn list(
        &self,
        kind: Option<ProviderKind>,
        mode: Option<ProviderMode>,
    ) -> Vec<ProviderDescriptor> {
        let entries = self.entries.lock_unpoisoned();
        let mut descriptors: Vec<ProviderDescriptor> = entries
            .values()
            .filter(|entry| kind.is_none_or(|wanted| entry.descriptor.kind == wanted))
            .filter(|entry| mode.is_none_or(|wanted| entry.descriptor.mode == wanted))
            .map(|entry| entry.descriptor.clone())
            .collect();
        drop(entries);

        descriptors.sort_by(|left, right| left.id.cmp(&right.id));
        descriptors
    }

    /// Number of registered providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.entries.lock_unpoisoned().len()
    }

    /// Explicitly sets a provider's status.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` if no provider has this id.
    pub fn set_status(&self, id: &str, status: ProviderStatus) -> Result<()> {
        let mut entries = self.entries.lock_unpoisoned();
        let Some(entry) = entries.get_mut(id) else {
            return Err(OrchestratorError::ProviderNotFound(id.to_owned()));
        };

        if entry.descriptor.status != status {
            info!(id, from = %entry.descriptor.status, to = %status, "provider status changed");
        }
        entry.descriptor.status = status;
        Ok(())
    }

    /// Records a health-probe outcome: sets the status and stamps the
    /// check time.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` if no provider has this id.
    pub fn record_probe(&self, id: &str, status: ProviderStatus) -> Result<()> {
        let mut entries = self.entries.lock_unpoisoned();
        let Some(entry) = entries.get_mut(id) else {
            return Err(OrchestratorError::ProviderNotFound(id.to_owned()));
        };

        if entry.descriptor.status != status {
            info!(id, from = %entry.descriptor.status, to = %status, "probe moved provider status");
        }
        entry.descriptor.status = status;
        entry.descriptor.last_checked_at = Some(Utc::now());
        Ok(())
    }

    /// Records a successful call: usage, cost, latency, and streak reset.
    ///
    /// Does not change the provider's status; status is owned by the
    /// monitor and by failed calls. An unknown id is tolerated and logged.
    pub fn record_success(&self, id: &str, usage: &TokenUsage, latency_ms: u64) {
        let mut entries = self.entries.lock_unpoisoned();
        let Some(entry) = entries.get_mut(id) else {
            warn!(id, "recording success for unknown provider, ignoring");
            return;
        };

        let stats = &mut entry.descriptor.stats;
        stats.request_count += 1;
        stats.total_tokens += usage.total_tokens;
        if let Some(cost) = entry.descriptor.cost_per_million_tokens {
            stats.total_cost += cost * (usage.total_tokens as f64) / 1_000_000.0;
        }

        let successes = stats.request_count - stats.error_count;
        stats.average_latency_ms +=
            ((latency_ms as f64) - stats.average_latency_ms) / (successes as f64);

        entry.consecutive_failures = 0;
        entry.last_failure_at = None;
    }

    /// Records a failed call and applies the failure thresholds.
    ///
    /// Failures within the failure window form a streak; reaching the
    /// degraded threshold marks the provider `Degraded`, the unavailable
    /// threshold marks it `Unavailable`. A failure arriving after the window
    /// restarts the streak at one, so isolated failures never take a
    /// provider out of rotation. An unknown id is tolerated and logged.
    pub fn record_failure(&self, id: &str) {
        let now = Instant::now();
        let mut entries = self.entries.lock_unpoisoned();
        let Some(entry) = entries.get_mut(id) else {
            warn!(id, "recording failure for unknown provider, ignoring");
            return;
        };

        entry.descriptor.stats.request_count += 1;
        entry.descriptor.stats.error_count += 1;

        let within_window = entry
            .last_failure_at
            .is_some_and(|at| now.duration_since(at) <= self.health.failure_window());
        entry.consecutive_failures = if within_window {
            entry.consecutive_failures + 1
        } else {
            1
        };
        entry.last_failure_at = Some(now);

        let streak = entry.consecutive_failures;
        if streak >= self.health.unavailable_after_failures {
            if entry.descriptor.status != ProviderStatus::Unavailable {
                warn!(id, streak, "provider marked unavailable after repeated failures");
            }
            entry.descriptor.status = ProviderStatus::Unavailable;
        } else if streak >= self.health.degraded_after_failures {
            if entry.descriptor.status != ProviderStatus::Degraded {
                warn!(id, streak, "provider degraded after consecutive failures");
            }
            entry.descriptor.status = ProviderStatus::Degraded;
        }
    }

    /// Finds the chat provider serving a model in a mode.
    ///
    /// With `bypass_health` false an `Unavailable` provider is refused;
    /// an explicit override passes `true` and may target any status.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` when no provider serves the model, or
    /// `ProviderUnavailable` when every match is out of rotation.
    pub fn select_chat(
        &self,
        mode: ProviderMode,
        model_name: &str,
        bypass_health: bool,
    ) -> Result<SelectedChat> {
        let entries = self.entries.lock_unpoisoned();
        let mut candidates: Vec<&ProviderEntry> = entries
            .values()
            .filter(|entry| {
                entry.descriptor.kind == ProviderKind::Chat
                    && entry.descriptor.mode == mode
                    && entry.descriptor.model_name == model_name
            })
            .collect();
        candidates.sort_by(|left, right| left.descriptor.id.cmp(&right.descriptor.id));

        let Some(first) = candidates.first() else {
            return Err(OrchestratorError::ProviderNotFound(format!(
                "no {mode} chat provider serves {model_name}"
            )));
        };

        let chosen = if bypass_health {
            first
        } else {
            match candidates
                .iter()
                .find(|entry| entry.descriptor.status != ProviderStatus::Unavailable)
            {
                Some(entry) => entry,
                None => {
                    return Err(OrchestratorError::ProviderUnavailable(
                        first.descriptor.id.clone(),
                    ));
                }
            }
        };

        let Some(client) = chosen.client.as_chat() else {
            return Err(OrchestratorError::ProviderNotFound(format!(
                "{} is not a chat provider",
                chosen.descriptor.id
            )));
        };

        Ok(SelectedChat {
            id: chosen.descriptor.id.clone(),
            model_name: chosen.descriptor.model_name.clone(),
            mode,
            client,
        })
    }

    /// Picks an embedding provider for a mode, preferring `Healthy` entries
    /// and refusing `Unavailable` ones.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` when the mode has no embedding provider,
    /// or `ProviderUnavailable` when all of them are out of rotation.
    pub fn select_embedding(&self, mode: ProviderMode) -> Result<SelectedEmbedding> {
        let entries = self.entries.lock_unpoisoned();
        let mut candidates: Vec<&ProviderEntry> = entries
            .values()
            .filter(|entry| {
                entry.descriptor.kind == ProviderKind::Embedding && entry.descriptor.mode == mode
            })
            .collect();
        candidates.sort_by(|left, right| left.descriptor.id.cmp(&right.descriptor.id));

        let Some(first) = candidates.first() else {
            return Err(OrchestratorError::ProviderNotFound(format!(
                "no {mode} embedding provider registered"
            )));
        };

        let chosen = candidates
            .iter()
            .find(|entry| entry.descriptor.status == ProviderStatus::Healthy)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|entry| entry.descriptor.status != ProviderStatus::Unavailable)
            });
        let Some(chosen) = chosen else {
            return Err(OrchestratorError::ProviderUnavailable(
                first.descriptor.id.clone(),
            ));
        };

        let Some(client) = chosen.client.as_embedding() else {
            return Err(OrchestratorError::ProviderNotFound(format!(
                "{} is not an embedding provider",
                chosen.descriptor.id
            )));
        };

        Ok(SelectedEmbedding {
            id: chosen.descriptor.id.clone(),
            model_name: chosen.descriptor.model_name.clone(),
            mode,
            dimension: chosen.descriptor.dimension,
            client,
        })
    }

    /// Whether any provider of this kind and mode is currently `Healthy`.
    #[must_use]
    pub fn has_healthy(&self, kind: ProviderKind, mode: ProviderMode) -> bool {
        let entries = self.entries.lock_unpoisoned();
        entries.values().any(|entry| {
            entry.descriptor.kind == kind
                && entry.descriptor.mode == mode
                && entry.descriptor.status == ProviderStatus::Healthy
        })
    }

    /// Whether any chat provider in this mode is currently `Healthy`.
    #[must_use]
    pub fn has_healthy_chat(&self, mode: ProviderMode) -> bool {
        self.has_healthy(ProviderKind::Chat, mode)
    }

    /// Status snapshot of every provider, sorted by id.
    #[must_use]
    pub fn health_snapshot(&self) -> Vec<ProviderHealth> {
        let entries = self.entries.lock_unpoisoned();
        let mut snapshot: Vec<ProviderHealth> = entries
            .values()
            .map(|entry| ProviderHealth {
                id: entry.descriptor.id.clone(),
                status: entry.descriptor.status,
                last_checked_at: entry.descriptor.last_checked_at,
            })
            .collect();
        drop(entries);

        snapshot.sort_by(|left, right| left.id.cmp(&right.id));
        snapshot
    }

    /// Clones out every (id, client) pair for the health monitor.
    ///
    /// Probing then happens entirely outside the lock.
    #[must_use]
    pub fn probe_targets(&self) -> Vec<(String, ProviderClient)> {
        let entries = self.entries.lock_unpoisoned();
        let mut targets: Vec<(String, ProviderClient)> = entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.client.clone()))
            .collect();
        drop(entries);

        targets.sort_by(|left, right| left.0.cmp(&right.0));
        targets
    }

    /// Whether a provider for this kind, mode, and model already exists.
    fn has_model(&self, kind: ProviderKind, mode: ProviderMode, model_name: &str) -> bool {
        let entries = self.entries.lock_unpoisoned();
        entries.values().any(|entry| {
            entry.descriptor.kind == kind
                && entry.descriptor.mode == mode
                && entry.descriptor.model_name == model_name
        })
    }

    /// Registers the cloud side of the catalog for which keys are present.
    fn seed_cloud(&self, config: &OrchestratorConfig) -> Result<()> {
        let openai_key = config.get_api_key("openai");
        let openrouter_key = config.get_api_key("openrouter");

        if openai_key.is_none() && openrouter_key.is_none() {
            warn!("cloud providers enabled but no API key is configured");
            return Ok(());
        }

        for entry in MODEL_CATALOG
            .iter()
            .filter(|entry| entry.mode == ProviderMode::Cloud)
        {
            let key = match entry.vendor {
                "openai" => openai_key.as_ref(),
                "openrouter" => openrouter_key.as_ref(),
                _ => None,
            };
            if let Some(key) = key {
                self.register_cloud_entry(entry, key)?;
            }
        }

        self.ensure_cloud_chat_model(
            &config.providers.cloud_chat_model,
            openai_key.as_ref(),
            openrouter_key.as_ref(),
        )
    }

    /// Builds and registers the client for one cloud catalog entry.
    fn register_cloud_entry(&self, entry: &CatalogModel, key: &str) -> Result<()> {
        let client = match (entry.vendor, entry.kind) {
            ("openai", ProviderKind::Chat) => ProviderClient::Chat(Arc::new(
                OpenAiChatProvider::new(key.to_owned())?.with_model(entry.model_name.to_owned()),
            )),
            ("openai", ProviderKind::Embedding) => ProviderClient::Embedding(Arc::new(
                OpenAiEmbeddingProvider::new(key.to_owned())?
                    .with_model(entry.model_name.to_owned()),
            )),
            ("openrouter", _) => ProviderClient::Chat(Arc::new(
                OpenRouterChatProvider::new(key.to_owned())?
                    .with_model(entry.model_name.to_owned()),
            )),
            _ => return Ok(()),
        };

        let mut descriptor = ProviderDescriptor::new(
            entry.vendor,
            entry.kind,
            ProviderMode::Cloud,
            entry.model_name,
        );
        descriptor.cost_per_million_tokens = entry.cost_per_million_tokens;
        descriptor.dimension = entry.dimension;
        self.register(descriptor, client);
        Ok(())
    }

    /// Makes sure the configured cloud default model has a provider.
    ///
    /// Models with a vendor prefix (`anthropic/...`) go through OpenRouter;
    /// bare names are treated as OpenAI models.
    fn ensure_cloud_chat_model(
        &self,
        model_name: &str,
        openai_key: Option<&String>,
        openrouter_key: Option<&String>,
    ) -> Result<()> {
        if self.has_model(ProviderKind::Chat, ProviderMode::Cloud, model_name) {
            return Ok(());
        }

        if model_name.contains('/') {
            let Some(key) = openrouter_key else {
                warn!(model = model_name, "configured cloud chat model needs an OpenRouter key");
                return Ok(());
            };
            let provider =
                OpenRouterChatProvider::new(key.clone())?.with_model(model_name.to_owned());
            let mut descriptor = ProviderDescriptor::new(
                "openrouter",
                ProviderKind::Chat,
                ProviderMode::Cloud,
                model_name,
            );
            descriptor.cost_per_million_tokens = cost_for(model_name);
            self.register(descriptor, ProviderClient::Chat(Arc::new(provider)));
        } else {
            let Some(key) = openai_key else {
                warn!(model = model_name, "configured cloud chat model needs an OpenAI key");
                return Ok(());
            };
            let provider = OpenAiChatProvider::new(key.clone())?.with_model(model_name.to_owned());
            let mut descriptor = ProviderDescriptor::new(
                "openai",
                ProviderKind::Chat,
                ProviderMode::Cloud,
                model_name,
            );
            descriptor.cost_per_million_tokens = cost_for(model_name);
            self.register(descriptor, ProviderClient::Chat(Arc::new(provider)));
        }
        Ok(())
    }

    /// Registers the local side of the catalog plus the configured defaults.
    ///
    /// Local providers need no key; they simply point at the Ollama URL.
    fn seed_local(&self, config: &OrchestratorConfig) {
        let url = &config.providers.ollama_url;

        for entry in MODEL_CATALOG
            .iter()
            .filter(|entry| entry.mode == ProviderMode::Local)
        {
            self.register_local_model(entry.kind, entry.model_name, entry.dimension, url);
        }

        let settings = &config.providers;
        if !self.has_model(ProviderKind::Chat, ProviderMode::Local, &settings.local_chat_model) {
            self.register_local_model(ProviderKind::Chat, &settings.local_chat_model, None, url);
        }
        if !self.has_model(
            ProviderKind::Embedding,
            ProviderMode::Local,
            &settings.local_embedding_model,
        ) {
            self.register_local_model(
                ProviderKind::Embedding,
                &settings.local_embedding_model,
                local_embedding_dimension(&settings.local_embedding_model),
                url,
            );
        }
    }

    /// Builds and registers an Ollama-backed provider for one model.
    fn register_local_model(
        &self,
        kind: ProviderKind,
        model_name: &str,
        dimension: Option<usize>,
        url: &str,
    ) {
        let client = match kind {
            ProviderKind::Chat => ProviderClient::Chat(Arc::new(
                OllamaChatProvider::new(model_name.to_owned()).with_url(url.to_owned()),
            )),
            ProviderKind::Embedding => ProviderClient::Embedding(Arc::new(
                OllamaEmbeddingProvider::new(model_name.to_owned()).with_url(url.to_owned()),
            )),
        };

        let mut descriptor =
            ProviderDescriptor::new("ollama", kind, ProviderMode::Local, model_name);
        descriptor.dimension = dimension;
        self.register(descriptor, client);
    }
}
