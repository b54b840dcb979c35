//! Best-effort discovery of locally available models.
//!
//! Discovery only ever talks to the local machine: the Ollama catalog,
//! disk caches, and hardware probes. No step can fail the scan; a step
//! that breaks logs a warning and contributes nothing.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use arbiter_core::{ComplexityLevel, DiscoveryConfig, OrchestratorConfig, ProviderMode};
use arbiter_local::{
    DiskModel, OllamaChatProvider, OllamaEmbeddingProvider, OllamaManager, detect_accelerator,
    embedding_dimension, is_embedding_model, scan_model_caches,
};

use crate::descriptor::{ProviderClient, ProviderDescriptor, ProviderKind};
use crate::registry::ProviderRegistry;
use crate::router::{ModelRouter, RouteEntry};

/// One model reported by the local inference server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredModel {
    /// Model identifier, e.g. `llama3.1:8b`.
    pub name: String,
    /// Approximate size in bytes.
    pub size_bytes: u64,
    /// Parameter label such as "8B", when the server reports one.
    pub parameter_label: Option<String>,
}

/// Outcome of one discovery run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Models the local server currently serves.
    pub models: Vec<DiscoveredModel>,
    /// Model names found in disk caches, whether or not the server is up.
    pub disk_models: Vec<DiskModel>,
    /// Whether a hardware accelerator was detected.
    pub accelerated: bool,
    /// Providers newly added to the registry by this run.
    pub newly_registered: usize,
    /// Local routes rewritten to use discovered models.
    pub route_rewrites: Vec<RouteEntry>,
}

/// Scans the local machine for usable models and feeds the registry.
pub struct ModelDiscovery {
    registry: Arc<ProviderRegistry>,
    router: Arc<ModelRouter>,
    manager: OllamaManager,
    settings: DiscoveryConfig,
    ollama_url: String,
}

impl ModelDiscovery {
    /// Creates a discovery pass over the given registry and router.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        router: Arc<ModelRouter>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            router,
            manager: OllamaManager::new().with_url(config.providers.ollama_url.clone()),
            settings: config.discovery.clone(),
            ollama_url: config.providers.ollama_url.clone(),
        }
    }

    /// Runs one discovery pass and reports what it found.
    ///
    /// Registration of already-known models is a no-op, so repeated scans
    /// are idempotent.
    pub async fn scan(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        if !self.settings.enabled {
            debug!("discovery disabled, skipping scan");
            return report;
        }

        if self.settings.query_server_catalog {
            self.query_catalog(&mut report).await;
        }
        if self.settings.scan_disk_caches {
            report.disk_models = scan_model_caches();
        }
        if self.settings.detect_accelerator {
            report.accelerated = detect_accelerator().await.is_some();
            self.repair_local_routes(&mut report);
        }

        info!(
            served = report.models.len(),
            on_disk = report.disk_models.len(),
            accelerated = report.accelerated,
            registered = report.newly_registered,
            rewrites = report.route_rewrites.len(),
            "discovery scan finished"
        );
        report
    }

    /// Asks the local server which models it serves and registers them.
    async fn query_catalog(&self, report: &mut DiscoveryReport) {
        if !self.manager.is_available().await {
            warn!(
                url = %self.ollama_url,
                "local inference server unreachable, skipping catalog query"
            );
            return;
        }

        let models = match self.manager.list_models().await {
            Ok(models) => models,
            Err(error) => {
                warn!(%error, "listing local models failed");
                return;
            }
        };

        for model in models {
            let discovered = DiscoveredModel {
                name: model.name.clone(),
                size_bytes: model.size,
                parameter_label: model.parameter_label().map(str::to_owned),
            };
            debug!(
                model = %discovered.name,
                size_bytes = discovered.size_bytes,
                "catalog model"
            );

            if self.register_discovered(&discovered.name) {
                report.newly_registered += 1;
            }
            report.models.push(discovered);
        }
    }

    /// Registers a served model, returning whether it was new.
    ///
    /// The name decides the provider kind: embedding families get an
    /// embedding client with their known dimension, everything else a chat
    /// client.
    fn register_discovered(&self, model_name: &str) -> bool {
        let (kind, dimension, client) = if is_embedding_model(model_name) {
            (
                ProviderKind::Embedding,
                embedding_dimension(model_name),
                ProviderClient::Embedding(Arc::new(
                    OllamaEmbeddingProvider::new(model_name.to_owned())
                        .with_url(self.ollama_url.clone()),
                )),
            )
        } else {
            (
                ProviderKind::Chat,
                None,
                ProviderClient::Chat(Arc::new(
                    OllamaChatProvider::new(model_name.to_owned())
                        .with_url(self.ollama_url.clone()),
                )),
            )
        };

        let mut descriptor =
            ProviderDescriptor::new("ollama", kind, ProviderMode::Local, model_name);
        descriptor.dimension = dimension;
        self.registry.register(descriptor, client)
    }

    /// Rewrites local routes whose model the server does not serve.
    ///
    /// The replacement is the largest discovered chat model on accelerated
    /// hardware and the smallest otherwise. Without any discovered chat
    /// model the table is left alone.
    fn repair_local_routes(&self, report: &mut DiscoveryReport) {
        let chat_models: Vec<&DiscoveredModel> = report
            .models
            .iter()
            .filter(|model| !is_embedding_model(&model.name))
            .collect();
        let Some(replacement) = pick_replacement(&chat_models, report.accelerated) else {
            return;
        };

        for level in [
            ComplexityLevel::Simple,
            ComplexityLevel::Medium,
            ComplexityLevel::Complex,
        ] {
            let current = self.router.select_model(ProviderMode::Local, level);
            if chat_models.iter().any(|model| model.name == current) {
                continue;
            }

            match self
                .router
                .update_route(ProviderMode::Local, level, replacement.clone())
            {
                Ok(()) => {
                    info!(level = %level, from = %current, to = %replacement, "local route repaired");
                    report.route_rewrites.push(RouteEntry {
                        mode: ProviderMode::Local,
                        level,
                        model_name: replacement.clone(),
                    });
                }
                Err(error) => warn!(%error, "route repair rejected"),
            }
        }
    }
}

/// Largest discovered chat model when accelerated, smallest otherwise.
fn pick_replacement(chat_models: &[&DiscoveredModel], accelerated: bool) -> Option<String> {
    let picked = if accelerated {
        chat_models.iter().max_by_key(|model| model.size_bytes)
    } else {
        chat_models.iter().min_by_key(|model| model.size_bytes)
    };
    picked.map(|model| model.name.clone())
}
