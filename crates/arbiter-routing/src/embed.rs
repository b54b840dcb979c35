//! Embedding execution over the shared provider registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, warn};

use arbiter_core::{
    EmbeddingBatch, ModeSelection, OrchestratorConfig, ProviderMode, TokenUsage,
};

use crate::descriptor::ProviderKind;
use crate::error::{OrchestratorError, Result};
use crate::registry::ProviderRegistry;

/// Runs embedding requests with the same selection, recording, and
/// fallback rules as completions.
pub struct EmbeddingService {
    registry: Arc<ProviderRegistry>,
    request_timeout: Duration,
}

impl EmbeddingService {
    /// Creates a service over the shared registry.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, config: &OrchestratorConfig) -> Self {
        Self {
            registry,
            request_timeout: config.execution.request_timeout(),
        }
    }

    /// Overrides the per-attempt timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Embeds a batch of texts, falling back across modes at most once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an empty batch, or
    /// `AllProvidersExhausted` when both attempts fail.
    pub async fn embed(&self, texts: &[String], mode: ModeSelection) -> Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "embedding input must not be empty".to_owned(),
            ));
        }

        let resolved = self.resolve_mode(mode);
        let primary_error = match self.attempt(resolved, texts).await {
            Ok(batch) => return Ok(batch),
            Err(error) => error,
        };

        let fallback_mode = resolved.opposite();
        warn!(
            %primary_error,
            fallback_mode = %fallback_mode,
            "embedding attempt failed, trying fallback"
        );
        match self.attempt(fallback_mode, texts).await {
            Ok(batch) => Ok(batch),
            Err(fallback_error) => {
                error!(%primary_error, %fallback_error, "all embedding providers exhausted");
                Err(OrchestratorError::AllProvidersExhausted {
                    detail: format!("primary: {primary_error}; fallback: {fallback_error}"),
                })
            }
        }
    }

    /// Resolves `Auto` by local embedding availability.
    fn resolve_mode(&self, selection: ModeSelection) -> ProviderMode {
        if let Some(mode) = selection.fixed() {
            return mode;
        }
        if self
            .registry
            .has_healthy(ProviderKind::Embedding, ProviderMode::Local)
        {
            ProviderMode::Local
        } else {
            ProviderMode::Cloud
        }
    }

    /// Selects a provider for the mode and runs one timed embed call.
    async fn attempt(&self, mode: ProviderMode, texts: &[String]) -> Result<EmbeddingBatch> {
        let selected = self.registry.select_embedding(mode)?;
        debug!(provider = %selected.id, batch = texts.len(), "attempting embedding");

        let started = Instant::now();
        match timeout(self.request_timeout, selected.client.embed(texts)).await {
            Ok(Ok(vectors)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                // Embedding APIs do not report usage; only latency counts.
                self.registry
                    .record_success(&selected.id, &TokenUsage::default(), latency_ms);

                let dimension = vectors
                    .first()
                    .map(Vec::len)
                    .or(selected.dimension)
                    .unwrap_or(0);
                Ok(EmbeddingBatch {
                    vectors,
                    model_used: selected.model_name,
                    mode_used: selected.mode,
                    dimension,
                })
            }
            Ok(Err(error)) => {
                self.registry.record_failure(&selected.id);
                Err(OrchestratorError::ProviderCall {
                    provider: selected.id,
                    message: error.to_string(),
                })
            }
            Err(_elapsed) => {
                self.registry.record_failure(&selected.id);
                Err(OrchestratorError::Timeout {
                    provider: selected.id,
                    after_ms: self.request_timeout.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ProviderClient, ProviderDescriptor, ProviderStatus};
    use arbiter_providers::MockEmbeddingProvider;

    fn harness() -> (EmbeddingService, Arc<ProviderRegistry>) {
        let registry = Arc::new(ProviderRegistry::default());
        let config = OrchestratorConfig::default();
        let service = EmbeddingService::new(Arc::clone(&registry), &config);
        (service, registry)
    }

    fn register_embedding(
        registry: &ProviderRegistry,
        vendor: &str,
        mode: ProviderMode,
        model: &str,
        provider: MockEmbeddingProvider,
    ) {
        registry.register(
            ProviderDescriptor::new(vendor, ProviderKind::Embedding, mode, model),
            ProviderClient::Embedding(Arc::new(provider)),
        );
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (service, _registry) = harness();
        let result = service.embed(&[], ModeSelection::Auto).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_returns_vectors_with_dimension() {
        let (service, registry) = harness();
        register_embedding(
            &registry,
            "mock",
            ProviderMode::Local,
            "nomic-embed-text",
            MockEmbeddingProvider::new("mock").with_dimension(8),
        );

        let texts = vec!["alpha".to_owned(), "beta".to_owned()];
        let batch = service.embed(&texts, ModeSelection::Local).await.unwrap();

        assert_eq!(batch.vectors.len(), 2);
        assert_eq!(batch.dimension, 8);
        assert_eq!(batch.model_used, "nomic-embed-text");
        assert_eq!(batch.mode_used, ProviderMode::Local);

        let stats = registry.get("mock-nomic-embed-text").unwrap().stats;
        assert_eq!(stats.request_count, 1);
        assert_eq!(stats.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_auto_prefers_healthy_local_embeddings() {
        let (service, registry) = harness();
        register_embedding(
            &registry,
            "local",
            ProviderMode::Local,
            "nomic-embed-text",
            MockEmbeddingProvider::new("local"),
        );
        register_embedding(
            &registry,
            "cloud",
            ProviderMode::Cloud,
            "text-embedding-3-small",
            MockEmbeddingProvider::new("cloud"),
        );

        assert_eq!(service.resolve_mode(ModeSelection::Auto), ProviderMode::Cloud);

        registry
            .record_probe("local-nomic-embed-text", ProviderStatus::Healthy)
            .unwrap();
        assert_eq!(service.resolve_mode(ModeSelection::Auto), ProviderMode::Local);
    }

    #[tokio::test]
    async fn test_failed_local_falls_back_to_cloud() {
        let (service, registry) = harness();
        register_embedding(
            &registry,
            "local",
            ProviderMode::Local,
            "nomic-embed-text",
            MockEmbeddingProvider::new("local").failing("socket closed"),
        );
        register_embedding(
            &registry,
            "cloud",
            ProviderMode::Cloud,
            "text-embedding-3-small",
            MockEmbeddingProvider::new("cloud").with_dimension(16),
        );

        let texts = vec!["gamma".to_owned()];
        let batch = service.embed(&texts, ModeSelection::Local).await.unwrap();

        assert_eq!(batch.mode_used, ProviderMode::Cloud);
        assert_eq!(batch.dimension, 16);

        let failed = registry.get("local-nomic-embed-text").unwrap().stats;
        assert_eq!(failed.error_count, 1);
    }

    #[tokio::test]
    async fn test_exhaustion_after_both_modes_fail() {
        let (service, registry) = harness();
        register_embedding(
            &registry,
            "local",
            ProviderMode::Local,
            "nomic-embed-text",
            MockEmbeddingProvider::new("local").failing("down"),
        );

        let texts = vec!["delta".to_owned()];
        let result = service.embed(&texts, ModeSelection::Local).await;

        assert!(matches!(
            result,
            Err(OrchestratorError::AllProvidersExhausted { .. })
        ));
        assert_eq!(registry.get("local-nomic-embed-text").unwrap().stats.error_count, 1);
    }
}
