//! Unified completion service tying analyzer, router, and registry
//! together.
//!
//! One request flows through validation, mode resolution, model choice,
//! a timed provider call, and at most one cross-mode fallback. Every
//! outcome is recorded against the provider that produced it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use arbiter_core::{
    ChatMessage, ChatRequest, ChatResult, ComplexityReport, GenerationParams, ModeSelection,
    OrchestratorConfig, ProviderMode, ProviderSettings, TokenUsage,
};

use crate::analyzer::QueryAnalyzer;
use crate::error::{OrchestratorError, Result};
use crate::registry::ProviderRegistry;
use crate::router::ModelRouter;

/// What one successful provider call produced.
struct AttemptOutcome {
    content: String,
    usage: TokenUsage,
    model_used: String,
    mode_used: ProviderMode,
    latency_ms: u64,
}

/// Orchestrates chat completions across every registered provider.
pub struct CompletionService {
    registry: Arc<ProviderRegistry>,
    router: Arc<ModelRouter>,
    analyzer: QueryAnalyzer,
    settings: ProviderSettings,
    request_timeout: Duration,
}

impl CompletionService {
    /// Creates a service over the shared registry and router.
    #[must_use]
    pub fn new(
        registry: Arc<ProviderRegistry>,
        router: Arc<ModelRouter>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            router,
            analyzer: QueryAnalyzer::new(config.analyzer.clone()),
            settings: config.providers.clone(),
            request_timeout: config.execution.request_timeout(),
        }
    }

    /// Overrides the per-attempt timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Runs one completion request end to end.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed input, or
    /// `AllProvidersExhausted` when the chosen provider and the single
    /// fallback attempt both fail.
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResult> {
        let request_id = Uuid::new_v4();
        debug!(
            %request_id,
            messages = request.messages.len(),
            "completion request received"
        );

        self.validate(&request)?;

        let mode = self.resolve_mode(request.mode);
        let (model_name, complexity) = self.choose_model(&request, mode);
        let bypass_health = request.model_override.is_some();
        let params = GenerationParams {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let primary = self
            .attempt(mode, &model_name, &request.messages, &params, bypass_health)
            .await;
        let primary_error = match primary {
            Ok(outcome) => {
                info!(
                    %request_id,
                    model = %outcome.model_used,
                    mode = %outcome.mode_used,
                    latency_ms = outcome.latency_ms,
                    "completion served"
                );
                return Ok(build_result(outcome, complexity, false));
            }
            Err(error) => error,
        };

        if !request.allow_fallback {
            error!(%request_id, %primary_error, "completion failed with fallback disabled");
            return Err(OrchestratorError::AllProvidersExhausted {
                detail: primary_error.to_string(),
            });
        }

        let fallback_mode = mode.opposite();
        let fallback_model = self.settings.chat_model_for(fallback_mode).to_owned();
        warn!(
            %request_id,
            %primary_error,
            fallback_mode = %fallback_mode,
            fallback_model = %fallback_model,
            "primary attempt failed, trying fallback"
        );

        match self
            .attempt(fallback_mode, &fallback_model, &request.messages, &params, false)
            .await
        {
            Ok(outcome) => {
                info!(%request_id, model = %outcome.model_used, "fallback served completion");
                Ok(build_result(outcome, complexity, true))
            }
            Err(fallback_error) => {
                error!(%request_id, %primary_error, %fallback_error, "all providers exhausted");
                Err(OrchestratorError::AllProvidersExhausted {
                    detail: format!("primary: {primary_error}; fallback: {fallback_error}"),
                })
            }
        }
    }

    /// Rejects malformed requests before any provider is touched.
    fn validate(&self, request: &ChatRequest) -> Result<()> {
        if request.messages.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "messages must not be empty".to_owned(),
            ));
        }
        if request.last_user_text().is_none() {
            return Err(OrchestratorError::InvalidRequest(
                "conversation must end with a user message".to_owned(),
            ));
        }
        if !(0.0..=2.0).contains(&request.temperature) {
            return Err(OrchestratorError::InvalidRequest(format!(
                "temperature {} outside 0.0..=2.0",
                request.temperature
            )));
        }
        Ok(())
    }

    /// Resolves `Auto` to a concrete mode before any routing happens.
    fn resolve_mode(&self, selection: ModeSelection) -> ProviderMode {
        if let Some(mode) = selection.fixed() {
            return mode;
        }
        if self.registry.has_healthy_chat(ProviderMode::Local) {
            debug!("auto mode resolved to local");
            ProviderMode::Local
        } else {
            debug!("auto mode resolved to cloud");
            ProviderMode::Cloud
        }
    }

    /// Picks the model for the resolved mode.
    ///
    /// An explicit override wins and skips the analyzer entirely, so the
    /// returned report is `Some` only when smart routing actually ran.
    fn choose_model(
        &self,
        request: &ChatRequest,
        mode: ProviderMode,
    ) -> (String, Option<ComplexityReport>) {
        if let Some(model) = &request.model_override {
            debug!(model = %model, "model override supplied");
            return (model.clone(), None);
        }

        if request.smart_routing {
            let text = request.last_user_text().unwrap_or_default();
            let report = self.analyzer.analyze(text);
            let model = self.router.select_model(mode, report.level);
            debug!(
                score = report.score,
                level = %report.level,
                model = %model,
                "smart routing selected model"
            );
            return (model, Some(report));
        }

        (self.settings.chat_model_for(mode).to_owned(), None)
    }

    /// Selects a provider and runs one timed call against it.
    ///
    /// Call failures and timeouts feed the provider's failure streak;
    /// selection failures do not, since no call was made.
    async fn attempt(
        &self,
        mode: ProviderMode,
        model_name: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
        bypass_health: bool,
    ) -> Result<AttemptOutcome> {
        let selected = self.registry.select_chat(mode, model_name, bypass_health)?;
        debug!(provider = %selected.id, "attempting completion");

        let started = Instant::now();
        match timeout(self.request_timeout, selected.client.chat(messages, params)).await {
            Ok(Ok(reply)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                self.registry
                    .record_success(&selected.id, &reply.usage, latency_ms);
                Ok(AttemptOutcome {
                    content: reply.content,
                    usage: reply.usage,
                    model_used: selected.model_name,
                    mode_used: selected.mode,
                    latency_ms,
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

/// Annotates a winning attempt into the public result type.
fn build_result(
    outcome: AttemptOutcome,
    complexity: Option<ComplexityReport>,
    fallback_used: bool,
) -> ChatResult {
    ChatResult {
        content: outcome.content,
        model_used: outcome.model_used,
        mode_used: outcome.mode_used,
        complexity,
        fallback_used,
        usage: outcome.usage,
        latency_ms: outcome.latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ProviderClient, ProviderDescriptor, ProviderKind, ProviderStatus};
    use arbiter_providers::MockChatProvider;

    fn harness() -> (CompletionService, Arc<ProviderRegistry>) {
        let registry = Arc::new(ProviderRegistry::default());
        let router = Arc::new(ModelRouter::with_defaults());
        let config = OrchestratorConfig::default();
        let service = CompletionService::new(Arc::clone(&registry), router, &config);
        (service, registry)
    }

    fn register_local_chat(registry: &ProviderRegistry, model: &str, provider: MockChatProvider) {
        registry.register(
            ProviderDescriptor::new("mock", ProviderKind::Chat, ProviderMode::Local, model),
            ProviderClient::Chat(Arc::new(provider)),
        );
    }

    #[tokio::test]
    async fn test_validation_rejects_malformed_requests() {
        let (service, _registry) = harness();

        let empty = ChatRequest::new(Vec::new());
        assert!(matches!(
            service.complete(empty).await,
            Err(OrchestratorError::InvalidRequest(_))
        ));

        let trailing_assistant =
            ChatRequest::new(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);
        assert!(matches!(
            service.complete(trailing_assistant).await,
            Err(OrchestratorError::InvalidRequest(_))
        ));

        let hot = ChatRequest::from_prompt("hi").with_temperature(3.0);
        assert!(matches!(
            service.complete(hot).await,
            Err(OrchestratorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_mode_follows_local_health() {
        let (service, registry) = harness();
        assert_eq!(service.resolve_mode(ModeSelection::Auto), ProviderMode::Cloud);

        register_local_chat(&registry, "llama3.2:3b", MockChatProvider::new("mock"));
        assert_eq!(service.resolve_mode(ModeSelection::Auto), ProviderMode::Cloud);

        registry
            .record_probe("mock-llama3.2:3b", ProviderStatus::Healthy)
            .unwrap();
        assert_eq!(service.resolve_mode(ModeSelection::Auto), ProviderMode::Local);

        assert_eq!(
            service.resolve_mode(ModeSelection::Cloud),
            ProviderMode::Cloud
        );
    }

    #[tokio::test]
    async fn test_override_skips_analyzer() {
        let (service, _registry) = harness();
        let request = ChatRequest::from_prompt("analyze and compare everything")
            .with_model_override("pinned-model");

        let (model, report) = service.choose_model(&request, ProviderMode::Local);
        assert_eq!(model, "pinned-model");
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn test_smart_routing_attaches_report() {
        let (service, registry) = harness();
        register_local_chat(
            &registry,
            "llama3.2:3b",
            MockChatProvider::new("mock").with_default_reply("short answer"),
        );

        let request = ChatRequest::from_prompt("hi there").with_mode(ModeSelection::Local);
        let result = service.complete(request).await.unwrap();

        assert_eq!(result.content, "short answer");
        assert_eq!(result.model_used, "llama3.2:3b");
        assert_eq!(result.mode_used, ProviderMode::Local);
        assert!(!result.fallback_used);

        let report = result.complexity.unwrap();
        assert_eq!(report.score, 0);
    }

    #[tokio::test]
    async fn test_disabled_smart_routing_uses_default_model() {
        let (service, _registry) = harness();
        let request = ChatRequest::from_prompt("hello").with_smart_routing(false);

        let (model, report) = service.choose_model(&request, ProviderMode::Cloud);
        assert_eq!(model, "gpt-4o-mini");
        assert!(report.is_none());
    }
}
