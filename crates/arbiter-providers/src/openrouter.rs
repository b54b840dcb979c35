use std::env;

use async_trait::async_trait;
use reqwest::Client;

use arbiter_core::{ChatMessage, ChatProvider, Error, GenerationParams, ProviderReply, Result};

use crate::wire::{ChatCompletionRequest, ChatCompletionResponse, to_wire_messages};

/// Default `OpenRouter` API base URL.
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
/// Default model slug when none is configured.
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
/// Env var key for the `OpenRouter` API key.
const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
/// Referer sent for `OpenRouter` app attribution.
const ATTRIBUTION_REFERER: &str = "https://github.com/arbiter-labs/arbiter";
/// App title sent for `OpenRouter` app attribution.
const ATTRIBUTION_TITLE: &str = "Arbiter";

/// Chat provider backed by the `OpenRouter` multi-vendor gateway.
pub struct OpenRouterChatProvider {
    /// HTTP client reused across requests.
    client: Client,
    /// `OpenRouter` API key.
    api_key: String,
    /// Model slug routed through the gateway.
    model: String,
    /// API base URL.
    base_url: String,
}

impl OpenRouterChatProvider {
    /// Builds a provider that authenticates with the given `OpenRouter` key.
    ///
    /// # Errors
    /// Rejects an empty API key.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENROUTER_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            base_url: OPENROUTER_BASE_URL.to_owned(),
        })
    }

    /// Builds a provider from the `OPENROUTER_API_KEY` environment variable.
    ///
    /// # Errors
    /// Fails when the variable is unset or holds an empty value.
    pub fn from_env() -> Result<Self> {
        env::var(ENV_OPENROUTER_API_KEY)
            .map_err(|_| Error::MissingApiKey(ENV_OPENROUTER_API_KEY.to_owned()))
            .and_then(Self::new)
    }

    /// Builds a provider from a configured key, falling back to the environment.
    ///
    /// # Errors
    /// Fails when neither the config nor the environment supplies a key.
    pub fn from_config_or_env(config_key: Option<String>) -> Result<Self> {
        let Some(api_key) = config_key.or_else(|| env::var(ENV_OPENROUTER_API_KEY).ok()) else {
            return Err(Error::MissingApiKey(format!(
                "{ENV_OPENROUTER_API_KEY} or config.toml openrouter_api_key"
            )));
        };
        Self::new(api_key)
    }

    /// Routes requests to a specific model slug.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ChatProvider for OpenRouterChatProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenRouter probe failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Provider(format!(
                "OpenRouter probe returned status {}",
                response.status()
            )))
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ProviderReply> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: to_wire_messages(messages),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", ATTRIBUTION_REFERER)
            .header("X-Title", ATTRIBUTION_TITLE)
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenRouter request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenRouter API error {status}: {error_text}"
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("OpenRouter response: {err}")))?;

        api_response.into_reply("OpenRouter")
    }
}
