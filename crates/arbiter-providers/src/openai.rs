use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use arbiter_core::{
    ChatMessage, ChatProvider, EmbeddingProvider, Error, GenerationParams, ProviderReply, Result,
};

use crate::wire::{ChatCompletionRequest, ChatCompletionResponse, to_wire_messages};

/// Default `OpenAI` API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default chat model for `OpenAI`.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model for `OpenAI`.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Env var key for the `OpenAI` API key.
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// `OpenAI` chat completions provider.
pub struct OpenAiChatProvider {
    /// HTTP client for API requests.
    client: Client,
    /// `OpenAI` API key.
    api_key: String,
    /// Model name to use.
    model: String,
    /// API base URL, overridable for compatible gateways.
    base_url: String,
}

impl OpenAiChatProvider {
    /// Creates a new `OpenAiChatProvider` with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_CHAT_MODEL.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
        })
    }

    /// Creates a new `OpenAiChatProvider` from environment variables.
    ///
    /// # Errors
    /// Returns an error if the `OPENAI_API_KEY` environment variable is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(ENV_OPENAI_API_KEY)
            .map_err(|_| Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()))?;
        Self::new(api_key)
    }

    /// Creates a new `OpenAiChatProvider` from config or environment.
    ///
    /// # Errors
    /// Returns an error if the API key is not provided.
    pub fn from_config_or_env(config_key: Option<String>) -> Result<Self> {
        let api_key = config_key
            .or_else(|| env::var(ENV_OPENAI_API_KEY).ok())
            .ok_or_else(|| {
                Error::MissingApiKey(format!("{ENV_OPENAI_API_KEY} or config.toml openai_api_key"))
            })?;
        Self::new(api_key)
    }

    /// Sets the model to use for generation.
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
impl ChatProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenAI probe failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Provider(format!(
                "OpenAI probe returned status {}",
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
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenAI request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenAI API error {status}: {error_text}"
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("OpenAI response: {err}")))?;

        api_response.into_reply("OpenAI")
    }
}

/// `OpenAI` embeddings provider.
pub struct OpenAiEmbeddingProvider {
    /// HTTP client for API requests.
    client: Client,
    /// `OpenAI` API key.
    api_key: String,
    /// Embedding model name to use.
    model: String,
    /// API base URL, overridable for compatible gateways.
    base_url: String,
}

impl OpenAiEmbeddingProvider {
    /// Creates a new `OpenAiEmbeddingProvider` with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            base_url: OPENAI_BASE_URL.to_owned(),
        })
    }

    /// Creates a new `OpenAiEmbeddingProvider` from config or environment.
    ///
    /// # Errors
    /// Returns an error if the API key is not provided.
    pub fn from_config_or_env(config_key: Option<String>) -> Result<Self> {
        let api_key = config_key
            .or_else(|| env::var(ENV_OPENAI_API_KEY).ok())
            .ok_or_else(|| {
                Error::MissingApiKey(format!("{ENV_OPENAI_API_KEY} or config.toml openai_api_key"))
            })?;
        Self::new(api_key)
    }

    /// Sets the embedding model to use.
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

/// Request payload sent to the embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    /// Embedding model identifier.
    model: String,
    /// Texts to embed.
    input: Vec<String>,
}

/// Response payload returned by the embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    /// One entry per input text.
    data: Vec<EmbeddingData>,
}

/// A single embedding vector with its input position.
#[derive(Debug, Deserialize)]
struct EmbeddingData {
    /// Vector for the input at `index`.
    embedding: Vec<f32>,
    /// Position of the originating input text.
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenAI probe failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Provider(format!(
                "OpenAI probe returned status {}",
                response.status()
            )))
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Provider(format!("OpenAI embeddings request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenAI embeddings API error {status}: {error_text}"
            )));
        }

        let api_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("OpenAI embeddings response: {err}")))?;

        let mut data = api_response.data;
        data.sort_by_key(|entry| entry.index);
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_empty_api_key() {
        let result = OpenAiChatProvider::new(String::new());
        assert!(result.is_err(), "Empty API key should return an error");

        if let Err(err) = result {
            assert!(
                matches!(err, Error::MissingApiKey(_)),
                "Should be a MissingApiKey error"
            );
        }
    }

    #[test]
    fn test_new_with_valid_api_key() {
        let result = OpenAiChatProvider::new("valid_key".to_owned());
        assert!(result.is_ok(), "Valid API key should succeed");

        if let Ok(provider) = result {
            assert_eq!(provider.api_key, "valid_key");
            assert_eq!(provider.model, DEFAULT_CHAT_MODEL);
            assert_eq!(provider.base_url, OPENAI_BASE_URL);
        }
    }

    #[test]
    fn test_with_model_and_base_url() {
        let provider = OpenAiChatProvider::new("test_key".to_owned())
            .map(|inner| {
                inner
                    .with_model("gpt-4o".to_owned())
                    .with_base_url("http://localhost:8080".to_owned())
            })
            .unwrap();

        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_embedding_provider_defaults() {
        let provider = OpenAiEmbeddingProvider::new("test_key".to_owned()).unwrap();
        assert_eq!(provider.model, DEFAULT_EMBEDDING_MODEL);
    }
}
