use async_trait::async_trait;
use reqwest::Client;

use arbiter_core::{EmbeddingProvider, Error as CoreError, Result as CoreResult};

use crate::OllamaManager;
use crate::models::{OllamaEmbedRequest, OllamaEmbedResponse, embedding_dimension};

/// Local embedding provider using the Ollama embed API
pub struct OllamaEmbeddingProvider {
    /// HTTP client for embedding requests.
    client: Client,
    /// Base URL of the Ollama runtime.
    base_url: String,
    /// Embedding model served by this provider.
    model_name: String,
    /// Manager used for liveness probes.
    manager: OllamaManager,
}

impl OllamaEmbeddingProvider {
    /// Creates a provider for the given embedding model against the default server.
    #[must_use]
    pub fn new(model_name: String) -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_owned(),
            model_name,
            manager: OllamaManager::new(),
        }
    }

    /// Overrides the server base URL.
    #[must_use]
    pub fn with_url(mut self, url: String) -> Self {
        self.base_url.clone_from(&url);
        self.manager = OllamaManager::new().with_url(url);
        self
    }

    /// Embedding model served by this provider.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Expected output dimension, when the model is a known one.
    #[must_use]
    pub fn expected_dimension(&self) -> Option<usize> {
        embedding_dimension(&self.model_name)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn probe(&self) -> CoreResult<()> {
        self.manager
            .list_models()
            .await
            .map(|_| ())
            .map_err(|err| CoreError::Provider(format!("Ollama probe failed: {err}")))
    }

    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        let request = OllamaEmbedRequest {
            model: self.model_name.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| CoreError::Provider(format!("Ollama embed request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "Ollama returned error: {}",
                response.status()
            )));
        }

        let embed_response: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|err| CoreError::InvalidResponse(format!("Ollama embed response: {err}")))?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(CoreError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_creation() {
        let provider = OllamaEmbeddingProvider::new("nomic-embed-text".to_owned());
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
        assert_eq!(provider.expected_dimension(), Some(768));
    }

    #[test]
    fn unknown_model_has_no_expected_dimension() {
        let provider = OllamaEmbeddingProvider::new("custom-model".to_owned());
        assert_eq!(provider.expected_dimension(), None);
    }
}
