use async_trait::async_trait;
use reqwest::Client;

use arbiter_core::{
    ChatMessage, ChatProvider, Error as CoreError, GenerationParams, ProviderReply,
    Result as CoreResult, TokenUsage,
};

use crate::OllamaManager;
use crate::models::{OllamaChatMessage, OllamaChatRequest, OllamaChatResponse, OllamaOptions};

/// Local chat provider using the Ollama chat API
pub struct OllamaChatProvider {
    /// HTTP client for inference requests.
    client: Client,
    /// Base URL of the Ollama runtime.
    base_url: String,
    /// Model served by this provider.
    model_name: String,
    /// Manager used for liveness probes.
    manager: OllamaManager,
}

impl OllamaChatProvider {
    /// Creates a provider for the given model against the default server.
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

    /// Model served by this provider.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Converts orchestrator messages into the Ollama wire format.
    fn to_wire_messages(messages: &[ChatMessage]) -> Vec<OllamaChatMessage> {
        messages
            .iter()
            .map(|message| OllamaChatMessage {
                role: message.role.as_str().to_owned(),
                content: message.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatProvider for OllamaChatProvider {
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

    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> CoreResult<ProviderReply> {
        let request = OllamaChatRequest {
            model: self.model_name.clone(),
            messages: Self::to_wire_messages(messages),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(params.temperature),
                num_predict: params.max_tokens,
            }),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| CoreError::Provider(format!("Ollama request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Provider(format!(
                "Ollama returned error: {}",
                response.status()
            )));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|err| CoreError::InvalidResponse(format!("Ollama response: {err}")))?;

        Ok(ProviderReply {
            content: ollama_response.message.content,
            usage: TokenUsage::new(
                ollama_response.prompt_eval_count,
                ollama_response.eval_count,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_creation() {
        let provider = OllamaChatProvider::new("llama3.2:3b".to_owned());
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.2:3b");
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn custom_url_applies_to_manager() {
        let provider =
            OllamaChatProvider::new("llama3.2:3b".to_owned()).with_url("http://custom:9999".to_owned());
        assert_eq!(provider.base_url, "http://custom:9999");
        assert_eq!(provider.manager.base_url(), "http://custom:9999");
    }

    #[test]
    fn wire_messages_preserve_roles() {
        let wire = OllamaChatProvider::to_wire_messages(&[
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ]);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
    }
}
