use async_trait::async_trait;

use crate::types::{ChatMessage, GenerationParams, ProviderReply};
use crate::Result;

/// Trait for providers that can complete chat conversations.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Short vendor name for logs and diagnostics, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Cheap liveness check, never an inference call.
    ///
    /// Implementations hit a catalog or list endpoint so the health monitor
    /// can probe every provider frequently without incurring model cost.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot currently serve requests.
    async fn probe(&self) -> Result<()>;

    /// Generates the next assistant message for the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, times out at the transport
    /// level, or the response cannot be parsed.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ProviderReply>;
}

/// Trait for providers that can embed text into vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short vendor name for logs and diagnostics.
    fn name(&self) -> &str;

    /// Cheap liveness check, never an embedding call.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot currently serve requests.
    async fn probe(&self) -> Result<()>;

    /// Embeds each input text, returning one vector per input in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// parsed.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenUsage;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn probe(&self) -> Result<()> {
            Ok(())
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<ProviderReply> {
            let content = messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default();
            Ok(ProviderReply {
                content,
                usage: TokenUsage::new(1, 1),
            })
        }
    }

    #[tokio::test]
    async fn test_chat_provider_object_safety() {
        let provider: Box<dyn ChatProvider> = Box::new(EchoProvider);
        assert_eq!(provider.name(), "echo");

        let reply = provider
            .chat(&[ChatMessage::user("ping")], &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "ping");
    }
}
