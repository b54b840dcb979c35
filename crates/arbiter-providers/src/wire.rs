//! Wire types for `OpenAI`-compatible chat completion endpoints.
//!
//! Both the `OpenAI` and `OpenRouter` adapters speak the same request and
//! response shapes, so the serde structures live here once.

use serde::{Deserialize, Serialize};

use arbiter_core::{ChatMessage, Error, ProviderReply, Result, TokenUsage};

/// Request payload sent to a chat completions endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    /// Model identifier.
    pub(crate) model: String,
    /// Conversation so far.
    pub(crate) messages: Vec<WireMessage>,
    /// Sampling temperature controlling response randomness.
    pub(crate) temperature: f32,
    /// Maximum number of tokens allowed in the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
}

/// Message delivered to a chat completions endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    /// Role of the message author.
    pub(crate) role: String,
    /// Textual content of the message.
    pub(crate) content: String,
}

/// Response payload returned by a chat completions endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    /// List of candidate completions.
    pub(crate) choices: Vec<Choice>,
    /// Token accounting information for the request.
    pub(crate) usage: Option<Usage>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    /// Message generated for the choice.
    pub(crate) message: ResponseMessage,
}

/// Response message containing the generated text.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    /// Generated text content.
    pub(crate) content: String,
}

/// Token usage metrics for a response.
#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    /// Number of tokens in the prompt portion of the request.
    pub(crate) prompt_tokens: u64,
    /// Number of tokens produced in the completion.
    #[serde(default)]
    pub(crate) completion_tokens: u64,
}

impl ChatCompletionResponse {
    /// Extracts the first choice and usage figures as a provider reply.
    ///
    /// # Errors
    /// Fails when the response carries no choices at all.
    pub(crate) fn into_reply(self, provider: &str) -> Result<ProviderReply> {
        let content = self
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::InvalidResponse(format!("no choices from {provider}")))?;

        let usage = self.usage.map_or_else(TokenUsage::default, |usage| {
            TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
        });

        Ok(ProviderReply { content, usage })
    }
}

/// Converts orchestrator messages into the wire format.
pub(crate) fn to_wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|message| WireMessage {
            role: message.role.as_str().to_owned(),
            content: message.content.clone(),
        })
        .collect()
}
