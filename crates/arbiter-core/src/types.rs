//! Request, response, and complexity types shared across the orchestrator.

use core::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Execution mode a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Hosted inference reached over the public network.
    Cloud,
    /// Inference served from the local machine.
    Local,
}

impl ProviderMode {
    /// The other mode, used when falling back across provider classes.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Cloud => Self::Local,
            Self::Local => Self::Cloud,
        }
    }

    /// Stable lowercase name used in provider ids and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }
}

impl Display for ProviderMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.as_str())
    }
}

/// Mode requested by the caller; `Auto` is resolved to a concrete
/// [`ProviderMode`] before any routing decision is made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSelection {
    /// Force cloud execution.
    Cloud,
    /// Force local execution.
    Local,
    /// Let the orchestrator pick based on local availability.
    #[default]
    Auto,
}

impl ModeSelection {
    /// Returns the concrete mode when the selection is not `Auto`.
    #[must_use]
    pub const fn fixed(self) -> Option<ProviderMode> {
        match self {
            Self::Cloud => Some(ProviderMode::Cloud),
            Self::Local => Some(ProviderMode::Local),
            Self::Auto => None,
        }
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The human side of the conversation.
    User,
    /// A prior model reply carried as context.
    Assistant,
}

impl Role {
    /// Wire-format name understood by every chat-completions style API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.as_str())
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting for a single provider call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens produced in the completion.
    pub completion_tokens: u64,
    /// Prompt plus completion tokens.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Builds usage from prompt and completion counts, deriving the total.
    #[must_use]
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Sampling parameters forwarded to a chat provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature in `0.0..=2.0`.
    pub temperature: f32,
    /// Optional completion length cap.
    pub max_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Raw reply from a chat provider before the orchestrator annotates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    /// Generated text.
    pub content: String,
    /// Token accounting reported by the provider.
    pub usage: TokenUsage,
}

/// A completion request as accepted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far; the last message must come from the user.
    pub messages: Vec<ChatMessage>,
    /// Requested execution mode.
    pub mode: ModeSelection,
    /// Exact model to use, bypassing the analyzer and router.
    pub model_override: Option<String>,
    /// Whether complexity-based model selection is applied.
    pub smart_routing: bool,
    /// Whether a failed attempt may fall back to the opposite mode.
    pub allow_fallback: bool,
    /// Sampling temperature in `0.0..=2.0`.
    pub temperature: f32,
    /// Optional completion length cap.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with default routing behavior.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            mode: ModeSelection::Auto,
            model_override: None,
            smart_routing: true,
            allow_fallback: true,
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Convenience constructor for a single user prompt.
    pub fn from_prompt<T: Into<String>>(prompt: T) -> Self {
        Self::new(vec![ChatMessage::user(prompt)])
    }

    /// Sets the requested execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ModeSelection) -> Self {
        self.mode = mode;
        self
    }

    /// Pins the request to an exact model name.
    #[must_use]
    pub fn with_model_override<T: Into<String>>(mut self, model: T) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Enables or disables complexity-based routing.
    #[must_use]
    pub const fn with_smart_routing(mut self, enabled: bool) -> Self {
        self.smart_routing = enabled;
        self
    }

    /// Enables or disables cross-mode fallback.
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.allow_fallback = enabled;
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Caps the completion length.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Text of the trailing user message, if the conversation ends with one.
    #[must_use]
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

/// Query complexity classes, ordered from cheapest to most demanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    /// Short factual or conversational queries.
    Simple,
    /// Queries with some technical or structural depth.
    Medium,
    /// Long, multi-part, or analysis-heavy queries.
    Complex,
}

impl ComplexityLevel {
    /// Stable lowercase name used in routing tables and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

impl Display for ComplexityLevel {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.as_str())
    }
}

/// Output of the complexity analyzer for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReport {
    /// Classified complexity level.
    pub level: ComplexityLevel,
    /// Additive integer score the level was derived from.
    pub score: u32,
    /// Normalized score in `0.0..=1.0`.
    pub confidence: f64,
    /// Names of the scoring rules that fired, in evaluation order.
    pub indicators: Vec<String>,
}

/// Final result of a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// Generated text.
    pub content: String,
    /// Model that produced the reply.
    pub model_used: String,
    /// Mode the winning provider belongs to.
    pub mode_used: ProviderMode,
    /// Analyzer output, present only when smart routing ran.
    pub complexity: Option<ComplexityReport>,
    /// Whether the reply came from the fallback attempt.
    pub fallback_used: bool,
    /// Token accounting for the winning call.
    pub usage: TokenUsage,
    /// Wall-clock latency of the winning call in milliseconds.
    pub latency_ms: u64,
}

/// Result of an embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    /// One vector per input text, in input order.
    pub vectors: Vec<Vec<f32>>,
    /// Model that produced the vectors.
    pub model_used: String,
    /// Mode the winning provider belongs to.
    pub mode_used: ProviderMode,
    /// Dimension of the returned vectors.
    pub dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = ChatRequest::from_prompt("hello");
        assert_eq!(request.mode, ModeSelection::Auto);
        assert!(request.smart_routing);
        assert!(request.allow_fallback);
        assert!(request.model_override.is_none());
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_request_builders() {
        let request = ChatRequest::from_prompt("hello")
            .with_mode(ModeSelection::Local)
            .with_model_override("llama3.2:3b")
            .with_smart_routing(false)
            .with_fallback(false)
            .with_temperature(0.2)
            .with_max_tokens(256);

        assert_eq!(request.mode, ModeSelection::Local);
        assert_eq!(request.model_override.as_deref(), Some("llama3.2:3b"));
        assert!(!request.smart_routing);
        assert!(!request.allow_fallback);
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn test_last_user_text() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("what is rust?"),
        ]);
        assert_eq!(request.last_user_text(), Some("what is rust?"));

        let trailing_assistant = ChatRequest::new(vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);
        assert_eq!(trailing_assistant.last_user_text(), None);
    }

    #[test]
    fn test_token_usage_new() {
        let usage = TokenUsage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_mode_opposite() {
        assert_eq!(ProviderMode::Cloud.opposite(), ProviderMode::Local);
        assert_eq!(ProviderMode::Local.opposite(), ProviderMode::Cloud);
    }

    #[test]
    fn test_complexity_ordering() {
        assert!(ComplexityLevel::Simple < ComplexityLevel::Medium);
        assert!(ComplexityLevel::Medium < ComplexityLevel::Complex);
    }
}
