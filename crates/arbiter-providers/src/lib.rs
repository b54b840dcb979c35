//! Provider adapters for cloud inference services.

/// Mock providers for testing orchestration without real API calls.
pub mod mock;
/// `OpenAI` chat and embedding provider implementations.
pub mod openai;
/// `OpenRouter` multi-vendor provider implementation.
pub mod openrouter;
/// Serde structures for the `OpenAI`-compatible wire format.
mod wire;

pub use mock::{MockChatProvider, MockEmbeddingProvider};
pub use openai::{OpenAiChatProvider, OpenAiEmbeddingProvider};
pub use openrouter::OpenRouterChatProvider;
