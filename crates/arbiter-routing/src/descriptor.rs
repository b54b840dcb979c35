//! Provider descriptors: identity, capability metadata, health status, and
//! usage statistics for every registered inference provider.

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::result::Result as CoreResult;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arbiter_core::{ChatProvider, EmbeddingProvider, Error as CoreError, ProviderMode};

/// Capability class of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Generates chat completions.
    Chat,
    /// Produces embedding vectors.
    Embedding,
}

impl ProviderKind {
    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Embedding => "embedding",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.as_str())
    }
}

/// Health status of a provider.
///
/// `Unknown` is the initial state. The health monitor moves providers
/// between `Healthy` and `Degraded`; `Unavailable` is reached only through
/// repeated live-call failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// Not yet probed.
    #[default]
    Unknown,
    /// Last probe succeeded.
    Healthy,
    /// Recent probe or call failures; still selectable.
    Degraded,
    /// Repeated live-call failures; selection refuses this provider unless
    /// explicitly overridden.
    Unavailable,
}

impl ProviderStatus {
    /// Stable lowercase name used in logs and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for ProviderStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        write!(formatter, "{}", self.as_str())
    }
}

/// Cumulative usage statistics for one provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProviderStats {
    /// Attempts made against this provider, successful or not.
    pub request_count: u64,
    /// Attempts that failed or timed out.
    pub error_count: u64,
    /// Tokens consumed across all successful calls.
    pub total_tokens: u64,
    /// Accumulated cost in dollars for priced providers.
    pub total_cost: f64,
    /// Running average latency of successful calls, in milliseconds.
    pub average_latency_ms: f64,
}

/// Identity and capability metadata for a registered provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable id, `"{vendor}-{model}"`, e.g. `"openai-gpt-4o-mini"`.
    pub id: String,
    /// Capability class.
    pub kind: ProviderKind,
    /// Execution mode.
    pub mode: ProviderMode,
    /// Model the provider serves.
    pub model_name: String,
    /// Vector dimension, embedding providers only.
    pub dimension: Option<usize>,
    /// Cost per million tokens in dollars; `None` means free.
    pub cost_per_million_tokens: Option<f64>,
    /// Current health status.
    pub status: ProviderStatus,
    /// When the health monitor last probed this provider.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Cumulative usage statistics.
    pub stats: ProviderStats,
}

impl ProviderDescriptor {
    /// Creates a descriptor with `Unknown` status and zeroed statistics.
    #[must_use]
    pub fn new(
        vendor: &str,
        kind: ProviderKind,
        mode: ProviderMode,
        model_name: impl Into<String>,
    ) -> Self {
        let model_name = model_name.into();
        Self {
            id: Self::compose_id(vendor, &model_name),
            kind,
            mode,
            model_name,
            dimension: None,
            cost_per_million_tokens: None,
            status: ProviderStatus::Unknown,
            last_checked_at: None,
            stats: ProviderStats::default(),
        }
    }

    /// Builds the stable registry id for a vendor/model pair.
    #[must_use]
    pub fn compose_id(vendor: &str, model_name: &str) -> String {
        format!("{vendor}-{model_name}")
    }

    /// Sets the embedding vector dimension.
    #[must_use]
    pub const fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Sets the cost per million tokens.
    #[must_use]
    pub const fn with_cost(mut self, cost_per_million_tokens: f64) -> Self {
        self.cost_per_million_tokens = Some(cost_per_million_tokens);
        self
    }
}

/// Client handle stored beside a descriptor.
#[derive(Clone)]
pub enum ProviderClient {
    /// A chat completion client.
    Chat(Arc<dyn ChatProvider>),
    /// An embedding client.
    Embedding(Arc<dyn EmbeddingProvider>),
}

impl ProviderClient {
    /// Capability class of the wrapped client.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Chat(_) => ProviderKind::Chat,
            Self::Embedding(_) => ProviderKind::Embedding,
        }
    }

    /// Vendor name reported by the wrapped client.
    #[must_use]
    pub fn vendor(&self) -> &str {
        match self {
            Self::Chat(client) => client.name(),
            Self::Embedding(client) => client.name(),
        }
    }

    /// Runs the wrapped client's liveness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot currently serve requests.
    pub async fn probe(&self) -> CoreResult<(), CoreError> {
        match self {
            Self::Chat(client) => client.probe().await,
            Self::Embedding(client) => client.probe().await,
        }
    }

    /// The chat client, when this is a chat provider.
    #[must_use]
    pub fn as_chat(&self) -> Option<Arc<dyn ChatProvider>> {
        match self {
            Self::Chat(client) => Some(Arc::clone(client)),
            Self::Embedding(_) => None,
        }
    }

    /// The embedding client, when this is an embedding provider.
    #[must_use]
    pub fn as_embedding(&self) -> Option<Arc<dyn EmbeddingProvider>> {
        match self {
            Self::Embedding(client) => Some(Arc::clone(client)),
            Self::Chat(_) => None,
        }
    }
}

/// One row of the registry health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Provider id.
    pub id: String,
    /// Current status.
    pub status: ProviderStatus,
    /// When the monitor last probed the provider.
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_construction() {
        let descriptor = ProviderDescriptor::new(
            "openai",
            ProviderKind::Chat,
            ProviderMode::Cloud,
            "gpt-4o-mini",
        )
        .with_cost(0.60);

        assert_eq!(descriptor.id, "openai-gpt-4o-mini");
        assert_eq!(descriptor.status, ProviderStatus::Unknown);
        assert_eq!(descriptor.cost_per_million_tokens, Some(0.60));
        assert!(descriptor.last_checked_at.is_none());
        assert_eq!(descriptor.stats.request_count, 0);
    }

    #[test]
    fn test_id_scheme_keeps_model_tags() {
        assert_eq!(
            ProviderDescriptor::compose_id("ollama", "llama3.2:3b"),
            "ollama-llama3.2:3b"
        );
        assert_eq!(
            ProviderDescriptor::compose_id("openrouter", "anthropic/claude-3.5-sonnet"),
            "openrouter-anthropic/claude-3.5-sonnet"
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProviderStatus::Unknown.to_string(), "unknown");
        assert_eq!(ProviderStatus::Unavailable.to_string(), "unavailable");
        assert_eq!(ProviderStatus::default(), ProviderStatus::Unknown);
    }

    #[test]
    fn test_descriptor_serializes() {
        let descriptor = ProviderDescriptor::new(
            "ollama",
            ProviderKind::Embedding,
            ProviderMode::Local,
            "nomic-embed-text",
        )
        .with_dimension(768);

        let json = match serde_json::to_string(&descriptor) {
            Ok(serialized) => serialized,
            Err(error) => panic!("serialize failed: {error}"),
        };
        assert!(json.contains("\"nomic-embed-text\""));
        assert!(json.contains("\"unknown\""));
    }
}
