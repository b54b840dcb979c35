use core::result::Result as CoreResult;

use arbiter_core::Error as CoreError;
use thiserror::Error;

/// Result type for orchestration operations.
pub type Result<T> = CoreResult<T, OrchestratorError>;

/// Errors surfaced by the routing and execution layer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A core-layer failure (HTTP, JSON, configuration).
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// The request was rejected before any provider was contacted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No registered provider matches the requested mode and model.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// The matching provider is currently marked unavailable.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider call exceeded the request timeout.
    #[error("Provider {provider} timed out after {after_ms}ms")]
    Timeout {
        /// Id of the provider that timed out.
        provider: String,
        /// Timeout that was exceeded, in milliseconds.
        after_ms: u64,
    },

    /// A provider call was made and failed.
    #[error("Provider {provider} call failed: {message}")]
    ProviderCall {
        /// Id of the provider that failed.
        provider: String,
        /// Failure reported by the provider.
        message: String,
    },

    /// Every permitted attempt failed, including fallback when allowed.
    #[error("All providers exhausted: {detail}")]
    AllProvidersExhausted {
        /// Description of the last failure in the chain.
        detail: String,
    },
}

impl OrchestratorError {
    /// Determines whether retrying the same request later could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Core(error) => error.is_retryable(),
            Self::ProviderUnavailable(_) | Self::Timeout { .. } | Self::ProviderCall { .. } => true,
            Self::InvalidRequest(_)
            | Self::ProviderNotFound(_)
            | Self::AllProvidersExhausted { .. } => false,
        }
    }
}
