use core::result::Result as CoreResult;

use thiserror::Error;

/// Result type for local inference operations.
pub type Result<T> = CoreResult<T, LocalError>;

/// Errors that can occur while talking to the local inference server.
#[derive(Debug, Error)]
pub enum LocalError {
    /// A core-layer error bubbled up.
    #[error("core error: {0}")]
    Core(#[from] arbiter_core::Error),

    /// An HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The local inference server could not be reached.
    #[error("Ollama server unreachable: {0}")]
    ServerUnavailable(String),

    /// The requested model is not installed locally.
    #[error("model not installed: {0}")]
    ModelNotFound(String),

    /// Pulling a model from the registry failed.
    #[error("model pull failed: {0}")]
    PullFailed(String),

    /// The server accepted the request but inference failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wording() {
        assert_eq!(
            LocalError::ModelNotFound("llama3.2:3b".to_owned()).to_string(),
            "model not installed: llama3.2:3b"
        );
        assert_eq!(
            LocalError::ServerUnavailable("connection refused".to_owned()).to_string(),
            "Ollama server unreachable: connection refused"
        );
        assert_eq!(LocalError::Other("odd state".to_owned()).to_string(), "odd state");
    }

    #[test]
    fn test_core_error_converts() {
        let core = arbiter_core::Error::Provider("backend gone".to_owned());
        let wrapped = LocalError::from(core);
        assert!(matches!(wrapped, LocalError::Core(_)));
        assert_eq!(wrapped.to_string(), "core error: provider failure: backend gone");
    }
}
