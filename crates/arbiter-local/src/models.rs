use serde::{Deserialize, Serialize};

/// Known local embedding models and their output dimensions.
const EMBEDDING_DIMENSIONS: &[(&str, usize)] = &[
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
    ("snowflake-arctic-embed", 1024),
    ("bge-m3", 1024),
];

/// Output dimension of a known local embedding model, if any.
#[must_use]
pub fn embedding_dimension(model_name: &str) -> Option<usize> {
    let base = model_name.split(':').next().unwrap_or(model_name);
    EMBEDDING_DIMENSIONS
        .iter()
        .find(|(known, _)| *known == base)
        .map(|(_, dimension)| *dimension)
}

/// Whether a model name denotes an embedding model rather than a chat model.
#[must_use]
pub fn is_embedding_model(model_name: &str) -> bool {
    embedding_dimension(model_name).is_some() || model_name.contains("embed")
}

/// Ollama API response for model list
#[derive(Debug, Deserialize)]
pub struct OllamaListResponse {
    /// List of models installed in Ollama.
    pub models: Vec<OllamaModel>,
}

/// Information about an Ollama model returned from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    /// Model identifier.
    pub name: String,
    /// Size of the model in bytes.
    pub size: u64,
    /// Content digest for the model.
    #[serde(default)]
    pub digest: String,
    /// Timestamp of last modification.
    #[serde(default)]
    pub modified_at: String,
    /// Extra detail block, when the server provides it.
    #[serde(default)]
    pub details: Option<OllamaModelDetails>,
}

impl OllamaModel {
    /// Human-readable parameter label, e.g. "8B", when the server reports one.
    #[must_use]
    pub fn parameter_label(&self) -> Option<&str> {
        self.details
            .as_ref()
            .map(|details| details.parameter_size.as_str())
            .filter(|label| !label.is_empty())
    }
}

/// Detail block attached to a listed Ollama model.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelDetails {
    /// Parameter count label (e.g., "8.0B").
    #[serde(default)]
    pub parameter_size: String,
    /// Quantization format (e.g., "`Q4_K_M`").
    #[serde(default)]
    pub quantization_level: String,
    /// Model family (e.g., "llama").
    #[serde(default)]
    pub family: String,
}

/// Ollama API request for chat completion
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    /// Model to use for generation.
    pub model: String,
    /// Conversation so far.
    pub messages: Vec<OllamaChatMessage>,
    /// Whether to stream the response.
    pub stream: bool,
    /// Sampling options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// A single chat message in the Ollama wire format.
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaChatMessage {
    /// Role of the message author.
    pub role: String,
    /// Textual content of the message.
    pub content: String,
}

/// Sampling options for an Ollama request.
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Ollama API response for chat completion
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    /// Model that generated the response.
    pub model: String,
    /// Generated message.
    pub message: OllamaChatMessage,
    /// Whether generation is complete.
    pub done: bool,
    /// Total time taken in nanoseconds.
    #[serde(default)]
    pub total_duration: u64,
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_eval_count: u64,
    /// Number of tokens generated.
    #[serde(default)]
    pub eval_count: u64,
}

/// Ollama API request for embeddings
#[derive(Debug, Serialize)]
pub struct OllamaEmbedRequest {
    /// Embedding model to use.
    pub model: String,
    /// Texts to embed.
    pub input: Vec<String>,
}

/// Ollama API response for embeddings
#[derive(Debug, Deserialize)]
pub struct OllamaEmbedResponse {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Number of tokens evaluated across the batch.
    #[serde(default)]
    pub prompt_eval_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_dimension_known_models() {
        assert_eq!(embedding_dimension("nomic-embed-text"), Some(768));
        assert_eq!(embedding_dimension("nomic-embed-text:latest"), Some(768));
        assert_eq!(embedding_dimension("mxbai-embed-large"), Some(1024));
        assert_eq!(embedding_dimension("llama3.2:3b"), None);
    }

    #[test]
    fn embedding_model_detection() {
        assert!(is_embedding_model("nomic-embed-text"));
        assert!(is_embedding_model("custom-embed-v2"));
        assert!(!is_embedding_model("llama3.2:3b"));
    }

    #[test]
    fn list_response_parses_with_and_without_details() {
        let payload = r#"{
            "models": [
                {"name": "llama3.2:3b", "size": 2019393189, "digest": "abc",
                 "modified_at": "2025-01-01T00:00:00Z",
                 "details": {"parameter_size": "3.2B", "quantization_level": "Q4_K_M", "family": "llama"}},
                {"name": "nomic-embed-text:latest", "size": 274302450}
            ]
        }"#;

        let parsed: OllamaListResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.models.len(), 2);
        assert_eq!(parsed.models[0].parameter_label(), Some("3.2B"));
        assert_eq!(parsed.models[1].parameter_label(), None);
    }

    #[test]
    fn chat_request_omits_empty_options() {
        let request = OllamaChatRequest {
            model: "llama3.2:3b".to_owned(),
            messages: vec![OllamaChatMessage {
                role: "user".to_owned(),
                content: "hi".to_owned(),
            }],
            stream: false,
            options: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("options"));
    }
}
