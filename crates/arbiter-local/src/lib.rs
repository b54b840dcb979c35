//! Local inference integration: Ollama server management, chat and embedding
//! providers, disk-cache scanning, and accelerator detection.

/// Local chat provider backed by the Ollama chat API.
pub mod chat;
/// Local embedding provider backed by the Ollama embed API.
pub mod embedding;
/// Error types for local inference operations.
pub mod error;
/// Ollama server management: liveness, model listing, pulling.
pub mod manager;
/// Wire types and model metadata for the Ollama API.
pub mod models;
/// Disk-cache scanning and hardware accelerator detection.
pub mod system;

pub use chat::OllamaChatProvider;
pub use embedding::OllamaEmbeddingProvider;
pub use error::{LocalError, Result};
pub use manager::OllamaManager;
pub use models::{OllamaModel, embedding_dimension, is_embedding_model};
pub use system::{DiskModel, DiskSource, detect_accelerator, scan_model_caches};
