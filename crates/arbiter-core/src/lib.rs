//! Core types and traits for the arbiter inference orchestrator.
//!
//! This crate provides the shared vocabulary of the system: chat and
//! embedding provider traits, request/response types, complexity reporting,
//! configuration loading, and error handling used across the workspace.

/// Configuration loading, saving, and defaults.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Lock helpers shared by the registry and router.
pub mod sync;
/// Trait definitions for chat and embedding providers.
pub mod traits;
/// Core data types for requests, results, and complexity reports.
pub mod types;

pub use config::{
    AnalyzerConfig, ApiKeys, DiscoveryConfig, ExecutionConfig, HealthConfig, OrchestratorConfig,
    ProviderSettings,
};
pub use error::{Error, Result};
pub use sync::LockUnpoisoned;
pub use traits::{ChatProvider, EmbeddingProvider};
pub use types::{
    ChatMessage, ChatRequest, ChatResult, ComplexityLevel, ComplexityReport, EmbeddingBatch,
    GenerationParams, ModeSelection, ProviderMode, ProviderReply, Role, TokenUsage,
};
