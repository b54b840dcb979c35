//! Provider orchestration for the arbiter inference router.
//!
//! This crate owns the moving parts above the raw providers: the
//! synchronized registry of chat and embedding providers, the background
//! health monitor, the deterministic complexity analyzer, the routing
//! table, local model discovery, and the completion and embedding
//! services that tie them together.

/// Deterministic query complexity scoring.
pub mod analyzer;
/// Compiled-in model metadata used for registry seeding and pricing.
pub mod catalog;
/// Provider descriptors, client handles, and health snapshots.
pub mod descriptor;
/// Best-effort discovery of locally available models.
pub mod discovery;
/// Embedding execution over the provider registry.
pub mod embed;
/// Orchestrator error types and result definitions.
pub mod error;
/// Background provider health monitoring.
pub mod health;
/// The synchronized provider registry.
pub mod registry;
/// Routing table from mode and complexity to a model.
pub mod router;
/// The unified completion service.
pub mod service;

pub use analyzer::QueryAnalyzer;
pub use catalog::{CatalogModel, MODEL_CATALOG, cost_for, embedding_dimension, find_model};
pub use descriptor::{
    ProviderClient, ProviderDescriptor, ProviderHealth, ProviderKind, ProviderStats,
    ProviderStatus,
};
pub use discovery::{DiscoveredModel, DiscoveryReport, ModelDiscovery};
pub use embed::EmbeddingService;
pub use error::{OrchestratorError, Result};
pub use health::HealthMonitor;
pub use registry::{ProviderRegistry, SelectedChat, SelectedEmbedding};
pub use router::{ModelRouter, RouteEntry};
pub use service::CompletionService;
