//! End-to-end orchestration walkthrough against mock providers:
//! registration, routing, overrides, fallback, embeddings, and health.

use std::io::stderr;
use std::sync::Arc;

use arbiter_core::{ChatRequest, ModeSelection, OrchestratorConfig, ProviderMode};
use arbiter_providers::{MockChatProvider, MockEmbeddingProvider};
use arbiter_routing::{
    CompletionService, EmbeddingService, ModelRouter, ProviderClient, ProviderDescriptor,
    ProviderKind, ProviderRegistry, ProviderStatus,
};
use tracing::subscriber::set_global_default;
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = fmt().with_writer(stderr).finish();
    set_global_default(subscriber)?;

    println!("=== Model Orchestration Example ===\n");

    let config = OrchestratorConfig::default();
    let registry = Arc::new(ProviderRegistry::new(config.health.clone()));
    let router = Arc::new(ModelRouter::with_defaults());

    // Local chat models answered by mocks instead of a live Ollama server.
    for model in ["llama3.2:3b", "llama3.1:8b", "qwen2.5:14b"] {
        let descriptor =
            ProviderDescriptor::new("ollama", ProviderKind::Chat, ProviderMode::Local, model);
        let client = MockChatProvider::new("ollama")
            .with_default_reply(format!("{model} checking in from the local machine"));
        registry.register(descriptor, ProviderClient::Chat(Arc::new(client)));
        registry.record_probe(
            &ProviderDescriptor::compose_id("ollama", model),
            ProviderStatus::Healthy,
        )?;
    }

    // One cloud chat model and one local embedding model round out the fleet.
    let cloud = ProviderDescriptor::new(
        "openai",
        ProviderKind::Chat,
        ProviderMode::Cloud,
        "gpt-4o-mini",
    )
    .with_cost(0.60);
    let cloud_client =
        MockChatProvider::new("openai").with_default_reply("gpt-4o-mini answering from the cloud");
    registry.register(cloud, ProviderClient::Chat(Arc::new(cloud_client)));
    registry.record_probe("openai-gpt-4o-mini", ProviderStatus::Healthy)?;

    let embedder = ProviderDescriptor::new(
        "ollama",
        ProviderKind::Embedding,
        ProviderMode::Local,
        "nomic-embed-text",
    )
    .with_dimension(768);
    let embed_client = MockEmbeddingProvider::new("ollama").with_dimension(768);
    registry.register(embedder, ProviderClient::Embedding(Arc::new(embed_client)));
    registry.record_probe("ollama-nomic-embed-text", ProviderStatus::Healthy)?;

    println!("Registered providers: {}", registry.provider_count());
    println!("Routing table:");
    for route in router.routes() {
        println!("  {}/{} -> {}", route.mode, route.level, route.model_name);
    }
    println!();

    let service = CompletionService::new(Arc::clone(&registry), Arc::clone(&router), &config);

    // Example 1: a simple question routes to the smallest local model.
    println!("Example 1: Simple question");
    let request = ChatRequest::from_prompt("What is a mutex?");
    let result = service.complete(request).await?;
    println!("  Model used: {} ({})", result.model_used, result.mode_used);
    if let Some(report) = &result.complexity {
        println!(
            "  Complexity: {} (score {}, confidence {:.2})",
            report.level, report.score, report.confidence
        );
        println!("  Indicators: {:?}", report.indicators);
    }
    println!("  Reply: {}\n", result.content);

    // Example 2: an analysis-heavy prompt climbs the routing table.
    println!("Example 2: Complex prompt");
    let request = ChatRequest::from_prompt(
        "Analyze the caching architecture, compare eviction algorithms, and \
         design a benchmark that can evaluate the trade-off between hit rate \
         and memory usage. First outline the approach, then implement it.",
    );
    let result = service.complete(request).await?;
    println!("  Model used: {} ({})", result.model_used, result.mode_used);
    if let Some(report) = &result.complexity {
        println!(
            "  Complexity: {} (score {}, confidence {:.2})",
            report.level, report.score, report.confidence
        );
    }
    println!("  Reply: {}\n", result.content);

    // Example 3: a pinned model skips the analyzer entirely.
    println!("Example 3: Model override");
    let request = ChatRequest::from_prompt("Say hi")
        .with_mode(ModeSelection::Cloud)
        .with_model_override("gpt-4o-mini");
    let result = service.complete(request).await?;
    println!("  Model used: {} ({})", result.model_used, result.mode_used);
    println!("  Analyzer ran: {}\n", result.complexity.is_some());

    // Example 4: a downed local fleet falls back to the cloud.
    println!("Example 4: Fallback");
    for model in ["llama3.2:3b", "llama3.1:8b", "qwen2.5:14b"] {
        let id = ProviderDescriptor::compose_id("ollama", model);
        registry.set_status(&id, ProviderStatus::Unavailable)?;
    }
    let request = ChatRequest::from_prompt("Hello again").with_mode(ModeSelection::Local);
    let result = service.complete(request).await?;
    println!("  Model used: {} ({})", result.model_used, result.mode_used);
    println!("  Fallback used: {}\n", result.fallback_used);

    // Example 5: embeddings flow through the same registry.
    println!("Example 5: Embeddings");
    let embeddings = EmbeddingService::new(Arc::clone(&registry), &config);
    let texts = vec!["first document".to_owned(), "second document".to_owned()];
    let batch = embeddings.embed(&texts, ModeSelection::Auto).await?;
    println!(
        "  {} vectors of dimension {} from {} ({})\n",
        batch.vectors.len(),
        batch.dimension,
        batch.model_used,
        batch.mode_used
    );

    // Example 6: health snapshot and usage accounting.
    println!("Example 6: Health snapshot");
    for entry in registry.health_snapshot() {
        println!(
            "  {} status={} probed={}",
            entry.id,
            entry.status,
            entry.last_checked_at.is_some()
        );
    }
    let cloud_stats = registry.get("openai-gpt-4o-mini")?.stats;
    println!(
        "  Cloud usage: {} requests, {} tokens, ${:.6}",
        cloud_stats.request_count, cloud_stats.total_tokens, cloud_stats.total_cost
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
