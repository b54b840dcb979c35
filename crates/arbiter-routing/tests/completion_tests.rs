//! End-to-end tests for the completion service.
//!
//! These run the full request flow against mock providers: validation,
//! mode resolution, routing, timeouts, fallback, and stats recording.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use std::sync::Arc;
use std::time::Duration;

use arbiter_core::{ChatRequest, ModeSelection, OrchestratorConfig, ProviderMode};
use arbiter_providers::MockChatProvider;
use arbiter_routing::{
    CompletionService, ModelRouter, OrchestratorError, ProviderClient, ProviderDescriptor,
    ProviderKind, ProviderRegistry, ProviderStatus,
};
use tracing_subscriber::fmt;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt as _, registry as subscriber_registry,
    util::SubscriberInitExt as _,
};

/// Initialize tracing for tests
fn init_tracing() {
    drop(
        subscriber_registry()
            .with(fmt::layer().with_test_writer().with_target(false))
            .with(EnvFilter::from_default_env())
            .try_init(),
    );
}

fn build_service(registry: &Arc<ProviderRegistry>) -> CompletionService {
    init_tracing();
    let router = Arc::new(ModelRouter::with_defaults());
    let config = OrchestratorConfig::default();
    CompletionService::new(Arc::clone(registry), router, &config)
}

fn register_chat(
    registry: &ProviderRegistry,
    vendor: &str,
    mode: ProviderMode,
    model: &str,
    provider: MockChatProvider,
) {
    registry.register(
        ProviderDescriptor::new(vendor, ProviderKind::Chat, mode, model),
        ProviderClient::Chat(Arc::new(provider)),
    );
}

#[tokio::test]
async fn test_smart_routed_completion_records_success() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.2:3b",
        MockChatProvider::new("mock").with_default_reply("pong"),
    );
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi").with_mode(ModeSelection::Local);
    let result = service.complete(request).await.unwrap();

    assert_eq!(result.content, "pong");
    assert_eq!(result.model_used, "llama3.2:3b");
    assert_eq!(result.mode_used, ProviderMode::Local);
    assert!(!result.fallback_used);

    let report = result.complexity.expect("smart routing ran");
    assert_eq!(report.score, 0);

    let stats = registry.get("mock-llama3.2:3b").unwrap().stats;
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.error_count, 0);
    assert_eq!(stats.total_tokens, 6);
}

#[tokio::test]
async fn test_failed_primary_falls_back_to_opposite_mode() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.2:3b",
        MockChatProvider::new("mock").failing("connection refused"),
    );
    register_chat(
        &registry,
        "cloud",
        ProviderMode::Cloud,
        "gpt-4o-mini",
        MockChatProvider::new("cloud").with_default_reply("from the cloud"),
    );
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi").with_mode(ModeSelection::Local);
    let result = service.complete(request).await.unwrap();

    assert!(result.fallback_used);
    assert_eq!(result.mode_used, ProviderMode::Cloud);
    assert_eq!(result.model_used, "gpt-4o-mini");
    assert_eq!(result.content, "from the cloud");

    assert_eq!(registry.get("mock-llama3.2:3b").unwrap().stats.error_count, 1);
    assert_eq!(registry.get("cloud-gpt-4o-mini").unwrap().stats.request_count, 1);
}

#[tokio::test]
async fn test_fallback_disabled_surfaces_exhaustion() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.2:3b",
        MockChatProvider::new("mock").failing("boom"),
    );
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi")
        .with_mode(ModeSelection::Local)
        .with_fallback(false);
    let error = service.complete(request).await.unwrap_err();

    match error {
        OrchestratorError::AllProvidersExhausted { detail } => {
            assert!(detail.contains("boom"), "detail was: {detail}");
        }
        other => panic!("expected exhaustion, got: {other}"),
    }
}

#[tokio::test]
async fn test_slow_provider_times_out_and_counts_as_failure() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.2:3b",
        MockChatProvider::new("mock").with_delay(Duration::from_millis(200)),
    );
    let service = build_service(&registry).with_request_timeout(Duration::from_millis(50));

    let request = ChatRequest::from_prompt("hi")
        .with_mode(ModeSelection::Local)
        .with_fallback(false);
    let error = service.complete(request).await.unwrap_err();

    match error {
        OrchestratorError::AllProvidersExhausted { detail } => {
            assert!(detail.contains("timed out"), "detail was: {detail}");
        }
        other => panic!("expected exhaustion, got: {other}"),
    }

    let stats = registry.get("mock-llama3.2:3b").unwrap().stats;
    assert_eq!(stats.error_count, 1);
    assert_eq!(stats.request_count, 1);
}

#[tokio::test]
async fn test_override_bypasses_health_gate() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "pinned:7b",
        MockChatProvider::new("mock").with_default_reply("still here"),
    );
    registry
        .set_status("mock-pinned:7b", ProviderStatus::Unavailable)
        .unwrap();
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi")
        .with_mode(ModeSelection::Local)
        .with_model_override("pinned:7b")
        .with_fallback(false);
    let result = service.complete(request).await.unwrap();

    assert_eq!(result.content, "still here");
    assert_eq!(result.model_used, "pinned:7b");
    assert!(result.complexity.is_none());
}

#[tokio::test]
async fn test_override_of_unknown_model_feeds_fallback() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "cloud",
        ProviderMode::Cloud,
        "gpt-4o-mini",
        MockChatProvider::new("cloud").with_default_reply("rescued"),
    );
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi")
        .with_mode(ModeSelection::Local)
        .with_model_override("ghost:model");
    let result = service.complete(request).await.unwrap();

    assert!(result.fallback_used);
    assert_eq!(result.mode_used, ProviderMode::Cloud);
    assert_eq!(result.content, "rescued");
}

#[tokio::test]
async fn test_auto_mode_switches_with_local_health() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.2:3b",
        MockChatProvider::new("mock").with_default_reply("local answer"),
    );
    register_chat(
        &registry,
        "cloud",
        ProviderMode::Cloud,
        "gpt-4o-mini",
        MockChatProvider::new("cloud").with_default_reply("cloud answer"),
    );
    let service = build_service(&registry);

    // No healthy local chat provider yet, so AUTO lands on cloud.
    let first = service
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    assert_eq!(first.mode_used, ProviderMode::Cloud);

    registry
        .record_probe("mock-llama3.2:3b", ProviderStatus::Healthy)
        .unwrap();
    let second = service
        .complete(ChatRequest::from_prompt("hi"))
        .await
        .unwrap();
    assert_eq!(second.mode_used, ProviderMode::Local);
    assert_eq!(second.content, "local answer");
}

#[tokio::test]
async fn test_cost_accumulates_from_catalog_price() {
    let registry = Arc::new(ProviderRegistry::default());
    registry.register(
        ProviderDescriptor::new(
            "cloud",
            ProviderKind::Chat,
            ProviderMode::Cloud,
            "gpt-4o-mini",
        )
        .with_cost(10.0),
        ProviderClient::Chat(Arc::new(
            MockChatProvider::new("cloud").with_default_reply("pong"),
        )),
    );
    let service = build_service(&registry);

    let request = ChatRequest::from_prompt("hi").with_mode(ModeSelection::Cloud);
    service.complete(request).await.unwrap();

    let stats = registry.get("cloud-gpt-4o-mini").unwrap().stats;
    // "hi" is 2 prompt tokens and "pong" 4 completion tokens in the mock.
    assert_eq!(stats.total_tokens, 6);
    assert!((stats.total_cost - 0.000_06).abs() < 1e-12);
    assert!(stats.average_latency_ms >= 0.0);
}

#[tokio::test]
async fn test_complexity_report_routes_to_stronger_model() {
    let registry = Arc::new(ProviderRegistry::default());
    register_chat(
        &registry,
        "mock",
        ProviderMode::Local,
        "llama3.1:8b",
        MockChatProvider::new("mock").with_default_reply("medium answer"),
    );
    let service = build_service(&registry);

    // Stacked complex keywords push the score into the medium band.
    let request = ChatRequest::from_prompt("Compare the options and evaluate the trade-off")
        .with_mode(ModeSelection::Local)
        .with_fallback(false);
    let result = service.complete(request).await.unwrap();

    assert_eq!(result.model_used, "llama3.1:8b");
    let report = result.complexity.unwrap();
    assert_eq!(report.score, 9);
}
