//! Compiled-in model metadata used to seed the registry and price usage.

use arbiter_core::ProviderMode;

use crate::descriptor::ProviderKind;

/// One known model with its serving vendor and pricing.
#[derive(Debug, Clone, Copy)]
pub struct CatalogModel {
    /// Model name as the vendor's API expects it.
    pub model_name: &'static str,
    /// Vendor slug used in provider ids (`openai`, `openrouter`, `ollama`).
    pub vendor: &'static str,
    /// Capability class.
    pub kind: ProviderKind,
    /// Execution mode.
    pub mode: ProviderMode,
    /// Cost per million tokens in dollars; `None` means free.
    pub cost_per_million_tokens: Option<f64>,
    /// Vector dimension, embedding models only.
    pub dimension: Option<usize>,
}

/// Models the orchestrator knows out of the box.
///
/// Discovery extends the registry beyond this list at runtime; the catalog
/// is only the seed and the pricing source.
pub const MODEL_CATALOG: &[CatalogModel] = &[
    CatalogModel {
        model_name: "gpt-4o-mini",
        vendor: "openai",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Cloud,
        cost_per_million_tokens: Some(0.60),
        dimension: None,
    },
    CatalogModel {
        model_name: "gpt-4o",
        vendor: "openai",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Cloud,
        cost_per_million_tokens: Some(10.00),
        dimension: None,
    },
    CatalogModel {
        model_name: "anthropic/claude-3.5-sonnet",
        vendor: "openrouter",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Cloud,
        cost_per_million_tokens: Some(15.00),
        dimension: None,
    },
    CatalogModel {
        model_name: "text-embedding-3-small",
        vendor: "openai",
        kind: ProviderKind::Embedding,
        mode: ProviderMode::Cloud,
        cost_per_million_tokens: Some(0.02),
        dimension: Some(1536),
    },
    CatalogModel {
        model_name: "llama3.2:3b",
        vendor: "ollama",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Local,
        cost_per_million_tokens: None,
        dimension: None,
    },
    CatalogModel {
        model_name: "llama3.1:8b",
        vendor: "ollama",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Local,
        cost_per_million_tokens: None,
        dimension: None,
    },
    CatalogModel {
        model_name: "qwen2.5:14b",
        vendor: "ollama",
        kind: ProviderKind::Chat,
        mode: ProviderMode::Local,
        cost_per_million_tokens: None,
        dimension: None,
    },
    CatalogModel {
        model_name: "nomic-embed-text",
        vendor: "ollama",
        kind: ProviderKind::Embedding,
        mode: ProviderMode::Local,
        cost_per_million_tokens: None,
        dimension: Some(768),
    },
];

/// Looks up a catalog entry by model name.
#[must_use]
pub fn find_model(model_name: &str) -> Option<&'static CatalogModel> {
    MODEL_CATALOG
        .iter()
        .find(|entry| entry.model_name == model_name)
}

/// Cost per million tokens for a known model, `None` when free or unknown.
#[must_use]
pub fn cost_for(model_name: &str) -> Option<f64> {
    find_model(model_name).and_then(|entry| entry.cost_per_million_tokens)
}

/// Vector dimension for a known embedding model.
#[must_use]
pub fn embedding_dimension(model_name: &str) -> Option<usize> {
    find_model(model_name).and_then(|entry| entry.dimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(cost_for("gpt-4o-mini"), Some(0.60));
        assert_eq!(cost_for("anthropic/claude-3.5-sonnet"), Some(15.00));
        assert_eq!(cost_for("llama3.2:3b"), None);
        assert_eq!(cost_for("made-up-model"), None);
    }

    #[test]
    fn test_embedding_dimensions() {
        assert_eq!(embedding_dimension("text-embedding-3-small"), Some(1536));
        assert_eq!(embedding_dimension("nomic-embed-text"), Some(768));
        assert_eq!(embedding_dimension("gpt-4o"), None);
    }

    #[test]
    fn test_catalog_shape() {
        for entry in MODEL_CATALOG {
            assert!(!entry.model_name.is_empty());
            assert!(!entry.vendor.is_empty());
            if entry.kind == ProviderKind::Embedding {
                assert!(entry.dimension.is_some());
            }
        }

        let local_chat = MODEL_CATALOG
            .iter()
            .filter(|entry| {
                entry.mode == ProviderMode::Local && entry.kind == ProviderKind::Chat
            })
            .count();
        assert_eq!(local_chat, 3);
    }
}
