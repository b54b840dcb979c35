//! Routing table mapping execution mode and complexity to a model.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::info;

use arbiter_core::{ComplexityLevel, LockUnpoisoned as _, ProviderMode};

use crate::error::{OrchestratorError, Result};

/// Fixed iteration order for table snapshots.
const MODES: [ProviderMode; 2] = [ProviderMode::Cloud, ProviderMode::Local];
/// Fixed iteration order for table snapshots.
const LEVELS: [ComplexityLevel; 3] = [
    ComplexityLevel::Simple,
    ComplexityLevel::Medium,
    ComplexityLevel::Complex,
];

/// Compiled-in default model for every routing cell.
const fn default_route(mode: ProviderMode, level: ComplexityLevel) -> &'static str {
    match (mode, level) {
        (ProviderMode::Local, ComplexityLevel::Simple) => "llama3.2:3b",
        (ProviderMode::Local, ComplexityLevel::Medium) => "llama3.1:8b",
        (ProviderMode::Local, ComplexityLevel::Complex) => "qwen2.5:14b",
        (ProviderMode::Cloud, ComplexityLevel::Simple) => "gpt-4o-mini",
        (ProviderMode::Cloud, ComplexityLevel::Medium) => "gpt-4o",
        (ProviderMode::Cloud, ComplexityLevel::Complex) => "anthropic/claude-3.5-sonnet",
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Execution mode the row applies to.
    pub mode: ProviderMode,
    /// Complexity level the row applies to.
    pub level: ComplexityLevel,
    /// Model the cell resolves to.
    pub model_name: String,
}

/// Mutable mode-and-complexity routing table.
///
/// Updates are process-lifetime only; a restart returns to the compiled-in
/// defaults. Interior locking lets the router be shared behind an `Arc`
/// with discovery and the completion service.
pub struct ModelRouter {
    routes: Mutex<HashMap<(ProviderMode, ComplexityLevel), String>>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModelRouter {
    /// Creates a router seeded with the compiled-in default table.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut routes = HashMap::new();
        for mode in MODES {
            for level in LEVELS {
                routes.insert((mode, level), default_route(mode, level).to_owned());
            }
        }
        Self {
            routes: Mutex::new(routes),
        }
    }

    /// Resolves the model for a cell.
    ///
    /// Total: a missing row answers with the compiled-in default, so the
    /// router can never strand a request.
    #[must_use]
    pub fn select_model(&self, mode: ProviderMode, level: ComplexityLevel) -> String {
        let routes = self.routes.lock_unpoisoned();
        routes
            .get(&(mode, level))
            .cloned()
            .unwrap_or_else(|| default_route(mode, level).to_owned())
    }

    /// Rewrites one cell, effective for all subsequent requests.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the model name is empty.
    pub fn update_route(
        &self,
        mode: ProviderMode,
        level: ComplexityLevel,
        model_name: impl Into<String>,
    ) -> Result<()> {
        let model_name = model_name.into();
        if model_name.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "route model name must not be empty".to_owned(),
            ));
        }

        info!(mode = %mode, level = %level, model = %model_name, "route updated");
        let mut routes = self.routes.lock_unpoisoned();
        routes.insert((mode, level), model_name);
        Ok(())
    }

    /// Full table snapshot in a stable order, for introspection.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry> {
        let mut snapshot = Vec::with_capacity(MODES.len() * LEVELS.len());
        for mode in MODES {
            for level in LEVELS {
                snapshot.push(RouteEntry {
                    mode,
                    level,
                    model_name: self.select_model(mode, level),
                });
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_total() {
        let router = ModelRouter::with_defaults();

        assert_eq!(
            router.select_model(ProviderMode::Local, ComplexityLevel::Simple),
            "llama3.2:3b"
        );
        assert_eq!(
            router.select_model(ProviderMode::Local, ComplexityLevel::Medium),
            "llama3.1:8b"
        );
        assert_eq!(
            router.select_model(ProviderMode::Local, ComplexityLevel::Complex),
            "qwen2.5:14b"
        );
        assert_eq!(
            router.select_model(ProviderMode::Cloud, ComplexityLevel::Simple),
            "gpt-4o-mini"
        );
        assert_eq!(
            router.select_model(ProviderMode::Cloud, ComplexityLevel::Medium),
            "gpt-4o"
        );
        assert_eq!(
            router.select_model(ProviderMode::Cloud, ComplexityLevel::Complex),
            "anthropic/claude-3.5-sonnet"
        );
    }

    #[test]
    fn test_update_route_takes_effect() {
        let router = ModelRouter::with_defaults();

        router
            .update_route(ProviderMode::Local, ComplexityLevel::Simple, "phi3:mini")
            .unwrap();

        assert_eq!(
            router.select_model(ProviderMode::Local, ComplexityLevel::Simple),
            "phi3:mini"
        );
        assert!(router.routes().iter().any(|entry| {
            entry.mode == ProviderMode::Local
                && entry.level == ComplexityLevel::Simple
                && entry.model_name == "phi3:mini"
        }));
    }

    #[test]
    fn test_update_route_rejects_empty_names() {
        let router = ModelRouter::with_defaults();

        for bad in ["", "   "] {
            let result = router.update_route(ProviderMode::Cloud, ComplexityLevel::Medium, bad);
            assert!(matches!(
                result,
                Err(OrchestratorError::InvalidRequest(_))
            ));
        }

        assert_eq!(
            router.select_model(ProviderMode::Cloud, ComplexityLevel::Medium),
            "gpt-4o"
        );
    }

    #[test]
    fn test_missing_row_answers_with_default() {
        let router = ModelRouter {
            routes: Mutex::new(HashMap::new()),
        };

        assert_eq!(
            router.select_model(ProviderMode::Cloud, ComplexityLevel::Complex),
            "anthropic/claude-3.5-sonnet"
        );
    }

    #[test]
    fn test_routes_snapshot_stable_order() {
        let router = ModelRouter::with_defaults();
        let snapshot = router.routes();

        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot[0].mode, ProviderMode::Cloud);
        assert_eq!(snapshot[0].level, ComplexityLevel::Simple);
        assert_eq!(snapshot[5].mode, ProviderMode::Local);
        assert_eq!(snapshot[5].level, ComplexityLevel::Complex);
    }
}
