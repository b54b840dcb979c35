//! Configuration types for providers, routing, health checks, and discovery.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ProviderMode;
use crate::{Error, Result};

/// Comment block prepended to a freshly written config file.
const CONFIG_FILE_HEADER: &str = "# Arbiter configuration\n# Written on first run; edit freely.\n\n";

/// Complete orchestrator configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider enablement and default models
    pub providers: ProviderSettings,
    /// API keys for cloud providers
    pub api_keys: ApiKeys,
    /// Complexity analyzer weights and thresholds
    pub analyzer: AnalyzerConfig,
    /// Health monitoring and failure thresholds
    pub health: HealthConfig,
    /// Request execution settings
    pub execution: ExecutionConfig,
    /// Local model discovery settings
    pub discovery: DiscoveryConfig,
}

/// API keys for cloud providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeys {
    /// Key for `OpenAI` chat and embedding endpoints
    pub openai_api_key: Option<String>,
    /// Key for the `OpenRouter` gateway and its multi-vendor slugs
    pub openrouter_api_key: Option<String>,
}

/// Provider enablement and per-mode default models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether cloud providers are enabled
    pub cloud_enabled: bool,
    /// Whether local providers are enabled
    pub local_enabled: bool,
    /// Default cloud chat model (non-smart requests and fallback target)
    pub cloud_chat_model: String,
    /// Default local chat model (non-smart requests and fallback target)
    pub local_chat_model: String,
    /// Default cloud embedding model
    pub cloud_embedding_model: String,
    /// Default local embedding model
    pub local_embedding_model: String,
    /// Base URL of the local inference server
    pub ollama_url: String,
}

impl ProviderSettings {
    /// Default chat model for the given mode.
    #[must_use]
    pub fn chat_model_for(&self, mode: ProviderMode) -> &str {
        match mode {
            ProviderMode::Cloud => &self.cloud_chat_model,
            ProviderMode::Local => &self.local_chat_model,
        }
    }

    /// Default embedding model for the given mode.
    #[must_use]
    pub fn embedding_model_for(&self, mode: ProviderMode) -> &str {
        match mode {
            ProviderMode::Cloud => &self.cloud_embedding_model,
            ProviderMode::Local => &self.local_embedding_model,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            cloud_enabled: true,
            local_enabled: true,
            cloud_chat_model: "gpt-4o-mini".to_owned(),
            local_chat_model: "llama3.2:3b".to_owned(),
            cloud_embedding_model: "text-embedding-3-small".to_owned(),
            local_embedding_model: "nomic-embed-text".to_owned(),
            ollama_url: "http://localhost:11434".to_owned(),
        }
    }
}

/// Weights and thresholds for the query complexity analyzer.
///
/// Every number the analyzer uses lives here so scoring can be recalibrated
/// without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Character count where a query stops being short
    pub length_medium_chars: usize,
    /// Character count where a query becomes long
    pub length_long_chars: usize,
    /// Character count where a query becomes very long
    pub length_very_long_chars: usize,
    /// Points for medium-length queries
    pub length_medium_points: u32,
    /// Points for long queries
    pub length_long_points: u32,
    /// Points for very long queries
    pub length_very_long_points: u32,
    /// Points when any complex-intent keyword matches
    pub complex_keyword_points: u32,
    /// Bonus when two or more distinct complex-intent keywords match
    pub multiple_keyword_bonus: u32,
    /// Points when the text contains more than one question mark
    pub compound_question_points: u32,
    /// Points when technical vocabulary is present
    pub technical_term_points: u32,
    /// Points when code is present
    pub code_points: u32,
    /// Points when the text refers back to earlier conversation
    pub context_reference_points: u32,
    /// Points when the text sequences multiple steps
    pub multi_step_points: u32,
    /// Highest score still classified as simple
    pub simple_max_score: u32,
    /// Highest score still classified as medium
    pub medium_max_score: u32,
    /// Divisor normalizing the score into a confidence value
    pub confidence_divisor: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            length_medium_chars: 50,
            length_long_chars: 150,
            length_very_long_chars: 500,
            length_medium_points: 3,
            length_long_points: 5,
            length_very_long_points: 7,
            complex_keyword_points: 6,
            multiple_keyword_bonus: 3,
            compound_question_points: 3,
            technical_term_points: 2,
            code_points: 2,
            context_reference_points: 3,
            multi_step_points: 2,
            simple_max_score: 3,
            medium_max_score: 10,
            confidence_divisor: 10.0,
        }
    }
}

/// Health monitoring intervals and failure thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between background health sweeps
    pub check_interval_seconds: u64,
    /// Seconds a single probe may take before counting as failed
    pub probe_timeout_seconds: u64,
    /// Seconds within which call failures count as consecutive
    pub failure_window_seconds: u64,
    /// Consecutive failures before a provider is marked degraded
    pub degraded_after_failures: u32,
    /// Consecutive failures before a provider is marked unavailable
    pub unavailable_after_failures: u32,
}

impl HealthConfig {
    /// Interval between background sweeps.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Per-probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Window within which failures form a streak.
    #[must_use]
    pub const fn failure_window(&self) -> Duration {
        Duration::from_secs(self.failure_window_seconds)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 300,
            probe_timeout_seconds: 3,
            failure_window_seconds: 60,
            degraded_after_failures: 3,
            unavailable_after_failures: 6,
        }
    }
}

/// Request execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Seconds a single provider call may take before it is abandoned
    pub request_timeout_seconds: u64,
}

impl ExecutionConfig {
    /// Per-attempt timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 60,
        }
    }
}

/// Local model discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Discovery toggles are independently settable"
)]
pub struct DiscoveryConfig {
    /// Whether discovery runs at all
    pub enabled: bool,
    /// Whether to ask the local inference server for its installed models
    pub query_server_catalog: bool,
    /// Whether to look for model artifacts in local disk caches
    pub scan_disk_caches: bool,
    /// Whether to detect hardware acceleration and bias local routes
    pub detect_accelerator: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query_server_catalog: true,
            scan_disk_caches: true,
            detect_accelerator: true,
        }
    }
}

impl OrchestratorConfig {
    /// Directory holding orchestrator state (`~/.arbiter`).
    ///
    /// # Errors
    /// Fails when no home directory is available.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".arbiter"))
            .ok_or_else(|| Error::Config("no home directory available".to_owned()))
    }

    /// Location of the config file (`~/.arbiter/config.toml`).
    ///
    /// # Errors
    /// Fails when no home directory is available.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads the config from the default location, writing defaults on first run.
    ///
    /// # Errors
    /// Fails when an existing file cannot be read or parsed, or when the
    /// default file cannot be written.
    pub fn load_or_create() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            return Self::load_from_file(&path);
        }

        let config = Self::default();
        config.save_to_file(&path)?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    /// Fails when the file cannot be read or is not valid TOML.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("could not read {}: {error}", path.display())))?;
        let config: Self = toml::from_str(&raw)?;

        debug!(
            path = %path.display(),
            openai_key = config.api_keys.openai_api_key.is_some(),
            openrouter_key = config.api_keys.openrouter_api_key.is_some(),
            "loaded orchestrator config"
        );

        Ok(config)
    }

    /// Writes the config as annotated TOML, creating parent directories as needed.
    ///
    /// # Errors
    /// Fails when serialization or any filesystem step fails.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("could not create {}: {error}", parent.display()))
            })?;
        }

        let body = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("could not serialize config: {error}")))?;

        fs::write(path, format!("{CONFIG_FILE_HEADER}{body}"))
            .map_err(|error| Error::Config(format!("could not write {}: {error}", path.display())))
    }

    /// Resolves a cloud vendor's API key, preferring the config file over env vars.
    #[must_use]
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        let (configured, env_key) = match provider {
            "openai" => (&self.api_keys.openai_api_key, "OPENAI_API_KEY"),
            "openrouter" => (&self.api_keys.openrouter_api_key, "OPENROUTER_API_KEY"),
            _ => return None,
        };

        configured.clone().or_else(|| env::var(env_key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderMode;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.providers.local_enabled);
        assert!(config.discovery.enabled);
        assert_eq!(config.providers.ollama_url, "http://localhost:11434");
        assert_eq!(config.health.check_interval_seconds, 300);
        assert_eq!(config.health.probe_timeout_seconds, 3);
        assert_eq!(config.health.degraded_after_failures, 3);
        assert_eq!(config.execution.request_timeout_seconds, 60);
        assert_eq!(config.analyzer.simple_max_score, 3);
    }

    #[test]
    fn test_default_models_per_mode() {
        let config = OrchestratorConfig::default();
        assert_eq!(
            config.providers.chat_model_for(ProviderMode::Cloud),
            "gpt-4o-mini"
        );
        assert_eq!(
            config.providers.chat_model_for(ProviderMode::Local),
            "llama3.2:3b"
        );
        assert_eq!(
            config.providers.embedding_model_for(ProviderMode::Local),
            "nomic-embed-text"
        );
    }

    #[test]
    fn test_round_trip_preserves_api_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = OrchestratorConfig::default();
        config.api_keys.openai_api_key = Some("sk-test-openai".to_owned());
        config.api_keys.openrouter_api_key = Some("sk-or-test-router".to_owned());
        config.save_to_file(&path).unwrap();

        let reloaded = OrchestratorConfig::load_from_file(&path).unwrap();
        assert_eq!(
            reloaded.get_api_key("openai").as_deref(),
            Some("sk-test-openai")
        );
        assert_eq!(
            reloaded.get_api_key("openrouter").as_deref(),
            Some("sk-or-test-router")
        );
        assert_eq!(reloaded.get_api_key("mystery"), None);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = OrchestratorConfig::default();
        config.providers.local_chat_model = "qwen2.5:14b".to_owned();
        config.health.degraded_after_failures = 5;
        config.save_to_file(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Arbiter configuration"));

        let reloaded = OrchestratorConfig::load_from_file(&path).unwrap();
        assert_eq!(reloaded.providers.local_chat_model, "qwen2.5:14b");
        assert_eq!(reloaded.health.degraded_after_failures, 5);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = OrchestratorConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
