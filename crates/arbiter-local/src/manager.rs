use reqwest::Client;
use serde::Serialize;

use crate::models::{OllamaListResponse, OllamaModel};
use crate::{LocalError, Result};

/// Client for the local Ollama server's management API.
pub struct OllamaManager {
    client: Client,
    base_url: String,
}

/// Wire body for `POST /api/pull`.
#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

impl OllamaManager {
    /// Creates a manager against the default server address.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_owned(),
        }
    }

    /// Overrides the server base URL.
    #[must_use]
    pub fn with_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Base URL this manager talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Whether the server is up and answering its catalog endpoint.
    pub async fn is_available(&self) -> bool {
        match self.client.get(self.endpoint("/api/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Models currently installed on the server.
    ///
    /// # Errors
    ///
    /// Returns `ServerUnavailable` when the server cannot be reached, or a
    /// transport error when the catalog body does not parse.
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|err| LocalError::ServerUnavailable(err.to_string()))?;

        let list = response.json::<OllamaListResponse>().await?;
        Ok(list.models)
    }

    /// Whether a model with the given name (or name prefix) is installed.
    ///
    /// # Errors
    ///
    /// Returns an error when the installed-model list cannot be fetched.
    pub async fn has_model(&self, model_name: &str) -> Result<bool> {
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|model| model.name.starts_with(model_name)))
    }

    /// Downloads a model into the server's local store.
    ///
    /// # Errors
    ///
    /// Returns `PullFailed` when the server rejects the pull.
    pub async fn pull_model(&self, model_name: &str) -> Result<()> {
        let body = PullRequest {
            name: model_name,
            stream: false,
        };
        let response = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LocalError::PullFailed(format!(
                "{model_name}: server answered {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Pulls a model only when it is not already installed.
    ///
    /// # Errors
    ///
    /// Returns an error when the install check or the pull fails.
    pub async fn ensure_model(&self, model_name: &str) -> Result<()> {
        if self.has_model(model_name).await? {
            return Ok(());
        }
        self.pull_model(model_name).await
    }
}

impl Default for OllamaManager {
    fn default() -> Self {
        Self::new()
    }
}
