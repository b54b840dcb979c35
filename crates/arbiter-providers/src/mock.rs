//! Mock providers for testing orchestration flows.
//!
//! Allows defining canned replies for specific prompts, scripted failures,
//! and unhealthy probes, enabling end-to-end testing of routing, fallback,
//! and health monitoring without real API calls.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash as _, Hasher as _};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use arbiter_core::{
    ChatMessage, ChatProvider, EmbeddingProvider, Error, GenerationParams, LockUnpoisoned as _,
    ProviderReply, Result, TokenUsage,
};

/// Reply storage type
type ReplyMap = Arc<Mutex<HashMap<String, String>>>;

/// Mock chat provider that returns pre-defined replies based on prompt patterns.
///
/// Clones share state, so a test can keep one handle for assertions while the
/// registry owns another.
#[derive(Clone)]
pub struct MockChatProvider {
    /// Vendor name reported by `name()`
    name: String,
    /// Predefined replies keyed by prompt text
    replies: ReplyMap,
    /// Default reply if no match found
    default_reply: Arc<Mutex<Option<String>>>,
    /// Prompts seen by `chat`, in order
    call_history: Arc<Mutex<Vec<String>>>,
    /// When set, every chat call fails with this message
    fail_with: Arc<Mutex<Option<String>>>,
    /// When false, probes fail
    probe_healthy: Arc<Mutex<bool>>,
    /// Simulated latency applied to every probe and chat call
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockChatProvider {
    /// Creates a mock that reports the given vendor name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Arc::new(Mutex::new(HashMap::new())),
            default_reply: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            fail_with: Arc::new(Mutex::new(None)),
            probe_healthy: Arc::new(Mutex::new(true)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Registers a canned reply for prompts matching `pattern`.
    #[must_use]
    pub fn with_reply(self, pattern: impl Into<String>, reply: impl Into<String>) -> Self {
        {
            let mut replies = self.replies.lock_unpoisoned();
            replies.insert(pattern.into(), reply.into());
        }
        self
    }

    /// Sets the reply used when no pattern matches.
    #[must_use]
    pub fn with_default_reply(self, reply: impl Into<String>) -> Self {
        {
            let mut default = self.default_reply.lock_unpoisoned();
            *default = Some(reply.into());
        }
        self
    }

    /// Make every chat call fail with the given message.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        {
            let mut fail = self.fail_with.lock_unpoisoned();
            *fail = Some(message.into());
        }
        self
    }

    /// Make probes fail until toggled back.
    #[must_use]
    pub fn with_unhealthy_probe(self) -> Self {
        {
            let mut healthy = self.probe_healthy.lock_unpoisoned();
            *healthy = false;
        }
        self
    }

    /// Simulate latency on every probe and chat call.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        {
            let mut slot = self.delay.lock_unpoisoned();
            *slot = Some(delay);
        }
        self
    }

    /// Toggle failure behavior at runtime.
    pub fn set_failing(&self, message: Option<String>) {
        let mut fail = self.fail_with.lock_unpoisoned();
        *fail = message;
    }

    /// Toggle probe health at runtime.
    pub fn set_probe_healthy(&self, healthy: bool) {
        let mut flag = self.probe_healthy.lock_unpoisoned();
        *flag = healthy;
    }

    /// Forgets all recorded calls.
    pub fn clear_history(&self) {
        let mut history = self.call_history.lock_unpoisoned();
        history.clear();
    }

    /// Recorded prompts, one per chat call.
    #[must_use]
    pub fn get_call_history(&self) -> Vec<String> {
        let history = self.call_history.lock_unpoisoned();
        history.clone()
    }

    /// Number of chat calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let history = self.call_history.lock_unpoisoned();
        history.len()
    }

    /// Looks up a reply: exact prompt matches win, then substring patterns.
    fn find_reply(&self, prompt: &str) -> Option<String> {
        let replies = self.replies.lock_unpoisoned();
        if let Some(reply) = replies.get(prompt) {
            return Some(reply.clone());
        }

        replies
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
    }

    /// Sleep for the configured latency, if any.
    async fn apply_delay(&self) {
        let delay = *self.delay.lock_unpoisoned();
        if let Some(wait) = delay {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        self.apply_delay().await;

        let healthy = *self.probe_healthy.lock_unpoisoned();
        if healthy {
            Ok(())
        } else {
            Err(Error::Provider(format!("{} probe unhealthy", self.name)))
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<ProviderReply> {
        self.apply_delay().await;

        let prompt = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();

        {
            let mut history = self.call_history.lock_unpoisoned();
            history.push(prompt.clone());
        }

        let failure = self.fail_with.lock_unpoisoned().clone();
        if let Some(message) = failure {
            return Err(Error::Provider(message));
        }

        let content = self.find_reply(&prompt).unwrap_or_else(|| {
            let default = self.default_reply.lock_unpoisoned();
            default
                .clone()
                .unwrap_or_else(|| format!("Mock reply for prompt: {prompt}"))
        });

        Ok(ProviderReply {
            usage: TokenUsage::new(prompt.len() as u64, content.len() as u64),
            content,
        })
    }
}

/// Mock embedding provider producing deterministic hash-based vectors.
#[derive(Clone)]
pub struct MockEmbeddingProvider {
    /// Vendor name reported by `name()`
    name: String,
    /// Dimension of produced vectors
    dimension: usize,
    /// When set, every embed call fails with this message
    fail_with: Arc<Mutex<Option<String>>>,
    /// When false, probes fail
    probe_healthy: Arc<Mutex<bool>>,
    /// Batch size of each embed call made
    calls: Arc<Mutex<Vec<usize>>>,
}

impl MockEmbeddingProvider {
    /// Creates an embedding mock that reports the given vendor name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: 384,
            fail_with: Arc::new(Mutex::new(None)),
            probe_healthy: Arc::new(Mutex::new(true)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the dimension of produced vectors.
    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Make every embed call fail with the given message.
    #[must_use]
    pub fn failing(self, message: impl Into<String>) -> Self {
        {
            let mut fail = self.fail_with.lock_unpoisoned();
            *fail = Some(message.into());
        }
        self
    }

    /// Make probes fail until toggled back.
    #[must_use]
    pub fn with_unhealthy_probe(self) -> Self {
        {
            let mut healthy = self.probe_healthy.lock_unpoisoned();
            *healthy = false;
        }
        self
    }

    /// Number of embed calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let calls = self.calls.lock_unpoisoned();
        calls.len()
    }

    /// Deterministic pseudo-embedding for one text.
    fn vector_for(&self, text: &str) -> Vec<f32> {
        (0..self.dimension)
            .map(|position| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                position.hash(&mut hasher);
                let bucket = hasher.finish() % 2000;
                (bucket as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<()> {
        let healthy = *self.probe_healthy.lock_unpoisoned();
        if healthy {
            Ok(())
        } else {
            Err(Error::Provider(format!("{} probe unhealthy", self.name)))
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        {
            let mut calls = self.calls.lock_unpoisoned();
            calls.push(texts.len());
        }

        let failure = self.fail_with.lock_unpoisoned().clone();
        if let Some(message) = failure {
            return Err(Error::Provider(message));
        }

        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}
