//! Dummy LLM provider. Echoes the last user message back prefixed with
//! `[echo]`, or returns a canned reply. Embeddings are deterministic
//! character histograms, so identical texts map to identical vectors.
//! Used for tests and offline runs without an API key.

use std::time::Duration;

use crate::llm::{ChatRole, CompletionRequest, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider {
    dim: usize,
    reply: Option<String>,
    fail_completions: bool,
    /// Embedding calls whose input contains this substring fail.
    fail_embeddings_matching: Option<String>,
    /// Simulated round-trip time of every call.
    latency: Option<Duration>,
}

impl DummyProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim, reply: None, fail_completions: false, fail_embeddings_matching: None, latency: None }
    }

    /// Always answer completions with `reply`.
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Fail every completion and embedding call.
    pub fn failing(mut self) -> Self {
        self.fail_completions = true;
        self.fail_embeddings_matching = Some(String::new());
        self
    }

    /// Fail embedding calls whose text contains `pattern`.
    pub fn failing_embeddings_matching(mut self, pattern: impl Into<String>) -> Self {
        self.fail_embeddings_matching = Some(pattern.into());
        self
    }

    /// Sleep for `latency` before answering any call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.delay().await;
        if self.fail_completions {
            return Err(ProviderError::Request("dummy provider is offline".into()));
        }
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(format!("[echo] {last_user}"))
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.delay().await;
        if let Some(pattern) = &self.fail_embeddings_matching {
            if text.contains(pattern.as_str()) {
                return Err(ProviderError::Request("dummy embedding refused".into()));
            }
        }
        Ok(histogram(text, self.dim))
    }
}

fn histogram(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    if dim == 0 {
        return v;
    }
    for c in text.chars().flat_map(char::to_lowercase) {
        let bucket = (c as usize).wrapping_mul(31).wrapping_add(7) % dim;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
