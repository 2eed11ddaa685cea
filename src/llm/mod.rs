//! LLM Completion Gateway.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities; clone them freely.
//! Two operations are exposed: chat completion over a role-tagged message
//! list, and text embedding into a fixed-length float vector.

pub mod prompt;
pub mod providers;

use serde::Serialize;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// One completion call: ordered messages plus sampling parameters.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends. A new backend is a module in
/// `providers/` plus a variant here.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    AzureOpenAi(providers::azure_openai::AzureOpenAiProvider),
}

impl LlmProvider {
    /// Run one chat completion and return the generated text.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(request).await,
            LlmProvider::AzureOpenAi(p) => p.complete(request).await,
        }
    }

    /// Embed `text` into a vector. Every call to the same provider returns
    /// vectors of the same length.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.embed(text).await,
            LlmProvider::AzureOpenAi(p) => p.embed(text).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::AzureOpenAi(_) => "azure",
        }
    }
}
