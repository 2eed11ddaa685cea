//! Azure OpenAI provider: chat completions and embeddings against a
//! deployment-scoped endpoint:
//!
//! ```text
//! POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=V
//! POST {endpoint}/openai/deployments/{embedding_deployment}/embeddings?api-version=V
//! ```
//!
//! All wire types are private to this module.
//! The provider is stateless; every call is one round-trip with no retry.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::config::AzureConfig;
use crate::llm::{ChatMessage, CompletionRequest, ProviderError};

/// Adapter for an Azure OpenAI resource.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct AzureOpenAiProvider {
    client: Client,
    chat_url: String,
    embeddings_url: String,
    api_key: String,
}

impl AzureOpenAiProvider {
    pub fn new(config: &AzureConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url: deployment_url(config, &config.deployment, "chat/completions"),
            embeddings_url: deployment_url(config, &config.embedding_deployment, "embeddings"),
            api_key,
        })
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            messages: &request.messages,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        debug!(
            messages = request.messages.len(),
            max_tokens = request.max_output_tokens,
            temperature = request.temperature,
            "sending chat completion request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full chat completion payload");
        }

        let response = self.post(&self.chat_url, &payload).await?;
        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize chat completion response");
            ProviderError::MalformedResponse(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received chat completion response");
        extract_text(parsed)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        debug!(input_len = text.len(), "sending embedding request");
        let response = self.post(&self.embeddings_url, &EmbeddingRequest { input: text }).await?;
        let parsed = response.json::<EmbeddingResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize embedding response");
            ProviderError::MalformedResponse(format!("failed to parse response body: {e}"))
        })?;
        extract_embedding(parsed)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, is_timeout = e.is_timeout(), "Azure OpenAI request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;
        check_status(response).await
    }
}

fn deployment_url(config: &AzureConfig, deployment: &str, operation: &str) -> String {
    format!(
        "{}/openai/deployments/{}/{}?api-version={}",
        config.endpoint.trim_end_matches('/'),
        deployment,
        operation,
        config.api_version,
    )
}

fn extract_text(parsed: ChatCompletionResponse) -> Result<String, ProviderError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse("empty or missing content in response".into()))
}

fn extract_embedding(parsed: EmbeddingResponse) -> Result<Vec<f32>, ProviderError> {
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse("no embedding in response".into()))
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

// Error envelope shared by OpenAI and Azure OpenAI.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = error_message(status, &body);
    error!(%status, %message, "Azure OpenAI returned HTTP error");
    Err(ProviderError::Request(message))
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    }
}
