//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the file named by `STUDY_CONFIG`) relative
//! to the current working directory. Credentials and deployment coordinates
//! come from the environment only, never from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

pub const ENV_CONFIG_PATH: &str = "STUDY_CONFIG";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_ENDPOINT";
pub const ENV_DEPLOYMENT: &str = "DEPLOYMENT_NAME";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_SEARCH_API_KEY: &str = "TAVILY_API_KEY";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment values consulted by [`load_from`].
///
/// Captured once by [`EnvVars::from_env`]; tests build it by hand instead
/// of mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: Option<String>,
    pub search_api_key: Option<String>,
}

impl EnvVars {
    pub fn from_env() -> Self {
        let get = |key: &str| env::var(key).ok();
        Self {
            api_key: get(ENV_API_KEY),
            endpoint: get(ENV_ENDPOINT),
            deployment: get(ENV_DEPLOYMENT),
            api_version: get(ENV_API_VERSION),
            search_api_key: get(ENV_SEARCH_API_KEY),
        }
    }
}

/// Azure OpenAI deployment coordinates.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    /// Chat-completion deployment name.
    pub deployment: String,
    /// Embedding deployment name. Falls back to `deployment` when unset.
    pub embedding_deployment: String,
    pub api_version: String,
    pub timeout_seconds: u64,
}

impl AzureConfig {
    /// True when no separate embedding deployment is configured. Azure chat
    /// deployments reject embedding calls, so flashcard storage and search
    /// will fail unless the chat deployment is itself an embedding model.
    pub fn embeds_with_chat_deployment(&self) -> bool {
        self.embedding_deployment == self.deployment
    }
}

/// Generation parameters for one task handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub flashcards: TaskParams,
    pub summary: TaskParams,
    pub quiz: TaskParams,
}

/// LLM gateway configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"azure"` or `"dummy"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    /// Length of every embedding vector; the flashcard index is built with it.
    pub embedding_dim: usize,
    pub azure: AzureConfig,
    pub tasks: TaskConfig,
}

/// Web search gateway configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// `"tavily"` or `"dummy"`.
    pub provider: String,
    pub api_base_url: String,
    pub max_results: u32,
    pub timeout_seconds: u64,
}

/// Which collaborator the `query` stage consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Flashcards,
    Web,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Reset to the main menu after every completed task.
    pub return_to_menu: bool,
    pub query_source: QuerySource,
    /// Number of flashcards returned by a query.
    pub top_k: usize,
    pub prompts_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub llm: LlmConfig,
    /// From `AZURE_OPENAI_API_KEY`. Present whenever the azure provider is active.
    pub llm_api_key: Option<String>,
    pub search: SearchConfig,
    /// From `TAVILY_API_KEY`. Present whenever the tavily provider is active.
    pub search_api_key: Option<String>,
    pub assistant: AssistantConfig,
    pub comms: CommsConfig,
}

impl Config {
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    supervisor: RawSupervisor,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    assistant: RawAssistant,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawSupervisor {
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawSupervisor {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default = "default_embedding_dim")]
    embedding_dim: usize,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default)]
    embedding_deployment: Option<String>,
    #[serde(default)]
    tasks: RawTasks,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            embedding_dim: default_embedding_dim(),
            timeout_seconds: default_timeout_seconds(),
            embedding_deployment: None,
            tasks: RawTasks::default(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawTasks {
    #[serde(default)]
    flashcards: RawTaskParams,
    #[serde(default)]
    summary: RawTaskParams,
    #[serde(default)]
    quiz: RawTaskParams,
}

#[derive(Deserialize, Default)]
struct RawTaskParams {
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl RawTaskParams {
    fn resolve(&self, fallback: TaskParams) -> TaskParams {
        TaskParams {
            max_output_tokens: self.max_output_tokens.unwrap_or(fallback.max_output_tokens),
            temperature: self.temperature.unwrap_or(fallback.temperature),
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(rename = "default", default = "default_search_provider")]
    provider: String,
    #[serde(default = "default_search_base_url")]
    api_base_url: String,
    #[serde(default = "default_search_max_results")]
    max_results: u32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            api_base_url: default_search_base_url(),
            max_results: default_search_max_results(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawAssistant {
    #[serde(default)]
    return_to_menu: bool,
    #[serde(default = "default_query_source")]
    query_source: QuerySource,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
}

impl Default for RawAssistant {
    fn default() -> Self {
        Self {
            return_to_menu: false,
            query_source: default_query_source(),
            top_k: default_top_k(),
            prompts_dir: default_prompts_dir(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default)]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: false, bind: default_http_bind() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "azure".to_string() }
fn default_embedding_dim() -> usize { 1536 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_search_provider() -> String { "tavily".to_string() }
fn default_search_base_url() -> String { "https://api.tavily.com".to_string() }
fn default_search_max_results() -> u32 { 3 }
fn default_query_source() -> QuerySource { QuerySource::Flashcards }
fn default_top_k() -> usize { 3 }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_true() -> bool { true }

pub const DEFAULT_FLASHCARD_PARAMS: TaskParams = TaskParams { max_output_tokens: 300, temperature: 0.5 };
pub const DEFAULT_SUMMARY_PARAMS: TaskParams = TaskParams { max_output_tokens: 150, temperature: 0.5 };
pub const DEFAULT_QUIZ_PARAMS: TaskParams = TaskParams { max_output_tokens: 300, temperature: 0.7 };

/// Load config from `STUDY_CONFIG` (default `config/default.toml`) and the
/// process environment.
pub fn load() -> Result<Config, AppError> {
    let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(Path::new(&path), &EnvVars::from_env())
}

/// Loader with an explicit path and environment snapshot.
pub fn load_from(path: &Path, vars: &EnvVars) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::ConfigurationMissing(format!("cannot read {}: {e}", path.display()))
    })?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, vars)
}

fn resolve(parsed: RawConfig, vars: &EnvVars) -> Result<Config, AppError> {
    let log_level = parsed.supervisor.log_level;
    logger::parse_level(&log_level).map_err(|e| AppError::Config(e.to_string()))?;

    let mut missing: Vec<&str> = Vec::new();
    let mut require = |value: &Option<String>, name: &'static str| -> String {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                missing.push(name);
                String::new()
            }
        }
    };

    let llm_raw = parsed.llm;
    let (llm_api_key, azure) = match llm_raw.provider.as_str() {
        "azure" => {
            let api_key = require(&vars.api_key, ENV_API_KEY);
            let endpoint = require(&vars.endpoint, ENV_ENDPOINT);
            let deployment = require(&vars.deployment, ENV_DEPLOYMENT);
            let api_version = require(&vars.api_version, ENV_API_VERSION);
            let embedding_deployment = llm_raw
                .embedding_deployment
                .clone()
                .unwrap_or_else(|| deployment.clone());
            (
                Some(api_key),
                AzureConfig {
                    endpoint,
                    deployment,
                    embedding_deployment,
                    api_version,
                    timeout_seconds: llm_raw.timeout_seconds,
                },
            )
        }
        "dummy" => (
            None,
            AzureConfig {
                endpoint: String::new(),
                deployment: String::new(),
                embedding_deployment: String::new(),
                api_version: String::new(),
                timeout_seconds: llm_raw.timeout_seconds,
            },
        ),
        other => return Err(AppError::Config(format!("unknown llm provider: {other}"))),
    };

    let search_raw = parsed.search;
    let search_api_key = match search_raw.provider.as_str() {
        "tavily" => Some(require(&vars.search_api_key, ENV_SEARCH_API_KEY)),
        "dummy" => None,
        other => return Err(AppError::Config(format!("unknown search provider: {other}"))),
    };

    if !missing.is_empty() {
        return Err(AppError::ConfigurationMissing(missing.join(", ")));
    }

    if llm_raw.embedding_dim == 0 {
        return Err(AppError::Config("llm.embedding_dim must be at least 1".into()));
    }
    if parsed.assistant.top_k == 0 {
        return Err(AppError::Config("assistant.top_k must be at least 1".into()));
    }
    if search_raw.max_results == 0 {
        return Err(AppError::Config("search.max_results must be at least 1".into()));
    }

    Ok(Config {
        log_level,
        llm: LlmConfig {
            provider: llm_raw.provider,
            embedding_dim: llm_raw.embedding_dim,
            azure,
            tasks: TaskConfig {
                flashcards: llm_raw.tasks.flashcards.resolve(DEFAULT_FLASHCARD_PARAMS),
                summary: llm_raw.tasks.summary.resolve(DEFAULT_SUMMARY_PARAMS),
                quiz: llm_raw.tasks.quiz.resolve(DEFAULT_QUIZ_PARAMS),
            },
        },
        llm_api_key,
        search: SearchConfig {
            provider: search_raw.provider,
            api_base_url: search_raw.api_base_url,
            max_results: search_raw.max_results,
            timeout_seconds: search_raw.timeout_seconds,
        },
        search_api_key,
        assistant: AssistantConfig {
            return_to_menu: parsed.assistant.return_to_menu,
            query_source: parsed.assistant.query_source,
            top_k: parsed.assistant.top_k,
            prompts_dir: PathBuf::from(parsed.assistant.prompts_dir),
        },
        comms: CommsConfig {
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: parsed.comms.http.bind,
            },
        },
    })
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Offline `Config`: dummy LLM and search, no API keys, no external calls.
    pub fn test_default() -> Self {
        resolve(
            RawConfig {
                llm: RawLlm { provider: "dummy".into(), embedding_dim: 16, ..RawLlm::default() },
                search: RawSearch { provider: "dummy".into(), ..RawSearch::default() },
                ..RawConfig::default()
            },
            &EnvVars::default(),
        )
        .unwrap_or_else(|e| unreachable!("dummy config always resolves: {e}"))
    }
}
