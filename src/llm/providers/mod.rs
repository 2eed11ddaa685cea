//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod azure_openai;
pub mod dummy;

use tracing::warn;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and the API key.
///
/// `api_key` is sourced from `AZURE_OPENAI_API_KEY` (never TOML); config
/// loading guarantees it is present whenever the azure provider is selected.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::new(config.embedding_dim))),
        "azure" => {
            let key = api_key.ok_or_else(|| {
                ProviderError::Request("azure provider requires an API key".into())
            })?;
            if config.azure.embeds_with_chat_deployment() {
                warn!(
                    deployment = %config.azure.deployment,
                    "no [llm] embedding_deployment set; embedding calls go to the chat deployment"
                );
            }
            let p = azure_openai::AzureOpenAiProvider::new(&config.azure, key)?;
            Ok(LlmProvider::AzureOpenAi(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn builds_dummy() {
        let cfg = Config::test_default();
        let p = build(&cfg.llm, None).unwrap();
        assert_eq!(p.name(), "dummy");
    }

    #[test]
    fn azure_without_key_fails() {
        let mut cfg = Config::test_default().llm;
        cfg.provider = "azure".into();
        assert!(build(&cfg, None).is_err());
    }

    #[test]
    fn unknown_provider_fails() {
        let mut cfg = Config::test_default().llm;
        cfg.provider = "nope".into();
        assert!(matches!(build(&cfg, None), Err(ProviderError::UnknownProvider(_))));
    }
}
