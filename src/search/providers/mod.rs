//! Web search provider implementations and the startup factory.

pub mod dummy;
pub mod tavily;

use crate::config::SearchConfig;
use crate::search::{SearchError, WebSearchProvider};

/// `api_key` comes from `TAVILY_API_KEY`, never TOML.
pub fn build(config: &SearchConfig, api_key: Option<String>) -> Result<WebSearchProvider, SearchError> {
    match config.provider.as_str() {
        "dummy" => Ok(WebSearchProvider::Dummy(dummy::DummySearch::new())),
        "tavily" => {
            let key = api_key
                .ok_or_else(|| SearchError::Request("tavily provider requires an API key".into()))?;
            Ok(WebSearchProvider::Tavily(tavily::TavilySearch::new(config, key)?))
        }
        _ => Err(SearchError::UnknownProvider(config.provider.clone())),
    }
}
