//! Web Search Gateway.
//!
//! Same enum-dispatch shape as [`crate::llm::LlmProvider`]: one variant per
//! backend, one module per variant under `providers/`.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown search provider: {0}")]
    UnknownProvider(String),
    #[error("search request failed: {0}")]
    Request(String),
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Snippet text; may be empty.
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum WebSearchProvider {
    Dummy(providers::dummy::DummySearch),
    Tavily(providers::tavily::TavilySearch),
}

impl WebSearchProvider {
    /// Return at most `max_results` hits, best first. "No matches" is an
    /// empty list, never an error.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, SearchError> {
        let mut hits = match self {
            WebSearchProvider::Dummy(p) => p.search(query).await?,
            WebSearchProvider::Tavily(p) => p.search(query, max_results).await?,
        };
        hits.truncate(max_results as usize);
        Ok(hits)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WebSearchProvider::Dummy(_) => "dummy",
            WebSearchProvider::Tavily(_) => "tavily",
        }
    }
}
