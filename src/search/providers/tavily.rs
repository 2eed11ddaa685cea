//! Tavily search provider (`POST {api_base_url}/search`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::SearchConfig;
use crate::search::{SearchError, SearchHit};

#[derive(Debug, Clone)]
pub struct TavilySearch {
    client: Client,
    search_url: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SearchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            search_url: format!("{}/search", config.api_base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>, SearchError> {
        let body = SearchRequest { query, max_results, search_depth: "basic", include_answer: false };
        debug!(query_len = query.len(), max_results, "sending web search request");

        let response = self
            .client
            .post(&self.search_url)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.search_url, error = %e, "web search request failed (transport)");
                SearchError::Request(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Request(format!("failed to read response body: {e}")))?;
        if !status.is_success() {
            let message = error_detail(&text).unwrap_or(text);
            error!(%status, %message, "web search returned HTTP error");
            return Err(SearchError::Request(format!("HTTP {status}: {message}")));
        }

        let hits = parse_hits(&text)?;
        debug!(hits = hits.len(), "received web search response");
        Ok(hits)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_answer: bool,
}

/// A missing `results` key is the same as an empty list.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

fn parse_hits(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Request(format!("failed to parse response body: {e}")))?;
    Ok(parsed
        .results
        .into_iter()
        .filter_map(|r| {
            Some(SearchHit {
                title: r.title?,
                url: r.url?,
                content: r.content.unwrap_or_default(),
            })
        })
        .collect())
}

fn error_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = json.get("detail").or_else(|| json.get("error"))?;
    match detail {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj.get("error").and_then(|v| v.as_str()).map(String::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_results_key_is_empty() {
        assert!(parse_hits(r#"{"query":"x"}"#).unwrap().is_empty());
        assert!(parse_hits(r#"{"results":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn hits_without_url_are_dropped() {
        let hits = parse_hits(
            r#"{"results":[
                {"title":"Paper","url":"https://a.b/1","content":"abstract"},
                {"title":"No link"},
                {"title":"Bare","url":"https://a.b/2"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "abstract");
        assert_eq!(hits[1].content, "");
    }

    #[test]
    fn garbage_body_errors() {
        assert!(parse_hits("<html>").is_err());
    }

    #[test]
    fn error_detail_variants() {
        assert_eq!(error_detail(r#"{"detail":"bad key"}"#).as_deref(), Some("bad key"));
        assert_eq!(error_detail(r#"{"detail":{"error":"quota"}}"#).as_deref(), Some("quota"));
        assert_eq!(error_detail("nope"), None);
    }

    #[test]
    fn url_joins_base() {
        let cfg = SearchConfig {
            provider: "tavily".into(),
            api_base_url: "https://api.tavily.com/".into(),
            max_results: 3,
            timeout_seconds: 5,
        };
        let p = TavilySearch::new(&cfg, "k".into()).unwrap();
        assert_eq!(p.search_url, "https://api.tavily.com/search");
    }

    #[test]
    fn request_shape() {
        let body = SearchRequest { query: "q", max_results: 3, search_depth: "basic", include_answer: false };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_results"], 3);
        assert_eq!(json["include_answer"], false);
    }
}
