//! Dummy search provider. Returns a fixed hit list for every query.

use crate::search::{SearchError, SearchHit};

#[derive(Debug, Clone, Default)]
pub struct DummySearch {
    hits: Vec<SearchHit>,
    fail: bool,
}

impl DummySearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, fail: false }
    }

    pub fn failing() -> Self {
        Self { hits: Vec::new(), fail: true }
    }

    pub async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
        if self.fail {
            return Err(SearchError::Request("dummy search is offline".into()));
        }
        Ok(self.hits.clone())
    }
}
