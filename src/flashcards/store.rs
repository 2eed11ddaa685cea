//! Per-session flashcard store: a [`FlatIndex`] plus the records it indexes.
//!
//! The Nth record belongs to the Nth vector. Both are appended together
//! only after the embedding call succeeds, so a failed embed leaves the
//! store exactly as it was.

use tracing::{debug, warn};

use crate::llm::LlmProvider;

use super::index::FlatIndex;
use super::{FlashcardError, FlashcardRecord, parse_flashcards};

/// Outcome of [`FlashcardStore::ingest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub stored: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct FlashcardStore {
    index: FlatIndex,
    records: Vec<FlashcardRecord>,
}

impl FlashcardStore {
    pub fn new(dim: usize) -> Self {
        Self { index: FlatIndex::new(dim), records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FlashcardRecord] {
        &self.records
    }

    /// Embed `record` and append it. Returns its position.
    pub async fn store(
        &mut self,
        llm: &LlmProvider,
        record: FlashcardRecord,
    ) -> Result<usize, FlashcardError> {
        let embedding = llm.embed(&record.embedding_text()).await?;
        let position = self.index.add(&embedding)?;
        self.records.push(record);
        debug_assert_eq!(self.index.len(), self.records.len());
        Ok(position)
    }

    /// Parse LLM flashcard output and store every well-formed pair. Pairs
    /// whose embedding fails are skipped; the rest are still stored.
    pub async fn ingest(&mut self, llm: &LlmProvider, text: &str) -> IngestReport {
        let mut report = IngestReport::default();
        for record in parse_flashcards(text) {
            let question = record.question.clone();
            match self.store(llm, record).await {
                Ok(position) => {
                    debug!(position, "flashcard stored");
                    report.stored += 1;
                }
                Err(e) => {
                    warn!(%question, error = %e, "flashcard skipped");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// Up to `k` records nearest to `query`, closest first. An empty store
    /// answers `[]` without calling the gateway.
    pub async fn search(
        &self,
        llm: &LlmProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<FlashcardRecord>, FlashcardError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = llm.embed(query).await?;
        let hits = self.index.search(&embedding, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|h| self.records.get(h.position).cloned())
            .collect())
    }
}
