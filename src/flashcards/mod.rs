//! Flashcards: parsing LLM output into question/answer records, and the
//! per-session embedding store used to search them.

pub mod index;
mod parse;
mod store;

pub use index::{FlatIndex, IndexError, Neighbor};
pub use parse::parse_flashcards;
pub use store::{FlashcardStore, IngestReport};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum FlashcardError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error("index rejected embedding: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRecord {
    pub question: String,
    pub answer: String,
}

impl FlashcardRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }

    /// Text that gets embedded for this card.
    pub fn embedding_text(&self) -> String {
        format!("Q: {}\nA: {}", self.question, self.answer)
    }
}
