//! Prompt construction and result formatting for the task handlers.

use std::path::Path;

use crate::config::TaskParams;
use crate::flashcards::FlashcardRecord;
use crate::llm::prompt::PromptBuilder;
use crate::llm::{ChatMessage, CompletionRequest};
use crate::search::SearchHit;

const FLASHCARDS_SYSTEM: &str = "You are an assistant that creates educational flashcards.";
const FLASHCARDS_USER: &str = "Create flashcards in Q&A format from the following text. \
Write each flashcard on its own line as `Q: <question> A: <answer>`.\n\n{{text}}";

const SUMMARY_SYSTEM: &str = "You are an assistant that summarizes input text.";
const SUMMARY_USER: &str = "Summarize the following text into concise bullet points:\n\n{{text}}";

const QUIZ_SYSTEM: &str = "You are an assistant that generates multiple-choice questions from input text.";
const QUIZ_USER: &str = "Generate multiple-choice questions from the input text. \
Give each question four options and mark the correct one with an asterisk (*):\n\n{{text}}";

const RESEARCH_PREFIX: &str = "Give the latest studies/research papers regarding ";

#[derive(Debug, Clone, Copy)]
pub(crate) enum Task {
    Flashcards,
    Summary,
    Quiz,
}

impl Task {
    fn templates(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Task::Flashcards => ("flashcards", FLASHCARDS_SYSTEM, FLASHCARDS_USER),
            Task::Summary => ("summary", SUMMARY_SYSTEM, SUMMARY_USER),
            Task::Quiz => ("quiz", QUIZ_SYSTEM, QUIZ_USER),
        }
    }
}

/// System + user message pair for `task`, with `text` substituted.
pub(crate) fn build_request(
    task: Task,
    prompts_dir: &Path,
    params: TaskParams,
    text: &str,
) -> CompletionRequest {
    let (name, system, user) = task.templates();
    let system = PromptBuilder::new(prompts_dir)
        .layer(&format!("{name}_system.txt"), system)
        .build();
    let user = PromptBuilder::new(prompts_dir)
        .layer(&format!("{name}_user.txt"), user)
        .var("text", text)
        .build();
    CompletionRequest {
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        max_output_tokens: params.max_output_tokens,
        temperature: params.temperature,
    }
}

pub(crate) fn research_query(query: &str) -> String {
    format!("{RESEARCH_PREFIX}{query}")
}

pub(crate) fn format_flashcards(records: &[FlashcardRecord]) -> String {
    if records.is_empty() {
        return "No matching flashcards found.".to_string();
    }
    let cards: Vec<String> = records
        .iter()
        .map(|r| format!("Q: {}\nA: {}", r.question, r.answer))
        .collect();
    format!("Relevant Flashcards:\n{}", cards.join("\n\n"))
}

pub(crate) fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No search results found.".to_string();
    }
    let lines: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let mut entry = format!("{}. {}\n   {}", i + 1, h.title, h.url);
            if !h.content.trim().is_empty() {
                entry.push_str("\n   ");
                entry.push_str(h.content.trim());
            }
            entry
        })
        .collect();
    format!("Search Results:\n{}", lines.join("\n"))
}
