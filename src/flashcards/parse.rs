//! Flashcard extraction from free-form LLM output.
//!
//! A question starts on a line whose content (after bullets and list
//! numbering) begins with `Q:`. Its answer follows an `A:` marker, either
//! later on the same line or at the start of a following line before the
//! next question. Pairs without an answer are skipped.

use tracing::debug;

use super::FlashcardRecord;

const QUESTION_MARKER: &str = "Q:";
const ANSWER_MARKER: &str = "A:";

pub fn parse_flashcards(text: &str) -> Vec<FlashcardRecord> {
    let lines: Vec<&str> = text.lines().map(strip_list_prefix).collect();
    let mut records = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(rest) = line.strip_prefix(QUESTION_MARKER) else {
            continue;
        };

        let pair = match find_answer_marker(rest) {
            Some(at) => Some((&rest[..at], &rest[at + ANSWER_MARKER.len()..])),
            None => lines[i + 1..]
                .iter()
                .take_while(|l| !l.starts_with(QUESTION_MARKER))
                .find_map(|l| l.strip_prefix(ANSWER_MARKER))
                .map(|answer| (rest, answer)),
        };

        match pair {
            Some((q, a)) if !q.trim().is_empty() && !a.trim().is_empty() => {
                records.push(FlashcardRecord::new(q.trim(), a.trim()));
            }
            _ => debug!(line = i + 1, "flashcard without answer skipped"),
        }
    }

    records
}

/// Strip leading whitespace, bullet glyphs and `1.` / `2)` numbering.
fn strip_list_prefix(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '•' | '-' | '*' | '·'));
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

/// Byte offset of an `A:` that starts the text or follows a non-alphanumeric
/// character, so `?A:` and `(A:` count but `DNA:` does not.
fn find_answer_marker(s: &str) -> Option<usize> {
    s.match_indices(ANSWER_MARKER)
        .map(|(i, _)| i)
        .find(|&i| s[..i].chars().next_back().is_none_or(|c| !c.is_alphanumeric()))
}
