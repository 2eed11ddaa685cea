//! Per-session state. Nothing in here is shared between sessions: each
//! session owns its transcript, stage, flashcard store and scratch slots.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::flashcards::FlashcardStore;

use super::stage::{MENU_TEXT, Stage};
use super::transcript::{Message, Transcript};

/// Slot incremented once per non-blank submitted line.
pub const TURN_COUNT_SLOT: &str = "turn_count";

#[derive(Debug, Clone)]
pub struct SessionState {
    transcript: Transcript,
    stage: Stage,
    flashcards: FlashcardStore,
    slots: BTreeMap<String, Value>,
}

impl SessionState {
    /// Fresh session at the main menu, with the menu as its only message.
    pub fn new(embedding_dim: usize) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(Message::assistant(MENU_TEXT));
        Self {
            transcript,
            stage: Stage::MainMenu,
            flashcards: FlashcardStore::new(embedding_dim),
            slots: BTreeMap::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn flashcards(&self) -> &FlashcardStore {
        &self.flashcards
    }

    /// Truncate the transcript to empty. Stage and everything else stay.
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Explicit reset transition: back to the main menu, menu re-shown.
    pub fn return_to_menu(&mut self) {
        self.stage = Stage::MainMenu;
        self.transcript.push(Message::assistant(MENU_TEXT));
    }

    // ── scratch slots ─────────────────────────────────────────────────

    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// Set a slot, returning the previous value.
    pub fn set_slot(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.slots.insert(name.into(), value)
    }

    pub fn remove_slot(&mut self, name: &str) -> Option<Value> {
        self.slots.remove(name)
    }

    pub fn slots(&self) -> &BTreeMap<String, Value> {
        &self.slots
    }

    /// Increment an integer slot (missing or non-integer counts as 0).
    pub fn bump_counter(&mut self, name: &str) -> u64 {
        let next = self.slots.get(name).and_then(Value::as_u64).unwrap_or(0) + 1;
        self.slots.insert(name.to_string(), Value::from(next));
        next
    }

    // ── turn plumbing ─────────────────────────────────────────────────

    pub(crate) fn push(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn flashcards_mut(&mut self) -> &mut FlashcardStore {
        &mut self.flashcards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_at_menu_with_welcome() {
        let s = SessionState::new(4);
        assert_eq!(s.stage(), Stage::MainMenu);
        assert_eq!(s.transcript().len(), 1);
        assert!(s.flashcards().is_empty());
    }

    #[test]
    fn clear_keeps_stage() {
        let mut s = SessionState::new(4);
        s.set_stage(Stage::Quiz);
        s.push(Message::user("x"));
        s.clear_transcript();
        assert_eq!(s.transcript().len(), 0);
        assert_eq!(s.stage(), Stage::Quiz);
    }

    #[test]
    fn return_to_menu_resets_stage_and_reprints_menu() {
        let mut s = SessionState::new(4);
        s.set_stage(Stage::Summarize);
        s.return_to_menu();
        assert_eq!(s.stage(), Stage::MainMenu);
        assert_eq!(s.transcript().len(), 2);
        assert_eq!(s.transcript().last().unwrap().content, MENU_TEXT);
    }

    #[test]
    fn slots_round_trip_and_counters() {
        let mut s = SessionState::new(4);
        assert_eq!(s.set_slot("profile", json!({"name": "Ada"})), None);
        assert_eq!(s.slot("profile").unwrap()["name"], "Ada");
        assert_eq!(s.bump_counter("visits"), 1);
        assert_eq!(s.bump_counter("visits"), 2);
        s.set_slot("visits", json!("garbage"));
        assert_eq!(s.bump_counter("visits"), 1);
        assert!(s.remove_slot("profile").is_some());
        assert!(s.slot("profile").is_none());
    }
}
