//! Conversation stage machine.
//!
//! ```text
//!            "1"        "2"        "3"      "4"
//! main_menu ─────┬──────────┬──────────┬────────┐
//!     ▲ other    ▼          ▼          ▼        ▼
//!     └──── flashcard   summarize     quiz    query
//! ```
//!
//! While at `main_menu` each line is a menu selection. Any other stage
//! treats each line as the payload for its task, turn after turn, until the
//! session is explicitly returned to the menu (or `return_to_menu` is set).
//!
//! [`StudyAssistant`] owns only the collaborators and settings. All mutable
//! state lives in the [`SessionState`] passed to every call, so sessions
//! never observe each other.

mod session;
mod stage;
mod tasks;
mod transcript;

pub use session::{SessionState, TURN_COUNT_SLOT};
pub use stage::{INVALID_CHOICE, MENU_TEXT, Stage};
pub use transcript::{Message, Role, Transcript};

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, QuerySource, TaskConfig};
use crate::error::AppError;
use crate::flashcards::FlashcardRecord;
use crate::llm::{self, LlmProvider};
use crate::search::{self, WebSearchProvider};

use tasks::Task;

/// What a single [`StudyAssistant::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "stage", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Blank input; nothing was recorded.
    Ignored,
    MenuSelected(Stage),
    /// Not a menu option; stage unchanged and the user was re-prompted.
    InvalidChoice,
    Completed(Stage),
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub return_to_menu: bool,
    pub query_source: QuerySource,
    pub top_k: usize,
    pub search_max_results: u32,
    pub embedding_dim: usize,
    pub prompts_dir: PathBuf,
    pub tasks: TaskConfig,
}

impl AssistantSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            return_to_menu: config.assistant.return_to_menu,
            query_source: config.assistant.query_source,
            top_k: config.assistant.top_k,
            search_max_results: config.search.max_results,
            embedding_dim: config.llm.embedding_dim,
            prompts_dir: config.assistant.prompts_dir.clone(),
            tasks: config.llm.tasks.clone(),
        }
    }
}

/// Routes each line of user input to the handler for the session's stage.
///
/// Cheap to clone; holds no per-session data.
#[derive(Debug, Clone)]
pub struct StudyAssistant {
    llm: LlmProvider,
    search: WebSearchProvider,
    settings: AssistantSettings,
}

impl StudyAssistant {
    pub fn new(llm: LlmProvider, search: WebSearchProvider, settings: AssistantSettings) -> Self {
        Self { llm, search, settings }
    }

    /// Build the collaborators named in `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let llm = llm::providers::build(&config.llm, config.llm_api_key.clone())?;
        let search = search::providers::build(&config.search, config.search_api_key.clone())?;
        info!(llm = llm.name(), search = search.name(), "collaborators ready");
        Ok(Self::new(llm, search, AssistantSettings::from_config(config)))
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    pub fn llm_name(&self) -> &'static str {
        self.llm.name()
    }

    pub fn search_name(&self) -> &'static str {
        self.search.name()
    }

    pub fn new_session(&self) -> SessionState {
        SessionState::new(self.settings.embedding_dim)
    }

    /// Process one line of input. The transcript records `input` as sent;
    /// surrounding whitespace only matters for the blank check and menu
    /// matching.
    ///
    /// A collaborator failure is recorded in the transcript as an
    /// `Error: …` message and also returned; the stage is left unchanged.
    pub async fn submit(&self, state: &mut SessionState, input: &str) -> Result<TurnOutcome, AppError> {
        if input.trim().is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let turn = state.bump_counter(TURN_COUNT_SLOT);
        state.push(Message::user(input));
        let stage = state.stage();
        debug!(turn, %stage, input_len = input.len(), "turn received");

        let result = match stage {
            Stage::MainMenu => return Ok(self.select(state, input.trim())),
            Stage::Flashcard => self.run_flashcards(state, input).await,
            Stage::Summarize => self.run_generation(state, Task::Summary, input).await,
            Stage::Quiz => self.run_generation(state, Task::Quiz, input).await,
            Stage::Query => self.run_query(state, input).await,
        };

        match result {
            Ok(()) => {
                info!(turn, %stage, "task completed");
                if self.settings.return_to_menu {
                    state.return_to_menu();
                }
                Ok(TurnOutcome::Completed(stage))
            }
            Err(e) => {
                warn!(turn, %stage, error = %e, "task failed");
                state.push(Message::assistant(format!("Error: {e}")));
                Err(e)
            }
        }
    }

    /// Nearest stored flashcards for `query`, outside the turn flow.
    pub async fn search_flashcards(
        &self,
        state: &SessionState,
        query: &str,
        k: usize,
    ) -> Result<Vec<FlashcardRecord>, AppError> {
        Ok(state.flashcards().search(&self.llm, query, k).await?)
    }

    fn select(&self, state: &mut SessionState, input: &str) -> TurnOutcome {
        match Stage::from_menu_choice(input) {
            Some(stage) => {
                info!(%stage, "menu selection");
                state.set_stage(stage);
                state.push(Message::assistant(self.input_prompt(stage)));
                TurnOutcome::MenuSelected(stage)
            }
            None => {
                debug!("invalid menu choice");
                state.push(Message::assistant(INVALID_CHOICE));
                TurnOutcome::InvalidChoice
            }
        }
    }

    fn input_prompt(&self, stage: Stage) -> &'static str {
        match stage {
            Stage::MainMenu => MENU_TEXT,
            Stage::Flashcard => "Enter the text you'd like to convert into flashcards:",
            Stage::Summarize => "Enter the text you'd like to summarize:",
            Stage::Quiz => "Enter the text you'd like to use for generating a quiz:",
            Stage::Query => match self.settings.query_source {
                QuerySource::Flashcards => "Enter your flashcard search query:",
                QuerySource::Web => "Enter a topic to search for recent research:",
            },
        }
    }

    async fn run_flashcards(&self, state: &mut SessionState, input: &str) -> Result<(), AppError> {
        state.push(Message::assistant("Generating Flashcards..."));
        let request = tasks::build_request(
            Task::Flashcards,
            &self.settings.prompts_dir,
            self.settings.tasks.flashcards,
            input,
        );
        let text = self.llm.complete(&request).await?;
        state.push(Message::assistant(format!("Flashcards:\n{text}")));

        let report = state.flashcards_mut().ingest(&self.llm, &text).await;
        info!(stored = report.stored, skipped = report.skipped, "flashcards ingested");
        let mut summary = format!("Stored {} flashcard(s) in the local index.", report.stored);
        if report.skipped > 0 {
            summary.push_str(&format!(" {} could not be embedded and were skipped.", report.skipped));
        }
        state.push(Message::assistant(summary));
        Ok(())
    }

    async fn run_generation(&self, state: &mut SessionState, task: Task, input: &str) -> Result<(), AppError> {
        let (status, title, params) = match task {
            Task::Summary => ("Summarizing Text...", "Summary", self.settings.tasks.summary),
            Task::Quiz => ("Generating Quiz...", "Quiz", self.settings.tasks.quiz),
            Task::Flashcards => ("Generating Flashcards...", "Flashcards", self.settings.tasks.flashcards),
        };
        state.push(Message::assistant(status));
        let request = tasks::build_request(task, &self.settings.prompts_dir, params, input);
        let text = self.llm.complete(&request).await?;
        state.push(Message::assistant(format!("{title}:\n{text}")));
        Ok(())
    }

    async fn run_query(&self, state: &mut SessionState, input: &str) -> Result<(), AppError> {
        let reply = match self.settings.query_source {
            QuerySource::Flashcards => {
                state.push(Message::assistant("Searching Flashcards..."));
                let records = state.flashcards().search(&self.llm, input, self.settings.top_k).await?;
                debug!(hits = records.len(), "flashcard search done");
                tasks::format_flashcards(&records)
            }
            QuerySource::Web => {
                state.push(Message::assistant("Searching the Web..."));
                let hits = self
                    .search
                    .search(&tasks::research_query(input), self.settings.search_max_results)
                    .await?;
                debug!(hits = hits.len(), "web search done");
                tasks::format_hits(&hits)
            }
        };
        state.push(Message::assistant(reply));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::search::SearchHit;
    use crate::search::providers::dummy::DummySearch;

    const CARDS: &str = "• Q: What is 2+2? A: 4.\n• Q: Capital of France? A: Paris.";

    fn settings() -> AssistantSettings {
        AssistantSettings::from_config(&Config::test_default())
    }

    fn assistant_with(llm: DummyProvider, search: DummySearch) -> StudyAssistant {
        StudyAssistant::new(LlmProvider::Dummy(llm), WebSearchProvider::Dummy(search), settings())
    }

    fn assistant() -> StudyAssistant {
        assistant_with(DummyProvider::new(16), DummySearch::new())
    }

    fn contents(state: &SessionState, from: usize) -> Vec<String> {
        state.transcript().since(from).iter().map(|m| m.content.clone()).collect()
    }

    #[tokio::test]
    async fn invalid_choices_stay_at_menu() {
        let a = assistant();
        let mut s = a.new_session();
        for (i, input) in ["0", "5", "hello", "1 2", "flashcards"].iter().enumerate() {
            let out = a.submit(&mut s, input).await.unwrap();
            assert_eq!(out, TurnOutcome::InvalidChoice);
            assert_eq!(s.stage(), Stage::MainMenu);
            assert_eq!(s.transcript().len(), 1 + 2 * (i + 1));
            assert_eq!(s.transcript().last().unwrap().content, INVALID_CHOICE);
        }
    }

    #[tokio::test]
    async fn each_choice_selects_its_stage() {
        for (choice, stage) in [
            ("1", Stage::Flashcard),
            ("2", Stage::Summarize),
            ("3", Stage::Quiz),
            ("4", Stage::Query),
        ] {
            let a = assistant();
            let mut s = a.new_session();
            let out = a.submit(&mut s, choice).await.unwrap();
            assert_eq!(out, TurnOutcome::MenuSelected(stage));
            assert_eq!(s.stage(), stage);
            assert_eq!(s.transcript().len(), 3);
        }
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let a = assistant();
        let mut s = a.new_session();
        assert_eq!(a.submit(&mut s, "   ").await.unwrap(), TurnOutcome::Ignored);
        assert_eq!(s.transcript().len(), 1);
        assert!(s.slot(TURN_COUNT_SLOT).is_none());
    }

    #[tokio::test]
    async fn summarize_turn_appends_status_then_result() {
        let a = assistant();
        let mut s = a.new_session();
        a.submit(&mut s, "2").await.unwrap();
        let before = s.transcript().len();
        let out = a.submit(&mut s, "Cells divide.").await.unwrap();
        assert_eq!(out, TurnOutcome::Completed(Stage::Summarize));
        let got = contents(&s, before);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0], "Cells divide.");
        assert_eq!(got[1], "Summarizing Text...");
        assert!(got[2].starts_with("Summary:\n[echo] "));
        assert!(got[2].ends_with("Cells divide."));
    }

    #[tokio::test]
    async fn payload_is_recorded_verbatim() {
        let a = assistant();
        let mut s = a.new_session();
        a.submit(&mut s, "  2\t").await.unwrap();
        assert_eq!(s.transcript().since(1)[0].content, "  2\t");
        assert_eq!(s.stage(), Stage::Summarize);

        let pasted = "    fn main() {\n        println!(\"hi\");\n    }\n";
        let before = s.transcript().len();
        a.submit(&mut s, pasted).await.unwrap();
        let got = contents(&s, before);
        assert_eq!(got[0], pasted);
        assert!(got[2].ends_with(pasted));
    }

    #[tokio::test]
    async fn task_stage_treats_digits_as_payload() {
        let a = assistant();
        let mut s = a.new_session();
        a.submit(&mut s, "3").await.unwrap();
        let out = a.submit(&mut s, "1").await.unwrap();
        assert_eq!(out, TurnOutcome::Completed(Stage::Quiz));
        assert_eq!(s.stage(), Stage::Quiz);
        let out = a.submit(&mut s, "2").await.unwrap();
        assert_eq!(out, TurnOutcome::Completed(Stage::Quiz));
    }

    #[tokio::test]
    async fn flashcard_turn_stores_parsed_pairs() {
        let a = assistant_with(DummyProvider::new(16).with_reply(CARDS), DummySearch::new());
        let mut s = a.new_session();
        a.submit(&mut s, "1").await.unwrap();
        let before = s.transcript().len();
        a.submit(&mut s, "arithmetic and geography").await.unwrap();
        let got = contents(&s, before);
        assert_eq!(got.len(), 4);
        assert_eq!(got[1], "Generating Flashcards...");
        assert_eq!(got[2], format!("Flashcards:\n{CARDS}"));
        assert_eq!(got[3], "Stored 2 flashcard(s) in the local index.");
        assert_eq!(s.flashcards().records()[1], FlashcardRecord::new("Capital of France?", "Paris."));
    }

    #[tokio::test]
    async fn query_searches_session_flashcards() {
        let a = assistant_with(DummyProvider::new(16).with_reply(CARDS), DummySearch::new());
        let mut s = a.new_session();
        a.submit(&mut s, "1").await.unwrap();
        a.submit(&mut s, "notes").await.unwrap();
        s.return_to_menu();
        a.submit(&mut s, "4").await.unwrap();
        a.submit(&mut s, "Q: Capital of France?\nA: Paris.").await.unwrap();
        let reply = &s.transcript().last().unwrap().content;
        assert!(reply.starts_with("Relevant Flashcards:\nQ: Capital of France?\nA: Paris."));
    }

    #[tokio::test]
    async fn query_with_empty_store_reports_nothing_found() {
        let a = assistant();
        let mut s = a.new_session();
        a.submit(&mut s, "4").await.unwrap();
        a.submit(&mut s, "anything").await.unwrap();
        assert_eq!(s.transcript().last().unwrap().content, "No matching flashcards found.");
    }

    #[tokio::test]
    async fn web_query_uses_search_gateway() {
        let hit = SearchHit { title: "Paper".into(), url: "https://a.b".into(), content: String::new() };
        let mut a = assistant_with(DummyProvider::new(16), DummySearch::with_hits(vec![hit]));
        a.settings.query_source = QuerySource::Web;
        let mut s = a.new_session();
        a.submit(&mut s, "4").await.unwrap();
        a.submit(&mut s, "CRISPR").await.unwrap();
        let got = contents(&s, s.transcript().len() - 2);
        assert_eq!(got[0], "Searching the Web...");
        assert_eq!(got[1], "Search Results:\n1. Paper\n   https://a.b");
    }

    #[tokio::test]
    async fn web_search_failure_surfaces() {
        let mut a = assistant_with(DummyProvider::new(16), DummySearch::failing());
        a.settings.query_source = QuerySource::Web;
        let mut s = a.new_session();
        a.submit(&mut s, "4").await.unwrap();
        let err = a.submit(&mut s, "CRISPR").await.unwrap_err();
        assert!(matches!(err, AppError::CollaboratorUnavailable(_)));
        assert!(s.transcript().last().unwrap().content.starts_with("Error: "));
    }

    #[tokio::test]
    async fn collaborator_failure_is_recorded_and_returned() {
        let a = assistant_with(DummyProvider::new(16).failing(), DummySearch::new());
        let mut s = a.new_session();
        a.submit(&mut s, "2").await.unwrap();
        let before = s.transcript().len();
        let err = a.submit(&mut s, "text").await.unwrap_err();
        assert!(matches!(err, AppError::CollaboratorUnavailable(_)));
        let got = contents(&s, before);
        assert_eq!(got.len(), 3);
        assert!(got[2].starts_with("Error: "));
        assert_eq!(s.stage(), Stage::Summarize);
    }

    #[tokio::test]
    async fn return_to_menu_setting_resets_after_task() {
        let mut a = assistant();
        a.settings.return_to_menu = true;
        let mut s = a.new_session();
        a.submit(&mut s, "3").await.unwrap();
        a.submit(&mut s, "text").await.unwrap();
        assert_eq!(s.stage(), Stage::MainMenu);
        assert_eq!(s.transcript().last().unwrap().content, MENU_TEXT);
        assert_eq!(a.submit(&mut s, "2").await.unwrap(), TurnOutcome::MenuSelected(Stage::Summarize));
    }

    #[tokio::test]
    async fn resubmitting_is_not_cached() {
        let a = assistant();
        let mut s = a.new_session();
        a.submit(&mut s, "2").await.unwrap();
        a.submit(&mut s, "same").await.unwrap();
        let after_first = s.transcript().len();
        a.submit(&mut s, "same").await.unwrap();
        assert_eq!(s.transcript().len(), after_first + 3);
        assert_eq!(s.slot(TURN_COUNT_SLOT), Some(&serde_json::json!(3)));
    }
}
