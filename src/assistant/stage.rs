use std::fmt;

use serde::{Deserialize, Serialize};

/// Menu shown at session start and whenever the session returns to the menu.
pub const MENU_TEXT: &str = "Welcome to the GenAI Study Assistant!\n\
Choose an option:\n\
1. Generate Flashcards\n\
2. Summarize Text\n\
3. Generate Quiz\n\
4. Search\n\
Enter your choice (1/2/3/4):";

pub const INVALID_CHOICE: &str = "Invalid choice. Please try again.";

/// Which handler consumes the next line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    MainMenu,
    Flashcard,
    Summarize,
    Quiz,
    Query,
}

impl Stage {
    /// Map a menu selection to its stage. Only the exact strings `"1"`–`"4"`
    /// select anything.
    pub fn from_menu_choice(choice: &str) -> Option<Stage> {
        match choice {
            "1" => Some(Stage::Flashcard),
            "2" => Some(Stage::Summarize),
            "3" => Some(Stage::Quiz),
            "4" => Some(Stage::Query),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::MainMenu => "main_menu",
            Stage::Flashcard => "flashcard",
            Stage::Summarize => "summarize",
            Stage::Quiz => "quiz",
            Stage::Query => "query",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
