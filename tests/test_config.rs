//! The shipped config/default.toml resolves with credentials present and
//! refuses to start without them.

use std::path::Path;

use study_assistant::config::{EnvVars, QuerySource, load_from};
use study_assistant::error::AppError;

fn env() -> EnvVars {
    EnvVars {
        api_key: Some("key".into()),
        endpoint: Some("https://example.openai.azure.com/".into()),
        deployment: Some("gpt-4o".into()),
        api_version: Some("2025-01-01-preview".into()),
        search_api_key: Some("tvly-key".into()),
    }
}

#[test]
fn shipped_defaults_resolve() {
    let cfg = load_from(Path::new("config/default.toml"), &env()).unwrap();
    assert_eq!(cfg.llm.provider, "azure");
    assert_eq!(cfg.search.provider, "tavily");
    assert_eq!(cfg.search.max_results, 3);
    assert_eq!(cfg.assistant.query_source, QuerySource::Flashcards);
    assert!(!cfg.assistant.return_to_menu);
    assert_eq!(cfg.llm.tasks.summary.max_output_tokens, 150);
    assert_eq!(cfg.llm.tasks.quiz.temperature, 0.7);
    assert!(cfg.comms_pty_should_load());
    assert!(!cfg.comms_http_should_load());
}

#[test]
fn shipped_defaults_need_credentials() {
    let err = load_from(Path::new("config/default.toml"), &EnvVars::default()).unwrap_err();
    match err {
        AppError::ConfigurationMissing(msg) => {
            assert!(msg.contains("AZURE_OPENAI_API_KEY"));
            assert!(msg.contains("TAVILY_API_KEY"));
        }
        other => panic!("expected ConfigurationMissing, got {other:?}"),
    }
}
