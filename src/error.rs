//! Application-wide error types.

use thiserror::Error;

use crate::flashcards::FlashcardError;
use crate::llm::ProviderError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable or config file is absent. Fatal at startup.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    /// Network, auth or protocol failure talking to an external gateway.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::UnknownProvider(name) => {
                AppError::Config(format!("unknown llm provider: {name}"))
            }
            other => AppError::CollaboratorUnavailable(other.to_string()),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::UnknownProvider(name) => {
                AppError::Config(format!("unknown search provider: {name}"))
            }
            other => AppError::CollaboratorUnavailable(other.to_string()),
        }
    }
}

impl From<FlashcardError> for AppError {
    fn from(e: FlashcardError) -> Self {
        AppError::CollaboratorUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn configuration_missing_names_variable() {
        let e = AppError::ConfigurationMissing("AZURE_ENDPOINT".into());
        assert_eq!(e.to_string(), "configuration missing: AZURE_ENDPOINT");
    }

    #[test]
    fn provider_request_failure_is_collaborator_unavailable() {
        let e: AppError = ProviderError::Request("connection refused".into()).into();
        assert!(matches!(e, AppError::CollaboratorUnavailable(_)));
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let e: AppError = ProviderError::UnknownProvider("nope".into()).into();
        assert!(matches!(e, AppError::Config(_)));
        let e: AppError = SearchError::UnknownProvider("nope".into()).into();
        assert!(matches!(e, AppError::Config(_)));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
