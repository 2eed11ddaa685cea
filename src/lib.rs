//! Study assistant: flashcards, summaries, quizzes and search over an LLM
//! backend, driven by a per-session conversation stage machine.

pub mod assistant;
pub mod comms;
pub mod config;
pub mod error;
pub mod flashcards;
pub mod llm;
pub mod logger;
pub mod runtime;
pub mod search;
