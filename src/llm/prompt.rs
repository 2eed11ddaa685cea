//! Layered prompt builder for the task handlers.
//!
//! Prompts are assembled from plain-text template fragments stored under
//! `config/prompts/`. Each layer is appended in order; a missing file falls
//! back to the built-in text supplied with the layer, so the assistant works
//! without a prompts directory.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.
//! Substituted values are never re-scanned, so user text containing `{{…}}`
//! passes through verbatim.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self { prompts_dir: prompts_dir.into(), parts: Vec::new(), vars: HashMap::new() }
    }

    /// Append a layer loaded from `filename`, or `fallback` when the file is
    /// missing or empty.
    pub fn layer(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("prompt: layer '{}' not found, using built-in", path.display());
                fallback.to_string()
            }
        };
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    /// Register a single `{{key}}` → `value` substitution.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers and substitute variables. Unknown placeholders are
    /// left in place.
    pub fn build(self) -> String {
        render(&self.parts.join(SEPARATOR), &self.vars)
    }
}

fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
