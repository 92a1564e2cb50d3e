//! Ollama client and prompt templates backing the generative oracles

mod ollama;
mod prompt;

pub use ollama::OllamaClient;
pub use prompt::{extract_json_object, PromptBuilder};
