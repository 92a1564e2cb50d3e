//! Configuration for the document pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "ROBODOC_CONFIG";
/// Environment variable overriding the Ollama base URL
pub const OLLAMA_URL_ENV: &str = "ROBODOC_OLLAMA_URL";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Tariff knowledge base configuration
    pub knowledge: KnowledgeConfig,
    /// Review thresholds
    pub review: ReviewConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
    /// Storage configuration
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config '{}': {}", path.display(), e)))
    }

    /// Load configuration from `ROBODOC_CONFIG` if set, else defaults,
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(OLLAMA_URL_ENV) {
            if !url.trim().is_empty() {
                config.llm.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.knowledge.top_k == 0 {
            return Err(Error::Config("knowledge.top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.review.confidence_threshold) {
            return Err(Error::Config(format!(
                "review.confidence_threshold must be within [0, 1], got {}",
                self.review.confidence_threshold
            )));
        }
        if self.review.amount_tolerance < 0.0 {
            return Err(Error::Config("review.amount_tolerance must not be negative".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Model used for field extraction and classification reasoning
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of transport-level retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.1:8b".to_string(),
            temperature: 0.0, // extraction wants determinism
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions of `llm.embed_model`
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
        }
    }
}

/// Tariff knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Plain-text tariff schedule used to build the index
    pub tariff_source: PathBuf,
    /// Directory holding the persisted index artifact
    pub index_dir: PathBuf,
    /// Number of chunks retrieved per classification
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            tariff_source: base.join("knowledge").join("tariff_schedule.txt"),
            index_dir: base.join("knowledge").join("index"),
            top_k: 3,
        }
    }
}

/// Review thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Classifications below this confidence go to human review
    pub confidence_threshold: f64,
    /// Absolute tolerance for the invoice math audit
    pub amount_tolerance: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            amount_tolerance: 0.01,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Upper bound for a single oracle call in seconds
    pub oracle_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_secs: 120,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,
    /// Directory where uploads are staged while processing
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            database_path: base.join("robodoc.db"),
            upload_dir: base.join("uploads"),
        }
    }
}

/// Base data directory, absolute
fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
        .join("robodoc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.review.confidence_threshold, 0.95);
        assert_eq!(config.knowledge.top_k, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [knowledge]
            top_k = 5

            [review]
            confidence_threshold = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.knowledge.top_k, 5);
        assert_eq!(config.review.confidence_threshold, 0.9);
        assert_eq!(config.review.amount_tolerance, 0.01);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robodoc.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mut config = AppConfig::default();
        config.review.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
