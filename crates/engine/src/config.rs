use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{ensure, Context, Result};

/// Engine configuration loaded from environment variables.
/// Every variable has a default, so a fresh checkout pointed at a local
/// Ollama instance needs no `.env` at all.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the Ollama server hosting both models.
    pub ollama_base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    /// Directory holding the two persisted index artifacts.
    pub vector_db_path: PathBuf,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters carried from the end of one chunk into the next.
    pub chunk_overlap: usize,
    /// How many chunks retrieval pulls in per scored dimension.
    pub retrieval_top_k: usize,
    /// When false, scoring and feedback skip the generative model entirely
    /// and run on embedding similarity plus the rule tables.
    pub enable_llm_scoring: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "embeddinggemma:300m".to_string(),
            generation_model: "llama3.1".to_string(),
            vector_db_path: PathBuf::from("./database/vector_store"),
            chunk_size: 500,
            chunk_overlap: 50,
            retrieval_top_k: 3,
            enable_llm_scoring: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = EngineConfig::default();
        let config = EngineConfig {
            ollama_base_url: env_or("OLLAMA_BASE_URL", &defaults.ollama_base_url),
            embedding_model: env_or("EMBEDDING_MODEL", &defaults.embedding_model),
            generation_model: env_or("GENERATION_MODEL", &defaults.generation_model),
            vector_db_path: PathBuf::from(env_or(
                "VECTOR_DB_PATH",
                "./database/vector_store",
            )),
            chunk_size: env_parsed("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: env_parsed("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            retrieval_top_k: env_parsed("RETRIEVAL_TOP_K", defaults.retrieval_top_k)?,
            enable_llm_scoring: env_parsed("ENABLE_LLM_SCORING", defaults.enable_llm_scoring)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// The chunker and retrieval both assume these hold; checked once at
    /// load so the rest of the crate does not have to.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.chunk_size > 0, "CHUNK_SIZE must be greater than zero");
        ensure!(
            self.chunk_size > self.chunk_overlap,
            "CHUNK_SIZE ({}) must be greater than CHUNK_OVERLAP ({})",
            self.chunk_size,
            self.chunk_overlap
        );
        ensure!(
            self.retrieval_top_k >= 1,
            "RETRIEVAL_TOP_K must be at least 1"
        );
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.retrieval_top_k, 3);
        assert!(config.enable_llm_scoring);
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let config = EngineConfig {
            chunk_size: 50,
            chunk_overlap: 50,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let config = EngineConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let config = EngineConfig {
            retrieval_top_k: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
