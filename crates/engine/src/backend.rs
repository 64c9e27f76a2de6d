//! Model backend: the single point of entry for all Ollama calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to Ollama directly. Scoring,
//! feedback, and the vector store all go through the `ModelBackend` trait,
//! which is what lets tests substitute a deterministic backend and lets the
//! scorer fall back cleanly when generation misbehaves.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;

const REQUEST_TIMEOUT_SECS: u64 = 120;
/// Low temperature for both call shapes: scoring prompts ask for a bare
/// number and feedback prompts for strict JSON.
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Embedding and generation against one model host.
///
/// Contract: `embed_many` returns exactly one vector per input text, in
/// input order, and every vector from one backend instance has the same
/// dimension.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama-backed implementation of `ModelBackend`.
///
/// The embedding dimension is not configured anywhere; it is pinned lazily
/// from the first embedding the server returns and every later batch is
/// checked against it.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
    dimension: OnceLock<usize>,
}

impl OllamaClient {
    pub fn new(base_url: &str, embedding_model: &str, generation_model: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.to_string(),
            generation_model: generation_model.to_string(),
            dimension: OnceLock::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            &config.ollama_base_url,
            &config.embedding_model,
            &config.generation_model,
        )
    }

    /// Dimension pinned from the first successful embedding, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| BackendError::Parse(format!("{path} response: {e}")))
    }

    fn check_dimension(&self, got: usize) -> Result<(), BackendError> {
        let expected = *self.dimension.get_or_init(|| got);
        if expected != got {
            return Err(BackendError::DimensionMismatch { expected, got });
        }
        Ok(())
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbedResponse = self.post_json("/api/embed", &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(BackendError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        for embedding in &response.embeddings {
            self.check_dimension(embedding.len())?;
        }

        debug!(
            "embedded {} texts (dimension {})",
            texts.len(),
            response.embeddings[0].len()
        );
        Ok(response.embeddings)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let input = [text.to_string()];
        let mut embeddings = self.embed_many(&input).await?;
        embeddings
            .pop()
            .ok_or_else(|| BackendError::Parse("embedding batch came back empty".to_string()))
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
            },
        };
        let response: GenerateResponse = self.post_json("/api/generate", &request).await?;

        debug!("generation returned {} chars", response.response.len());
        Ok(response.response)
    }
}
