//! Test support: a scriptable in-memory stand-in for the Ollama backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{BackendError, ModelBackend};

/// Routes `tracing` output through the test writer so `RUST_LOG=debug cargo
/// test` shows engine logs per test. Safe to call from every test; only the
/// first call installs the subscriber.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Embedding returned for any text without a configured vector. Every
/// unconfigured text therefore embeds identically, which keeps similarity
/// tests deterministic.
const FALLBACK_EMBEDDING: [f32; 3] = [1.0, 0.0, 0.0];

/// A `ModelBackend` whose embeddings and generations are configured up
/// front. Generation responses are consumed in the order they were scripted;
/// running past the script is an error so a test fails loudly instead of
/// silently reusing output.
pub struct MockBackend {
    embeddings: HashMap<String, Vec<f32>>,
    responses: Mutex<VecDeque<String>>,
    fail_embeddings: bool,
    fail_generation: bool,
    embed_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            embeddings: HashMap::new(),
            responses: Mutex::new(VecDeque::new()),
            fail_embeddings: false,
            fail_generation: false,
            embed_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_embedding(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.to_string(), vector);
        self
    }

    pub fn with_response(self, response: &str) -> Self {
        self.responses.lock().unwrap().push_back(response.to_string());
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    pub fn failing_generation(mut self) -> Self {
        self.fail_generation = true;
        self
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Every prompt passed to `generate`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embeddings {
            return Err(BackendError::Api {
                status: 500,
                body: "mock embedding failure".to_string(),
            });
        }
        Ok(texts
            .iter()
            .map(|text| {
                self.embeddings
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_EMBEDDING.to_vec())
            })
            .collect())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let mut vectors = self.embed_many(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            BackendError::Parse("mock produced no embedding".to_string())
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_generation {
            return Err(BackendError::Api {
                status: 500,
                body: "mock generation failure".to_string(),
            });
        }
        self.responses.lock().unwrap().pop_front().ok_or_else(|| {
            BackendError::Api {
                status: 500,
                body: "mock: no scripted response left".to_string(),
            }
        })
    }
}
