//! Persistent vector index over normalized embeddings.
//!
//! The index is a parallel pair: the Nth vector belongs to the Nth document
//! record, and position is the only join key. Both halves live inside one
//! locked structure so the pairing is enforced by ownership rather than
//! convention, and both artifacts are rewritten as a unit on every add.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::ModelBackend;
use crate::errors::EngineError;

const INDEX_FILE: &str = "index.json";
const DOCUMENTS_FILE: &str = "documents.json";

/// One stored document: chunk text plus caller-provided metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

/// A search result: the document plus its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub metadata: Value,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    dimension: Option<usize>,
    saved_at: DateTime<Utc>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    vectors: Vec<Vec<f32>>,
    documents: Vec<DocumentRecord>,
    /// Fixed by the first added vector (or the loaded artifact) and checked
    /// against every later one.
    dimension: Option<usize>,
}

/// Single-writer, multi-reader store. Searches take the read lock; adds
/// take the write lock for the append and the artifact rewrite.
pub struct VectorStore {
    dir: PathBuf,
    backend: Arc<dyn ModelBackend>,
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    /// Opens the store under `dir`, loading both artifacts when present.
    /// A missing, unreadable, or mutually inconsistent pair is treated as
    /// no store at all: the index starts empty and a warning is logged.
    pub async fn open(
        dir: impl Into<PathBuf>,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self, EngineError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let inner = match load_artifacts(&dir).await {
            Ok(Some(loaded)) => {
                info!(
                    "vector store loaded: {} documents, dimension {:?}",
                    loaded.documents.len(),
                    loaded.dimension
                );
                loaded
            }
            Ok(None) => StoreInner::default(),
            Err(reason) => {
                warn!("vector store artifacts unusable ({reason}); reinitializing empty");
                StoreInner::default()
            }
        };

        Ok(Self {
            dir,
            backend,
            inner: RwLock::new(inner),
        })
    }

    /// Embeds `texts` in one batch and appends them with their metadata.
    /// `metadata` is padded with empty objects when shorter than `texts`.
    /// On a dimension mismatch nothing is appended and nothing is written.
    pub async fn add(&self, texts: &[String], metadata: Vec<Value>) -> Result<(), EngineError> {
        if texts.is_empty() {
            return Ok(());
        }

        // embed outside the lock; the critical section is append + persist
        let embeddings = self.backend.embed_many(texts).await?;
        let vectors: Vec<Vec<f32>> = embeddings.into_iter().map(normalize).collect();

        let mut inner = self.inner.write().await;
        let dimension = match inner.dimension.or_else(|| vectors.first().map(Vec::len)) {
            Some(dimension) => dimension,
            None => return Ok(()),
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EngineError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }
        inner.dimension = Some(dimension);

        for (i, vector) in vectors.into_iter().enumerate() {
            inner.vectors.push(vector);
            inner.documents.push(DocumentRecord {
                text: texts[i].clone(),
                metadata: metadata
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            });
        }

        self.persist(&inner).await?;
        debug!("vector store now holds {} documents", inner.documents.len());
        Ok(())
    }

    /// Returns up to `k` nearest documents by cosine similarity, best
    /// first; equal scores keep insertion order. An empty index returns an
    /// empty vec without touching the embedding backend.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, EngineError> {
        {
            let inner = self.inner.read().await;
            if inner.vectors.is_empty() || k == 0 {
                return Ok(Vec::new());
            }
        }

        let query_vector = normalize(self.backend.embed_one(query).await?);

        let inner = self.inner.read().await;
        if let Some(dimension) = inner.dimension {
            if query_vector.len() != dimension {
                return Err(EngineError::DimensionMismatch {
                    expected: dimension,
                    got: query_vector.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = inner
            .vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, dot(&query_vector, vector)))
            .collect();
        // stable sort: ties resolve to the earlier insertion
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchHit {
                text: inner.documents[i].text.clone(),
                metadata: inner.documents[i].metadata.clone(),
                score,
            })
            .collect())
    }

    /// `search` restricted to hits whose `metadata.section` equals
    /// `section`. The filter runs over the top-k of the unfiltered search,
    /// so fewer than `k` hits can come back even when deeper matches exist;
    /// retrieval callers treat a thin result as reduced context.
    pub async fn search_filtered(
        &self,
        query: &str,
        k: usize,
        section: &str,
    ) -> Result<Vec<SearchHit>, EngineError> {
        let hits = self.search(query, k).await?;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.metadata.get("section").and_then(Value::as_str) == Some(section))
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Rewrites both artifacts via temp-file-then-rename so a crash never
    /// leaves a half-written file for the next load to trip on.
    async fn persist(&self, inner: &StoreInner) -> Result<(), EngineError> {
        let artifact = IndexArtifact {
            dimension: inner.dimension,
            saved_at: Utc::now(),
            vectors: inner.vectors.clone(),
        };
        let index_bytes = serde_json::to_vec(&artifact)
            .map_err(|e| EngineError::Store(format!("failed to encode {INDEX_FILE}: {e}")))?;
        let document_bytes = serde_json::to_vec(&inner.documents)
            .map_err(|e| EngineError::Store(format!("failed to encode {DOCUMENTS_FILE}: {e}")))?;

        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            write_atomic(&dir, INDEX_FILE, &index_bytes)?;
            write_atomic(&dir, DOCUMENTS_FILE, &document_bytes)
        })
        .await
        .map_err(|e| EngineError::Store(format!("persist task failed: {e}")))?
    }
}

async fn load_artifacts(dir: &Path) -> Result<Option<StoreInner>, String> {
    let index_bytes = read_optional(&dir.join(INDEX_FILE)).await?;
    let document_bytes = read_optional(&dir.join(DOCUMENTS_FILE)).await?;

    let (index_bytes, document_bytes) = match (index_bytes, document_bytes) {
        (Some(index), Some(documents)) => (index, documents),
        (None, None) => return Ok(None),
        _ => return Err("one of the two artifacts is missing".to_string()),
    };

    let artifact: IndexArtifact =
        serde_json::from_slice(&index_bytes).map_err(|e| format!("{INDEX_FILE}: {e}"))?;
    let documents: Vec<DocumentRecord> =
        serde_json::from_slice(&document_bytes).map_err(|e| format!("{DOCUMENTS_FILE}: {e}"))?;

    if artifact.vectors.len() != documents.len() {
        return Err(format!(
            "length mismatch: {} vectors vs {} documents",
            artifact.vectors.len(),
            documents.len()
        ));
    }
    if let Some(dimension) = artifact.dimension {
        if let Some(bad) = artifact.vectors.iter().find(|v| v.len() != dimension) {
            return Err(format!(
                "vector of dimension {} in an index of dimension {dimension}",
                bad.len()
            ));
        }
    }

    Ok(Some(StoreInner {
        vectors: artifact.vectors,
        documents,
        dimension: artifact.dimension,
    }))
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("{}: {e}", path.display())),
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
    use std::io::Write;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(dir.join(name))
        .map_err(|e| EngineError::Store(format!("failed to replace {name}: {e}")))?;
    Ok(())
}

/// L2-normalizes in place; zero vectors pass through unchanged so they
/// score 0 against everything instead of NaN.
pub(crate) fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
