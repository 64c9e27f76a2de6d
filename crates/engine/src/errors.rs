use thiserror::Error;

use crate::backend::BackendError;

/// Engine-level error type.
/// Most failure modes are absorbed inside the pipeline (a failed generation
/// falls back to similarity scoring, corrupt store artifacts reinitialize
/// empty); what remains is the short list below.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The embedding model changed dimension mid-lifetime of the index.
    /// Always fatal: mixing dimensions would silently corrupt similarity
    /// rankings, so no caller is allowed to swallow this one.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Model backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DimensionMismatch { expected, got } => {
                EngineError::DimensionMismatch { expected, got }
            }
            other => EngineError::Backend(other),
        }
    }
}
