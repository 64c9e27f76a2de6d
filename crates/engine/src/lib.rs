//! Retrieval-augmented CV evaluation against job postings.
//!
//! The pipeline: extract text from an uploaded document, segment it into
//! labeled sections, chunk and index those sections in a persistent vector
//! store, then score the CV against a job posting dimension by dimension.
//! Scoring prefers an LLM rubric and degrades to embedding similarity when
//! the model misbehaves; feedback generation degrades the same way, so an
//! evaluation always produces a result. All model traffic goes through
//! [`backend::ModelBackend`], implemented for a local Ollama server by
//! [`backend::OllamaClient`].

pub mod backend;
pub mod chunking;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod scoring;
pub mod store;

#[cfg(test)]
pub(crate) mod test_util;

pub use backend::{BackendError, ModelBackend, OllamaClient};
pub use config::EngineConfig;
pub use document::extract::extract_text;
pub use document::identity::{extract_candidate_info, CandidateIdentity};
pub use document::segmenter::{segment, SectionLabel, SectionMap};
pub use engine::{Engine, EvaluationResult};
pub use errors::EngineError;
pub use scoring::{Dimension, ScoreBreakdown};
pub use store::{DocumentRecord, SearchHit, VectorStore};
