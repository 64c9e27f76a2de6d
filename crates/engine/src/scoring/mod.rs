//! Dimension scoring: generative scoring with a deterministic similarity
//! fallback.
//!
//! Two interchangeable `DimensionScorer` implementations, selected once at
//! startup. The generative scorer never retries a failed call; it routes
//! straight to the similarity scorer it wraps, so the fallback path is the
//! second implementation rather than duplicated logic, and a model outage
//! degrades scoring instead of failing evaluation.

pub mod feedback;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::backend::{BackendError, ModelBackend};
use crate::errors::EngineError;
use crate::store::{dot, normalize};

// ────────────────────────────────────────────────────────────────────────────
// Dimensions
// ────────────────────────────────────────────────────────────────────────────

/// The three scored dimensions. Each carries its own empty-input policy,
/// clamp range, and weight, so both scorer implementations share a single
/// table instead of re-deriving policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Skills,
    Experience,
    Education,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Skills,
        Dimension::Experience,
        Dimension::Education,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Skills => "skills",
            Dimension::Experience => "experience",
            Dimension::Education => "education",
        }
    }

    /// Weight of this dimension in the overall score.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Skills | Dimension::Experience => 0.4,
            Dimension::Education => 0.2,
        }
    }

    /// Score returned without any model call when an input is missing.
    /// Skills and experience score zero when either side is empty;
    /// education is a neutral 50 when the CV shows none and a
    /// benefit-of-the-doubt 70 when the job lists no requirements.
    pub fn short_circuit(self, cv_text: &str, job_text: &str) -> Option<f64> {
        match self {
            Dimension::Skills | Dimension::Experience => {
                if cv_text.trim().is_empty() || job_text.trim().is_empty() {
                    Some(0.0)
                } else {
                    None
                }
            }
            Dimension::Education => {
                if cv_text.trim().is_empty() {
                    Some(50.0)
                } else if job_text.trim().is_empty() {
                    Some(70.0)
                } else {
                    None
                }
            }
        }
    }

    /// Clamp applied to every model- or similarity-derived score. Education
    /// floors at 30 once both inputs exist, which keeps "present but weak"
    /// distinguishable from the no-data neutral 50.
    pub fn clamp(self, score: f64) -> f64 {
        match self {
            Dimension::Skills | Dimension::Experience => score.clamp(0.0, 100.0),
            Dimension::Education => score.clamp(30.0, 100.0),
        }
    }
}

/// Rounded per-dimension scores plus their weighted overall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub overall: f64,
}

/// Weighted overall from already-rounded dimension scores, rounded the same
/// way.
pub fn overall_score(skills: f64, experience: f64, education: f64) -> f64 {
    round1(
        Dimension::Skills.weight() * skills
            + Dimension::Experience.weight() * experience
            + Dimension::Education.weight() * education,
    )
}

/// Rounds to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ────────────────────────────────────────────────────────────────────────────
// Scorers
// ────────────────────────────────────────────────────────────────────────────

/// Scores one dimension of a CV against the job text for that dimension,
/// returning a value inside the dimension's clamp range.
#[async_trait]
pub trait DimensionScorer: Send + Sync {
    async fn score(
        &self,
        dimension: Dimension,
        cv_text: &str,
        job_text: &str,
    ) -> Result<f64, EngineError>;
}

/// Deterministic scorer: cosine similarity of the two texts' embeddings,
/// scaled to 0-100 and clamped per dimension. Needs no generative model at
/// all, which is exactly what makes it a safe fallback.
pub struct SimilarityScorer {
    backend: Arc<dyn ModelBackend>,
}

impl SimilarityScorer {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl DimensionScorer for SimilarityScorer {
    async fn score(
        &self,
        dimension: Dimension,
        cv_text: &str,
        job_text: &str,
    ) -> Result<f64, EngineError> {
        if let Some(fixed) = dimension.short_circuit(cv_text, job_text) {
            return Ok(fixed);
        }

        match cosine_similarity(self.backend.as_ref(), cv_text, job_text).await {
            Ok(similarity) => Ok(dimension.clamp(f64::from(similarity) * 100.0)),
            Err(BackendError::DimensionMismatch { expected, got }) => {
                Err(EngineError::DimensionMismatch { expected, got })
            }
            Err(e) => {
                warn!(
                    "similarity scoring failed for {}: {e}; scoring floor",
                    dimension.as_str()
                );
                Ok(dimension.clamp(0.0))
            }
        }
    }
}

/// Rubric-prompted scorer with the similarity scorer as its literal
/// fallback. One attempt per call: a failed or unparsable generation goes
/// straight to the fallback, never to a retry.
pub struct LlmScorer {
    backend: Arc<dyn ModelBackend>,
    fallback: SimilarityScorer,
}

impl LlmScorer {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            fallback: SimilarityScorer::new(backend.clone()),
            backend,
        }
    }
}

#[async_trait]
impl DimensionScorer for LlmScorer {
    async fn score(
        &self,
        dimension: Dimension,
        cv_text: &str,
        job_text: &str,
    ) -> Result<f64, EngineError> {
        if let Some(fixed) = dimension.short_circuit(cv_text, job_text) {
            return Ok(fixed);
        }

        let prompt = prompts::rubric_prompt(dimension, cv_text, job_text);
        match self.backend.generate(&prompt).await {
            Ok(response) => {
                if let Some(score) = extract_first_integer(&response) {
                    return Ok(dimension.clamp(score as f64));
                }
                warn!(
                    "no numeric score in model response for {}; using similarity fallback",
                    dimension.as_str()
                );
                self.fallback.score(dimension, cv_text, job_text).await
            }
            Err(e) => {
                warn!(
                    "generation failed for {}: {e}; using similarity fallback",
                    dimension.as_str()
                );
                self.fallback.score(dimension, cv_text, job_text).await
            }
        }
    }
}

/// Cosine similarity between two texts, embedded in one batched call.
pub async fn cosine_similarity(
    backend: &dyn ModelBackend,
    first: &str,
    second: &str,
) -> Result<f32, BackendError> {
    let pair = [first.to_string(), second.to_string()];
    let embeddings = backend.embed_many(&pair).await?;

    let mut iter = embeddings.into_iter();
    match (iter.next(), iter.next()) {
        (Some(a), Some(b)) => Ok(dot(&normalize(a), &normalize(b))),
        _ => Err(BackendError::Parse(
            "embedding batch came back short".to_string(),
        )),
    }
}

/// First contiguous run of ASCII digits in `text`, parsed as an integer.
/// "Score: 85/100" parses as 85; prose with no digits parses as nothing.
pub(crate) fn extract_first_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
