//! The evaluation pipeline: retrieval-augmented scoring over labeled CV
//! sections, weighted blending, and feedback assembly.
//!
//! One engine owns one backend, one vector store, and one scorer, wired at
//! construction. Everything downstream of `evaluate` degrades rather than
//! fails: retrieval problems reduce to scoring the raw section text, and
//! model problems reduce to similarity scoring and rule-based feedback. The
//! only error that crosses `evaluate` is an embedding dimension mismatch.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::backend::ModelBackend;
use crate::chunking;
use crate::config::EngineConfig;
use crate::document::segmenter::SectionMap;
use crate::errors::EngineError;
use crate::scoring::feedback;
use crate::scoring::{
    overall_score, round1, Dimension, DimensionScorer, LlmScorer, ScoreBreakdown, SimilarityScorer,
};
use crate::store::{SearchHit, VectorStore};

/// Final result of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub overall_score: f64,
    pub skills_score: f64,
    pub experience_score: f64,
    pub education_score: f64,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct Engine {
    backend: Arc<dyn ModelBackend>,
    store: VectorStore,
    scorer: Arc<dyn DimensionScorer>,
    config: EngineConfig,
}

impl Engine {
    /// Builds an engine from configuration: the scorer is picked by
    /// `enable_llm_scoring` and the store opens under `vector_db_path`.
    pub async fn new(
        config: EngineConfig,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self, EngineError> {
        let store = VectorStore::open(config.vector_db_path.clone(), backend.clone()).await?;
        let scorer: Arc<dyn DimensionScorer> = if config.enable_llm_scoring {
            Arc::new(LlmScorer::new(backend.clone()))
        } else {
            Arc::new(SimilarityScorer::new(backend.clone()))
        };
        Ok(Self {
            backend,
            store,
            scorer,
            config,
        })
    }

    /// Evaluates labeled CV sections against a job posting.
    ///
    /// Skills and education score against the requirements text; experience
    /// scores against the combined description-plus-requirements context.
    /// Each dimension sees its raw section text plus whatever related
    /// chunks retrieval finds for the job text.
    pub async fn evaluate(
        &self,
        sections: &SectionMap,
        job_description: &str,
        job_requirements: &str,
    ) -> Result<EvaluationResult, EngineError> {
        let job_context =
            format!("Job Description: {job_description}\n\nRequirements: {job_requirements}");

        let skills = round1(
            self.score_dimension(Dimension::Skills, sections, job_requirements)
                .await?,
        );
        let experience = round1(
            self.score_dimension(Dimension::Experience, sections, &job_context)
                .await?,
        );
        let education = round1(
            self.score_dimension(Dimension::Education, sections, job_requirements)
                .await?,
        );
        let overall = overall_score(skills, experience, education);
        let scores = ScoreBreakdown {
            skills,
            experience,
            education,
            overall,
        };

        let feedback = if self.config.enable_llm_scoring {
            feedback::generate_feedback(
                self.backend.as_ref(),
                sections,
                job_description,
                job_requirements,
                scores,
            )
            .await
        } else {
            feedback::deterministic_feedback(sections, scores)
        };

        info!(
            "evaluation complete: overall {overall} (skills {skills}, experience {experience}, education {education})"
        );

        Ok(EvaluationResult {
            overall_score: overall,
            skills_score: skills,
            experience_score: experience,
            education_score: education,
            feedback: feedback.summary,
            strengths: feedback.strengths,
            weaknesses: feedback.weaknesses,
            recommendations: feedback.recommendations,
        })
    }

    /// Chunks every non-empty section of a CV and adds the pieces to the
    /// vector store, so later evaluations can retrieve them. Fields of
    /// `base_metadata` are merged in under each chunk's own tags and never
    /// override them. Returns the number of chunks indexed.
    pub async fn index_cv(
        &self,
        sections: &SectionMap,
        base_metadata: Value,
    ) -> Result<usize, EngineError> {
        let chunks =
            chunking::split_sections(sections, self.config.chunk_size, self.config.chunk_overlap);
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut texts = Vec::with_capacity(chunks.len());
        let mut metadata = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let mut tags = chunk.metadata();
            if let (Value::Object(map), Value::Object(base)) = (&mut tags, &base_metadata) {
                for (key, value) in base {
                    map.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            texts.push(chunk.text);
            metadata.push(tags);
        }

        let count = texts.len();
        self.store.add(&texts, metadata).await?;
        info!("indexed CV into {count} chunks");
        Ok(count)
    }

    /// Adds pre-chunked documents directly.
    pub async fn add_documents(
        &self,
        texts: &[String],
        metadata: Vec<Value>,
    ) -> Result<(), EngineError> {
        self.store.add(texts, metadata).await
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, EngineError> {
        self.store.search(query, k).await
    }

    pub async fn search_filtered(
        &self,
        query: &str,
        k: usize,
        section: &str,
    ) -> Result<Vec<SearchHit>, EngineError> {
        self.store.search_filtered(query, k, section).await
    }

    pub async fn indexed_documents(&self) -> usize {
        self.store.len().await
    }

    async fn score_dimension(
        &self,
        dimension: Dimension,
        sections: &SectionMap,
        job_text: &str,
    ) -> Result<f64, EngineError> {
        let raw = section_text(sections, dimension);
        let augmented = self.augment(dimension, raw, job_text).await?;
        self.scorer.score(dimension, &augmented, job_text).await
    }

    /// Appends retrieved chunk texts to the raw section text. An empty
    /// section is never augmented (the empty-input policies key on it), and
    /// retrieval problems short of a dimension mismatch reduce to the raw
    /// text with a warning; evaluation never fails for lack of context.
    async fn augment(
        &self,
        dimension: Dimension,
        raw: &str,
        job_text: &str,
    ) -> Result<String, EngineError> {
        if raw.trim().is_empty() || job_text.trim().is_empty() {
            return Ok(raw.to_string());
        }
        if self.store.is_empty().await {
            return Ok(raw.to_string());
        }

        let found = self
            .store
            .search_filtered(job_text, self.config.retrieval_top_k, dimension.as_str())
            .await;

        match found {
            Ok(hits) if hits.is_empty() => Ok(raw.to_string()),
            Ok(hits) => {
                let retrieved: Vec<String> = hits.into_iter().map(|hit| hit.text).collect();
                Ok(format!("{raw}\n\n{}", retrieved.join("\n\n")))
            }
            Err(EngineError::DimensionMismatch { expected, got }) => {
                Err(EngineError::DimensionMismatch { expected, got })
            }
            Err(e) => {
                warn!(
                    "retrieval failed for {}: {e}; scoring raw section text",
                    dimension.as_str()
                );
                Ok(raw.to_string())
            }
        }
    }
}

fn section_text(sections: &SectionMap, dimension: Dimension) -> &str {
    match dimension {
        Dimension::Skills => &sections.skills,
        Dimension::Experience => &sections.experience,
        Dimension::Education => &sections.education,
    }
}
