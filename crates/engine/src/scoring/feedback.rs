//! Feedback synthesis with defensive parsing of model output.
//!
//! The model is asked for strict JSON but routinely wraps it in prose or
//! code fences, so extraction takes the first balanced brace-delimited
//! substring instead of trusting the whole response. Two failure modes stay
//! deliberately distinct: a response that cannot be parsed keeps empty
//! lists under a fixed summary, while a call that fails outright falls back
//! to the deterministic rule tables with a summary that says so.

use serde::Deserialize;
use tracing::warn;

use crate::backend::ModelBackend;
use crate::document::segmenter::{SectionLabel, SectionMap};
use crate::scoring::{prompts, ScoreBreakdown};

/// Summary used when the model responded but its feedback was unusable.
pub const UNPARSABLE_FEEDBACK_SUMMARY: &str = "Unable to generate detailed feedback.";

/// Appended to the rule-based summary when feedback degraded because the
/// model call itself failed.
pub const DEGRADED_FEEDBACK_NOTE: &str = "(feedback generated due to model error)";

/// Structured feedback for one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

/// Wire shape the model is asked for. Every key is defaulted so a partial
/// object still parses; `soft_skills_assessment` is merged into strengths.
#[derive(Debug, Deserialize)]
struct FeedbackJson {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    soft_skills_assessment: Vec<String>,
    #[serde(default)]
    summary: String,
}

/// Asks the model for structured feedback. An unusable response yields
/// empty lists under the fixed summary; a failed call yields the rule-based
/// feedback marked as degraded. Never an error.
pub async fn generate_feedback(
    backend: &dyn ModelBackend,
    sections: &SectionMap,
    job_description: &str,
    job_requirements: &str,
    scores: ScoreBreakdown,
) -> Feedback {
    let cv_text = combined_cv_text(sections);
    let prompt = prompts::feedback_prompt(&cv_text, job_description, job_requirements);

    match backend.generate(&prompt).await {
        Ok(response) => match parse_feedback(&response) {
            Some(parsed) => parsed,
            None => {
                warn!("feedback response held no usable JSON; returning empty feedback");
                Feedback {
                    summary: UNPARSABLE_FEEDBACK_SUMMARY.to_string(),
                    ..Feedback::default()
                }
            }
        },
        Err(e) => {
            warn!("feedback generation failed: {e}; using rule-based feedback");
            degraded_feedback(sections, scores)
        }
    }
}

/// Deterministic feedback: fixed sentences keyed on score thresholds, plus
/// length nudges for thin sections, under a bracket summary. Used directly
/// when generative scoring is disabled and as the call-failure fallback.
pub fn deterministic_feedback(sections: &SectionMap, scores: ScoreBreakdown) -> Feedback {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    if scores.skills >= 70.0 {
        strengths.push("Strong technical skills alignment with job requirements".to_string());
    } else if scores.skills < 50.0 {
        weaknesses.push("Limited technical skills match with job requirements".to_string());
        recommendations.push(
            "Consider highlighting transferable skills or gaining additional technical competencies"
                .to_string(),
        );
    }

    if scores.experience >= 70.0 {
        strengths.push("Relevant professional experience for the role".to_string());
    } else if scores.experience < 50.0 {
        weaknesses.push("Limited relevant professional experience".to_string());
        recommendations.push(
            "Emphasize transferable experience and achievements from related roles".to_string(),
        );
    }

    if scores.education >= 70.0 {
        strengths.push("Educational background aligns well with job requirements".to_string());
    } else if scores.education < 50.0 {
        weaknesses.push("Educational qualifications may not fully match job requirements".to_string());
        recommendations.push("Consider pursuing additional certifications or training".to_string());
    }

    if sections.skills.chars().count() < 100 {
        recommendations
            .push("Expand the skills section with more specific technical competencies".to_string());
    }
    if sections.experience.chars().count() < 200 {
        recommendations.push(
            "Provide more detailed descriptions of work experience and achievements".to_string(),
        );
    }

    let summary = summary_sentence(scores.overall, &strengths, &weaknesses);
    Feedback {
        strengths,
        weaknesses,
        recommendations,
        summary,
    }
}

/// The deterministic tables with the degraded-mode marker appended, so a
/// reader can tell rule-based-by-outage from rule-based-by-configuration.
pub fn degraded_feedback(sections: &SectionMap, scores: ScoreBreakdown) -> Feedback {
    let mut feedback = deterministic_feedback(sections, scores);
    feedback.summary = format!("{} {DEGRADED_FEEDBACK_NOTE}", feedback.summary);
    feedback
}

/// Bracket sentence for the overall score, with strengths and weaknesses
/// rendered inline after it.
fn summary_sentence(overall: f64, strengths: &[String], weaknesses: &[String]) -> String {
    let bracket = if overall >= 80.0 {
        "Excellent candidate with strong alignment to job requirements."
    } else if overall >= 65.0 {
        "Good candidate with solid qualifications for the role."
    } else if overall >= 50.0 {
        "Moderate candidate with some relevant qualifications."
    } else {
        "Limited alignment with job requirements."
    };

    let mut parts = vec![bracket.to_string()];
    if !strengths.is_empty() {
        parts.push(format!("Key strengths: {}", strengths.join(", ")));
    }
    if !weaknesses.is_empty() {
        parts.push(format!("Areas for improvement: {}", weaknesses.join(", ")));
    }
    parts.join(" ")
}

fn parse_feedback(response: &str) -> Option<Feedback> {
    let json = extract_json_object(response)?;
    let parsed: FeedbackJson = serde_json::from_str(json).ok()?;

    let mut strengths = parsed.strengths;
    strengths.extend(parsed.soft_skills_assessment);

    Some(Feedback {
        strengths,
        weaknesses: parsed.weaknesses,
        recommendations: parsed.recommendations,
        summary: parsed.summary,
    })
}

/// First balanced `{ ... }` substring, tracking string literals and escapes
/// so braces inside strings do not count. Code fences around the object
/// fall away for free: the scan starts at the first `{`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in text.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Renders non-empty labeled sections as `section: content` lines for the
/// feedback prompt. `full_text` stays out; it duplicates the others.
fn combined_cv_text(sections: &SectionMap) -> String {
    SectionLabel::ALL
        .iter()
        .filter_map(|&label| {
            let body = sections.get(label);
            if body.trim().is_empty() {
                None
            } else {
                Some(format!("{}: {}", label.as_str(), body))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
