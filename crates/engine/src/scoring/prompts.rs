//! Prompt templates for dimension scoring and feedback generation.
//!
//! Placeholders are `{snake_case}` tokens replaced before sending; every
//! template ends by instructing the model to answer with nothing but the
//! score or the JSON object, which is what keeps the defensive parsing on
//! the other side simple.

use crate::scoring::Dimension;

/// Skills rubric. Replace `{cv_skills}` and `{job_requirements}` before
/// sending.
pub const SKILLS_RUBRIC: &str = r#"Evaluate the candidate's skills based on the provided CV and job requirements.
Consider both technical skills and their relevance to the position.
Rate the skills match on a scale of 0-100 where:
- 90-100: Excellent match, possesses all key skills and advanced expertise
- 70-89: Good match, has most required skills with some advanced capabilities
- 50-69: Moderate match, has basic required skills but lacks advanced expertise
- 30-49: Limited match, has some related skills but significant gaps
- 0-29: Poor match, skills do not align with requirements

CV Skills Section:
{cv_skills}

Job Requirements:
{job_requirements}

Provide only the numeric score (0-100) without any explanation or additional text:"#;

/// Experience rubric. Replace `{cv_experience}` and `{job_context}` before
/// sending.
pub const EXPERIENCE_RUBRIC: &str = r#"Evaluate the relevance and quality of the candidate's experience for the job. Consider:
- Years of experience in relevant field
- Progression and growth in roles
- Responsibilities and achievements that match job requirements
- Industry experience
- Leadership or management experience if relevant

Rate the experience match on a scale of 0-100 where:
- 90-100: Excellent match, extensive relevant experience with clear progression
- 70-89: Good match, solid relevant experience with some achievements
- 50-69: Moderate match, some relevant experience but limited
- 30-49: Limited match, minimal relevant experience
- 0-29: Poor match, experience not aligned with requirements

CV Experience Section:
{cv_experience}

Job Context:
{job_context}

Provide only the numeric score (0-100) without any explanation or additional text:"#;

/// Education rubric. Replace `{cv_education}` and `{job_requirements}`
/// before sending.
pub const EDUCATION_RUBRIC: &str = r#"Evaluate the candidate's education against job requirements. Consider:
- Degree level relative to requirements
- Field of study relevance
- Institution prestige (if applicable)
- Additional certifications
- Continuing education or professional development

Rate the education match on a scale of 0-100 where:
- 90-100: Excellent match, exceeds educational requirements
- 70-89: Good match, meets all educational requirements
- 50-69: Moderate match, meets minimum requirements
- 30-49: Limited match, partially meets requirements
- 0-29: Poor match, does not meet requirements

CV Education Section:
{cv_education}

Job Requirements:
{job_requirements}

Provide only the numeric score (0-100) without any explanation or additional text:"#;

/// Feedback template. Replace `{cv_text}`, `{job_description}`, and
/// `{job_requirements}` before sending. The `soft_skills_assessment` list
/// is merged into strengths after parsing.
pub const DETAILED_FEEDBACK: &str = r#"Based on the CV and job requirements, generate comprehensive feedback that includes assessment of soft skills.
Focus on both technical qualifications and interpersonal abilities.
Provide feedback in the following JSON format:

{
    "strengths": ["specific strength 1", "specific strength 2", ...],
    "weaknesses": ["specific weakness 1", "specific weakness 2", ...],
    "recommendations": ["specific recommendation 1", "specific recommendation 2", ...],
    "soft_skills_assessment": ["soft skill observation 1", "soft skill observation 2", ...],
    "summary": "A concise summary of the candidate's fit for the position."
}

CV:
{cv_text}

Job Description:
{job_description}

Job Requirements:
{job_requirements}

Provide only the JSON response without any explanation or additional text:"#;

pub fn rubric_prompt(dimension: Dimension, cv_text: &str, job_text: &str) -> String {
    match dimension {
        Dimension::Skills => SKILLS_RUBRIC
            .replace("{cv_skills}", cv_text)
            .replace("{job_requirements}", job_text),
        Dimension::Experience => EXPERIENCE_RUBRIC
            .replace("{cv_experience}", cv_text)
            .replace("{job_context}", job_text),
        Dimension::Education => EDUCATION_RUBRIC
            .replace("{cv_education}", cv_text)
            .replace("{job_requirements}", job_text),
    }
}

pub fn feedback_prompt(cv_text: &str, job_description: &str, job_requirements: &str) -> String {
    DETAILED_FEEDBACK
        .replace("{cv_text}", cv_text)
        .replace("{job_description}", job_description)
        .replace("{job_requirements}", job_requirements)
}
