//! CV ↔ job matching score.
//!
//! overall = round(0.35 × skills + 0.25 × experience + 0.2 × keyword + 0.2 × semantic)

use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{CallOptions, LlmClient, ANALYSIS_MODEL};
use crate::matching::models::{CvData, JobData, MatchingScore};
use crate::matching::prompts::{analysis_system, ANALYSIS_PROMPT_TEMPLATE};
use crate::matching::dedup_skills;
use crate::scoring::hybrid::{cosine_similarity, count_term, keyword_overlap, KeywordOverlap};

const SKILLS_WEIGHT: f32 = 0.35;
const EXPERIENCE_WEIGHT: f32 = 0.25;
const KEYWORD_WEIGHT: f32 = 0.2;
const SEMANTIC_WEIGHT: f32 = 0.2;

/// Qualitative part of the analysis, produced by the LLM.
#[derive(Debug, Default, Deserialize)]
pub struct ExperienceAssessment {
    #[serde(default)]
    pub experience_match: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Skill coverage of the CV against the job.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillsMatch {
    pub score: u32,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

pub async fn analyze(llm: &LlmClient, cv: &CvData, job: &JobData) -> Result<MatchingScore, AppError> {
    if cv.text.trim().is_empty() || job.text.trim().is_empty() {
        return Err(AppError::Validation(
            "Both cv.text and job.text must be non-empty".to_string(),
        ));
    }

    let prompt = build_analysis_prompt(cv, job);
    let system = analysis_system();
    let (cv_embedding, job_embedding, assessment) = tokio::try_join!(
        llm.embed(&cv.text),
        llm.embed(&job.text),
        llm.call_validated_json::<ExperienceAssessment>(
            &prompt,
            &system,
            CallOptions::json(ANALYSIS_MODEL),
        ),
    )?;

    let semantic = cosine_similarity(&cv_embedding, &job_embedding);
    let overlap = keyword_overlap(&cv.text, &job.text);
    let score = assemble(cv, job, &overlap, semantic, assessment);

    info!(
        "Matching analysis: overall={} skills={} experience={} keyword={} semantic={}",
        score.overall_score,
        score.skills_match,
        score.experience_match,
        score.keyword_match,
        score.semantic_similarity
    );
    Ok(score)
}

/// Combines the deterministic signals with the LLM assessment.
pub fn assemble(
    cv: &CvData,
    job: &JobData,
    overlap: &KeywordOverlap,
    semantic: f32,
    assessment: ExperienceAssessment,
) -> MatchingScore {
    let skills = skills_match(cv, job, overlap);
    let experience = assessment.experience_match.clamp(0.0, 100.0).round() as u32;
    let keyword = percent(overlap.coverage);
    let semantic = percent(semantic);

    MatchingScore {
        overall_score: overall_score(skills.score, experience, keyword, semantic),
        skills_match: skills.score,
        experience_match: experience,
        keyword_match: keyword,
        semantic_similarity: semantic,
        matched_skills: skills.matched,
        missing_skills: skills.missing,
        strengths: assessment.strengths,
        gaps: assessment.gaps,
        recommendations: assessment.recommendations,
    }
}

/// Declared job skills checked against the CV's skill list and text.
/// Without declared skills the keyword coverage stands in.
pub fn skills_match(cv: &CvData, job: &JobData, overlap: &KeywordOverlap) -> SkillsMatch {
    let required = dedup_skills(job.required_skills.iter().cloned());
    if required.is_empty() {
        return SkillsMatch {
            score: percent(overlap.coverage),
            matched: overlap.matched.clone(),
            missing: overlap.missing.clone(),
        };
    }

    let (matched, missing): (Vec<String>, Vec<String>) =
        required.into_iter().partition(|skill| {
            let wanted = skill.to_lowercase();
            cv.skills.iter().any(|s| s.trim().to_lowercase() == wanted)
                || count_term(&cv.text, skill) > 0
        });
    let score = (100.0 * matched.len() as f32 / (matched.len() + missing.len()) as f32).round();

    SkillsMatch {
        score: score as u32,
        matched,
        missing,
    }
}

pub fn overall_score(skills: u32, experience: u32, keyword: u32, semantic: u32) -> u32 {
    let weighted = SKILLS_WEIGHT * skills as f32
        + EXPERIENCE_WEIGHT * experience as f32
        + KEYWORD_WEIGHT * keyword as f32
        + SEMANTIC_WEIGHT * semantic as f32;
    (weighted.round() as u32).min(100)
}

fn percent(ratio: f32) -> u32 {
    (100.0 * ratio.clamp(0.0, 1.0)).round() as u32
}

fn build_analysis_prompt(cv: &CvData, job: &JobData) -> String {
    let experience_years = cv
        .experience_years
        .map(|y| format!("{y}"))
        .unwrap_or_else(|| "not stated".to_string());

    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("job_title", job.title.as_deref().unwrap_or("not stated")),
            ("job_text", job.text.as_str()),
            ("cv_title", cv.title.as_deref().unwrap_or("not stated")),
            ("experience_years", experience_years.as_str()),
            ("cv_text", cv.text.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv(text: &str, skills: &[&str]) -> CvData {
        CvData {
            text: text.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn job(text: &str, required: &[&str]) -> JobData {
        JobData {
            text: text.to_string(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_overall_score_weights() {
        assert_eq!(overall_score(100, 100, 100, 100), 100);
        assert_eq!(overall_score(0, 0, 0, 0), 0);
        // 35 + 12.5 + 0 + 10 = 57.5
        assert_eq!(overall_score(100, 50, 0, 50), 58);
    }

    #[test]
    fn test_skills_match_uses_declared_skills_case_insensitively() {
        let result = skills_match(
            &cv("Backend developer, Kafka streams in production", &["RUST"]),
            &job("", &["Rust", "kafka", "Kubernetes", "rust"]),
            &KeywordOverlap::default(),
        );
        assert_eq!(result.matched, vec!["Rust", "kafka"]);
        assert_eq!(result.missing, vec!["Kubernetes"]);
        assert_eq!(result.score, 67);
    }

    #[test]
    fn test_skills_match_declared_accented_skill() {
        let result = skills_match(
            &cv("Consultant data", &["MODÉLISATION"]),
            &job("", &["Modélisation"]),
            &KeywordOverlap::default(),
        );
        assert_eq!(result.matched, vec!["Modélisation"]);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_analysis_prompt_keeps_placeholder_text_from_job() {
        let prompt = build_analysis_prompt(
            &cv("CANDIDATE-BODY", &[]),
            &job("Envoyer {cv_text} avant lundi", &[]),
        );
        assert!(prompt.contains("Envoyer {cv_text} avant lundi"));
        assert_eq!(prompt.matches("CANDIDATE-BODY").count(), 1);
    }

    #[test]
    fn test_skills_match_falls_back_to_keyword_coverage() {
        let overlap = keyword_overlap("Rust Kafka", "Rust Kafka Kubernetes Terraform");
        let result = skills_match(&cv("Rust Kafka", &[]), &job("", &[]), &overlap);
        assert_eq!(result.score, 50);
        assert_eq!(result.matched, overlap.matched);
    }

    #[test]
    fn test_assemble_clamps_llm_experience() {
        let overlap = keyword_overlap("rust", "rust");
        let assessment = ExperienceAssessment {
            experience_match: 140.0,
            strengths: vec!["Rust".to_string()],
            ..Default::default()
        };
        let score = assemble(&cv("rust", &[]), &job("rust", &[]), &overlap, 1.0, assessment);
        assert_eq!(score.experience_match, 100);
        assert_eq!(score.keyword_match, 100);
        assert_eq!(score.semantic_similarity, 100);
        assert_eq!(score.overall_score, 100);
        assert_eq!(score.strengths, vec!["Rust"]);
    }

    #[test]
    fn test_analysis_prompt_fills_placeholders() {
        let mut data = cv("CV body", &[]);
        data.experience_years = Some(7.0);
        let prompt = build_analysis_prompt(&data, &job("Job body", &[]));
        assert!(prompt.contains("DECLARED YEARS OF EXPERIENCE: 7"));
        assert!(prompt.contains("CV body"));
        assert!(prompt.contains("Job body"));
        assert!(!prompt.contains("{cv_text}"));
    }
}
