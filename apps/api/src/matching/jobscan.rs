//! ATS-style skill scan: the LLM lists the job's skills, occurrences are
//! counted locally in both texts.

use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{CallOptions, LlmClient, ANALYSIS_MODEL};
use crate::matching::dedup_skills;
use crate::matching::models::{JobscanReport, SkillCoverage};
use crate::matching::prompts::{jobscan_system, JOBSCAN_PROMPT_TEMPLATE};
use crate::scoring::hybrid::count_term;

const HARD_SKILL_WEIGHT: usize = 2;
const SOFT_SKILL_WEIGHT: usize = 1;

#[derive(Debug, Default, Deserialize)]
pub struct SkillExtraction {
    #[serde(default)]
    pub hard_skills: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub async fn jobscan(llm: &LlmClient, cv_text: &str, job_text: &str) -> Result<JobscanReport, AppError> {
    if cv_text.trim().is_empty() || job_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Both cv_text and job_text must be non-empty".to_string(),
        ));
    }

    let prompt = fill_template(
        JOBSCAN_PROMPT_TEMPLATE,
        &[("job_text", job_text), ("cv_text", cv_text)],
    );
    let extraction: SkillExtraction = llm
        .call_validated_json(&prompt, &jobscan_system(), CallOptions::json(ANALYSIS_MODEL))
        .await?;

    let report = build_report(extraction, cv_text, job_text);
    info!(
        "Jobscan: match_rate={} hard={} soft={} missing_hard={}",
        report.match_rate,
        report.hard_skills.len(),
        report.soft_skills.len(),
        report.missing_hard_skills.len()
    );
    Ok(report)
}

pub fn build_report(extraction: SkillExtraction, cv_text: &str, job_text: &str) -> JobscanReport {
    let hard_skills = coverage(extraction.hard_skills, cv_text, job_text);
    let soft_skills = coverage(extraction.soft_skills, cv_text, job_text);

    JobscanReport {
        match_rate: match_rate(&hard_skills, &soft_skills),
        missing_hard_skills: missing(&hard_skills),
        missing_soft_skills: missing(&soft_skills),
        hard_skills,
        soft_skills,
        recommendations: extraction.recommendations,
    }
}

pub fn coverage(skills: Vec<String>, cv_text: &str, job_text: &str) -> Vec<SkillCoverage> {
    dedup_skills(skills)
        .into_iter()
        .map(|skill| SkillCoverage {
            cv_count: count_term(cv_text, &skill),
            job_count: count_term(job_text, &skill),
            skill,
        })
        .collect()
}

/// Percentage of listed skills found in the CV, hard skills counting double.
/// 0 when no skill was listed.
pub fn match_rate(hard: &[SkillCoverage], soft: &[SkillCoverage]) -> u32 {
    let present = |skills: &[SkillCoverage]| skills.iter().filter(|s| s.in_cv()).count();
    let total = HARD_SKILL_WEIGHT * hard.len() + SOFT_SKILL_WEIGHT * soft.len();
    if total == 0 {
        return 0;
    }
    let found = HARD_SKILL_WEIGHT * present(hard) + SOFT_SKILL_WEIGHT * present(soft);
    (100.0 * found as f32 / total as f32).round() as u32
}

fn missing(skills: &[SkillCoverage]) -> Vec<String> {
    skills
        .iter()
        .filter(|s| !s.in_cv())
        .map(|s| s.skill.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const JOB: &str = "We need Java and Kubernetes skills, plus strong communication. Java 17 required.";
    const CV: &str = "Senior JavaScript and Java developer. Kubernetes on GKE.";

    #[test]
    fn test_coverage_counts_word_bounded_occurrences() {
        let skills = coverage(strings(&["Java", "Kubernetes"]), CV, JOB);
        assert_eq!(
            skills[0],
            SkillCoverage {
                skill: "Java".to_string(),
                cv_count: 1,
                job_count: 2
            }
        );
        assert_eq!(skills[1].cv_count, 1);
    }

    #[test]
    fn test_coverage_dedups_case_insensitively() {
        let skills = coverage(strings(&["Java", "java ", "", "JAVA"]), CV, JOB);
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].skill, "Java");
    }

    #[test]
    fn test_match_rate_weights_hard_skills_double() {
        let extraction = SkillExtraction {
            hard_skills: strings(&["Java", "Terraform"]),
            soft_skills: strings(&["communication"]),
            recommendations: strings(&["Mention Terraform"]),
        };
        let report = build_report(extraction, CV, JOB);
        // Java found (2), Terraform missing (0), communication missing (0) → 2 / 5
        assert_eq!(report.match_rate, 40);
        assert_eq!(report.missing_hard_skills, vec!["Terraform"]);
        assert_eq!(report.missing_soft_skills, vec!["communication"]);
        assert_eq!(report.recommendations, vec!["Mention Terraform"]);
    }

    #[test]
    fn test_match_rate_without_skills_is_zero() {
        assert_eq!(match_rate(&[], &[]), 0);
    }
}
