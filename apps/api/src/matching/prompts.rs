// LLM prompt constants for the matching routes.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub fn analysis_system() -> String {
    format!(
        "You are an expert IT recruiter assessing how well a candidate's experience fits a role. {JSON_ONLY_SYSTEM}"
    )
}

/// Experience assessment prompt. Replace: {job_title}, {job_text}, {cv_title}, {experience_years}, {cv_text}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Assess the candidate's EXPERIENCE fit for the role. Skills and keywords are scored separately; focus on seniority, domain, responsibilities and recency.

Return a JSON object with this EXACT schema:
{
  "experience_match": 70,
  "strengths": ["..."],
  "gaps": ["..."],
  "recommendations": ["concrete advice for the recruiter or candidate"]
}

experience_match is 0-100. Give 2-5 items per list. Write in the language of the job offer.

ROLE: {job_title}
JOB OFFER:
{job_text}

CANDIDATE TITLE: {cv_title}
DECLARED YEARS OF EXPERIENCE: {experience_years}
CV:
{cv_text}"#;

pub fn jobscan_system() -> String {
    format!(
        "You are an applicant tracking system (ATS) analyst. You extract the skills a job offer screens for. {JSON_ONLY_SYSTEM}"
    )
}

/// Skill extraction prompt. Replace: {job_text}, {cv_text}
pub const JOBSCAN_PROMPT_TEMPLATE: &str = r#"List the skills an ATS would screen for in this job offer, then give advice to improve the CV's match.

Return a JSON object with this EXACT schema:
{
  "hard_skills": ["Python", "Kubernetes"],
  "soft_skills": ["communication"],
  "recommendations": ["..."]
}

RULES:
- Skills must be short terms exactly as written in the job offer (1-3 words), no sentences.
- hard_skills: technologies, tools, methods, certifications, languages.
- soft_skills: interpersonal and behavioural skills.
- At most 25 hard skills and 10 soft skills.

JOB OFFER:
{job_text}

CV:
{cv_text}"#;
