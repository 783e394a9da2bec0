use serde::{Deserialize, Serialize};

/// CV as sent by the browser. Transient: lives for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvData {
    pub text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_years: Option<f32>,
    pub title: Option<String>,
}

/// Job offer or AO as sent by the browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobData {
    pub text: String,
    pub title: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub cv: CvData,
    pub job: JobData,
}

/// All sub-scores are 0 – 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingScore {
    pub overall_score: u32,
    pub skills_match: u32,
    pub experience_match: u32,
    pub keyword_match: u32,
    pub semantic_similarity: u32,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub matching_score: MatchingScore,
}

#[derive(Debug, Deserialize)]
pub struct JobscanRequest {
    pub cv_text: String,
    pub job_text: String,
}

/// How often one skill appears in the CV and in the job offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCoverage {
    pub skill: String,
    pub cv_count: usize,
    pub job_count: usize,
}

impl SkillCoverage {
    pub fn in_cv(&self) -> bool {
        self.cv_count > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobscanReport {
    /// 0 – 100, hard skills weighted double.
    pub match_rate: u32,
    pub hard_skills: Vec<SkillCoverage>,
    pub soft_skills: Vec<SkillCoverage>,
    pub missing_hard_skills: Vec<String>,
    pub missing_soft_skills: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobscanResponse {
    pub success: bool,
    pub report: JobscanReport,
}
