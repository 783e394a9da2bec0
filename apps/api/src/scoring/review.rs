//! LLM review: turns the preliminary hybrid score into a final verdict.
//!
//! The model answer is streamed token by token to the browser as
//! `streaming_content` events, then the accumulated text is recovered with
//! `json_repair` and validated into a `ReviewVerdict`. Anything unrecoverable
//! degrades to `ReviewVerdict::fallback()` instead of failing the candidate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::documents::ParsedDocument;
use crate::llm_client::json_repair::repair_json;
use crate::llm_client::prompts::fill_template;
use crate::llm_client::{CallOptions, LlmClient, LlmError, REVIEW_MODEL};
use crate::scoring::events::{EventSink, ScoringEvent};
use crate::scoring::hybrid::HybridScore;
use crate::scoring::prompts::{REVIEW_PROMPT_TEMPLATE, REVIEW_SYSTEM};

const MAX_CV_CHARS: usize = 12_000;
const MAX_JOB_CHARS: usize = 8_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "haute" | "élevée" | "elevee" | "forte" => Confidence::High,
            "low" | "faible" | "basse" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

/// Final verdict for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// 0 – 100
    pub final_score: u32,
    pub confidence: Confidence,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendation: String,
    /// `true` when the model answer could not be used.
    pub fallback: bool,
}

impl ReviewVerdict {
    /// Degraded verdict used when the model answer cannot be recovered.
    pub fn fallback() -> Self {
        Self {
            final_score: 0,
            confidence: Confidence::Low,
            summary: String::new(),
            strengths: vec![],
            weaknesses: vec![],
            matched_skills: vec![],
            missing_skills: vec![],
            recommendation: "Automatic review unavailable. Review this CV manually.".to_string(),
            fallback: true,
        }
    }
}

/// Shape of the model answer, kept loose so minor schema drift still validates.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    final_score: Value,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    matched_skills: Vec<String>,
    #[serde(default)]
    missing_skills: Vec<String>,
    #[serde(default)]
    recommendation: String,
}

impl RawVerdict {
    fn into_verdict(self) -> Option<ReviewVerdict> {
        let score = match &self.final_score {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
            _ => return None,
        };

        Some(ReviewVerdict {
            final_score: score.round().clamp(0.0, 100.0) as u32,
            confidence: self
                .confidence
                .as_deref()
                .map(Confidence::from_label)
                .unwrap_or_default(),
            summary: self.summary,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
            matched_skills: self.matched_skills,
            missing_skills: self.missing_skills,
            recommendation: self.recommendation,
            fallback: false,
        })
    }
}

/// Recovers a verdict from the accumulated model text, or the fallback.
pub fn verdict_from_text(text: &str, file_name: &str) -> ReviewVerdict {
    let repaired = match repair_json(text) {
        Ok(r) => r,
        Err(e) => {
            warn!("Review for {file_name}: {e}; using fallback verdict");
            return ReviewVerdict::fallback();
        }
    };

    if let Some(stage) = repaired.stage {
        debug!(
            "Review for {file_name} recovered via {:?} at stage {}",
            repaired.strategy,
            stage.number()
        );
    }

    match serde_json::from_value::<RawVerdict>(repaired.value)
        .ok()
        .and_then(RawVerdict::into_verdict)
    {
        Some(verdict) => verdict,
        None => {
            warn!("Review for {file_name} did not match the verdict schema; using fallback verdict");
            ReviewVerdict::fallback()
        }
    }
}

pub fn build_review_prompt(
    cv: &ParsedDocument,
    job: &ParsedDocument,
    preliminary: &HybridScore,
) -> String {
    let preliminary_json = serde_json::json!({
        "combined_score": preliminary.combined_score,
        "keyword_coverage": preliminary.keyword_score,
        "semantic_similarity": preliminary.embedding_score,
        "matched_keywords": preliminary.matched_keywords,
        "missing_keywords": preliminary.missing_keywords,
    });

    let preliminary_json = preliminary_json.to_string();

    fill_template(
        REVIEW_PROMPT_TEMPLATE,
        &[
            ("preliminary_json", preliminary_json.as_str()),
            ("job_text", clip(&job.text, MAX_JOB_CHARS)),
            ("cv_text", clip(&cv.text, MAX_CV_CHARS)),
        ],
    )
}

/// Streams the LLM review, forwarding each token as a `streaming_content` event.
pub async fn review_candidate(
    llm: &LlmClient,
    cv: &ParsedDocument,
    job: &ParsedDocument,
    preliminary: &HybridScore,
    events: &EventSink,
) -> Result<ReviewVerdict, LlmError> {
    let prompt = build_review_prompt(cv, job, preliminary);
    let file_name = cv.file_name.clone();

    let text = llm
        .call_stream(
            &prompt,
            REVIEW_SYSTEM,
            CallOptions::json(REVIEW_MODEL),
            |token| {
                events.emit(ScoringEvent::StreamingContent {
                    file_name: file_name.clone(),
                    content: token.to_string(),
                });
            },
        )
        .await?;

    Ok(verdict_from_text(&text, &cv.file_name))
}

fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
