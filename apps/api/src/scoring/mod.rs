// Streaming multi-candidate scoring.
// Implements: hybrid pre-score, streamed LLM review, SSE event protocol,
// the sequential per-CV pipeline and the POST /api/scoring handler.
// All LLM calls go through llm_client.

pub mod events;
pub mod handlers;
pub mod hybrid;
pub mod pipeline;
pub mod prompts;
pub mod review;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::documents::ParsedDocument;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::scoring::events::EventSink;
use crate::scoring::hybrid::{hybrid_score, HybridScore};
use crate::scoring::review::{review_candidate, ReviewVerdict};

/// Scored candidate, as sent in `partial_result` and `complete` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub file_name: String,
    pub candidate_name: Option<String>,
    pub preliminary: HybridScore,
    pub verdict: ReviewVerdict,
}

impl CandidateResult {
    pub fn final_score(&self) -> u32 {
        self.verdict.final_score
    }
}

/// Scores one parsed CV against the parsed job offer.
/// Carried in `AppState` as `Arc<dyn CandidateScorer>`.
#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(
        &self,
        cv: &ParsedDocument,
        job: &ParsedDocument,
        events: &EventSink,
    ) -> Result<CandidateResult, AppError>;
}

/// Production scorer: hybrid pre-score followed by the streamed LLM review.
pub struct ReviewedHybridScorer {
    llm: LlmClient,
}

impl ReviewedHybridScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateScorer for ReviewedHybridScorer {
    async fn score(
        &self,
        cv: &ParsedDocument,
        job: &ParsedDocument,
        events: &EventSink,
    ) -> Result<CandidateResult, AppError> {
        let preliminary = hybrid_score(&self.llm, &cv.text, &job.text).await?;
        let verdict = review_candidate(&self.llm, cv, job, &preliminary, events).await?;

        Ok(CandidateResult {
            file_name: cv.file_name.clone(),
            candidate_name: cv.candidate_name().map(str::to_string),
            preliminary,
            verdict,
        })
    }
}
