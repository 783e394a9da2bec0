use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::matching::analyze::analyze;
use crate::matching::jobscan::jobscan;
use crate::matching::models::{AnalyzeRequest, AnalyzeResponse, JobscanRequest, JobscanResponse};
use crate::state::AppState;

/// POST /api/matching/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let matching_score = analyze(&state.llm, &req.cv, &req.job).await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        matching_score,
    }))
}

/// POST /api/matching/jobscan-analysis
pub async fn handle_jobscan(
    State(state): State<AppState>,
    Json(req): Json<JobscanRequest>,
) -> Result<Json<JobscanResponse>, AppError> {
    let report = jobscan(&state.llm, &req.cv_text, &req.job_text).await?;
    Ok(Json(JobscanResponse {
        success: true,
        report,
    }))
}
