//! Axum route handler for the streaming scoring API.

use axum::{
    extract::{multipart::Field, Multipart, State},
    response::{sse::Sse, IntoResponse, Response},
};
use futures::StreamExt;

use crate::documents::UploadedFile;
use crate::errors::AppError;
use crate::scoring::pipeline::{run_scoring, ScoringRequest};
use crate::scoring::events::EventSink;
use crate::state::AppState;

const JOB_FIELD: &str = "jobOffer";
const CV_FIELDS: [&str; 2] = ["cvs", "cvs[]"];

/// POST /api/scoring
///
/// Multipart form: one `jobOffer` file and 1–5 `cvs` files.
/// Responds with `text/event-stream`; see `scoring::events` for the frames.
/// Count and credential checks fail fast with a JSON error before streaming.
pub async fn handle_scoring(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut jobs = Vec::new();
    let mut cvs = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == JOB_FIELD {
            jobs.push(read_file(field).await?);
        } else if CV_FIELDS.contains(&name.as_str()) {
            cvs.push(read_file(field).await?);
        }
    }

    let request = ScoringRequest::new(jobs, cvs)?;
    state.parser.ensure_ready()?;

    let (events, rx) = EventSink::channel();
    tokio::spawn(run_scoring(
        state.parser.clone(),
        state.scorer.clone(),
        request,
        events,
    ));

    let stream = rx.map(|event| event.to_sse_event());
    Ok(Sse::new(stream).into_response())
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile, AppError> {
    let field_name = field.name().unwrap_or_default().to_string();
    let file_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or(field_name);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload '{file_name}': {e}")))?;

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}
