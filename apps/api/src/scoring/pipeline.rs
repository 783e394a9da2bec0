//! Scoring pipeline — one job offer, up to five CVs, strictly sequential.
//!
//! Flow: parse job → for each CV { parse → score → partial_result } → complete.
//! A job parse failure ends the run. A CV failure is reported and skipped.
//! The run stops early once the client has disconnected.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::{DocumentParser, ParsedDocument, UploadedFile};
use crate::errors::AppError;
use crate::scoring::events::{EventSink, ScoringEvent};
use crate::scoring::{CandidateResult, CandidateScorer};

pub const MAX_CV_FILES: usize = 5;

/// Validated upload for one scoring run.
#[derive(Debug, Clone)]
pub struct ScoringRequest {
    pub job: UploadedFile,
    pub cvs: Vec<UploadedFile>,
}

impl ScoringRequest {
    /// Exactly one job file and 1 to `MAX_CV_FILES` CV files.
    pub fn new(mut jobs: Vec<UploadedFile>, cvs: Vec<UploadedFile>) -> Result<Self, AppError> {
        if jobs.len() != 1 {
            return Err(AppError::Validation(format!(
                "Exactly one job offer file is required (got {})",
                jobs.len()
            )));
        }
        if cvs.is_empty() || cvs.len() > MAX_CV_FILES {
            return Err(AppError::Validation(format!(
                "Between 1 and {MAX_CV_FILES} CV files are required (got {})",
                cvs.len()
            )));
        }
        let job = jobs.remove(0);
        Ok(Self { job, cvs })
    }
}

/// Runs the pipeline, reporting everything through `events`.
pub async fn run_scoring(
    parser: Arc<dyn DocumentParser>,
    scorer: Arc<dyn CandidateScorer>,
    request: ScoringRequest,
    events: EventSink,
) {
    let run_id = Uuid::new_v4();
    let total = request.cvs.len();
    info!("Scoring run {run_id}: {} against {total} CV(s)", request.job.file_name);

    let progress = |message: String, current: usize, file_name: Option<&str>| {
        events.emit(ScoringEvent::Progress {
            message,
            current,
            total,
            file_name: file_name.map(str::to_string),
        })
    };

    if !progress(
        "Parsing job offer".to_string(),
        0,
        Some(request.job.file_name.as_str()),
    ) {
        return;
    }

    let job = match parse_non_empty(parser.as_ref(), &request.job).await {
        Ok(job) => job,
        Err(message) => {
            warn!("Scoring run {run_id}: job offer rejected: {message}");
            events.emit(ScoringEvent::error(
                format!("Job offer could not be parsed: {message}"),
                Some(request.job.file_name.as_str()),
            ));
            return;
        }
    };

    let mut results: Vec<CandidateResult> = Vec::with_capacity(total);
    let mut errors = 0usize;

    for (index, cv_file) in request.cvs.iter().enumerate() {
        let file_name = cv_file.file_name.as_str();
        if !progress(
            format!("Analysing CV {}/{total}", index + 1),
            index + 1,
            Some(file_name),
        ) {
            info!("Scoring run {run_id}: client disconnected, stopping");
            return;
        }

        match score_one(parser.as_ref(), scorer.as_ref(), cv_file, &job, &events).await {
            Ok(result) => {
                info!(
                    "Scoring run {run_id}: {file_name} scored {}/100",
                    result.final_score()
                );
                let delivered = events.emit(ScoringEvent::PartialResult {
                    index,
                    result: result.clone(),
                });
                results.push(result);
                if !delivered {
                    info!("Scoring run {run_id}: client disconnected, stopping");
                    return;
                }
            }
            Err(message) => {
                errors += 1;
                warn!("Scoring run {run_id}: {file_name} failed: {message}");
                if !events.emit(ScoringEvent::error(message, Some(file_name))) {
                    return;
                }
            }
        }
    }

    results.sort_by(|a, b| b.final_score().cmp(&a.final_score()));
    info!(
        "Scoring run {run_id} complete: {} scored, {errors} failed",
        results.len()
    );
    events.emit(ScoringEvent::Complete {
        run_id,
        total_processed: results.len(),
        total_errors: errors,
        results,
        completed_at: Utc::now(),
    });
}

async fn score_one(
    parser: &dyn DocumentParser,
    scorer: &dyn CandidateScorer,
    cv_file: &UploadedFile,
    job: &ParsedDocument,
    events: &EventSink,
) -> Result<CandidateResult, String> {
    let cv = parse_non_empty(parser, cv_file).await?;
    scorer
        .score(&cv, job, events)
        .await
        .map_err(|e| e.to_string())
}

async fn parse_non_empty(
    parser: &dyn DocumentParser,
    file: &UploadedFile,
) -> Result<ParsedDocument, String> {
    let document = parser.parse_file(file).await.map_err(|e| e.to_string())?;
    if !document.has_text() {
        return Err(format!("no text could be extracted from {}", file.file_name));
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::channel::mpsc::UnboundedReceiver;

    use crate::documents::ParseError;
    use crate::scoring::hybrid::{HybridScore, KeywordOverlap};
    use crate::scoring::review::ReviewVerdict;

    #[derive(Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentParser for CountingParser {
        fn ensure_ready(&self) -> Result<(), ParseError> {
            Ok(())
        }

        async fn parse_file(&self, file: &UploadedFile) -> Result<ParsedDocument, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ParsedDocument {
                file_name: file.file_name.clone(),
                text: "Rust Kafka".to_string(),
                profile: None,
            })
        }
    }

    /// Drops the held receiver while scoring the first CV, as a closed tab would.
    struct DisconnectingScorer {
        receiver: Mutex<Option<UnboundedReceiver<ScoringEvent>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandidateScorer for DisconnectingScorer {
        async fn score(
            &self,
            cv: &ParsedDocument,
            _job: &ParsedDocument,
            _events: &EventSink,
        ) -> Result<CandidateResult, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            drop(self.receiver.lock().unwrap().take());
            Ok(CandidateResult {
                file_name: cv.file_name.clone(),
                candidate_name: None,
                preliminary: HybridScore::combine(KeywordOverlap::default(), 0.0),
                verdict: ReviewVerdict::fallback(),
            })
        }
    }

    fn three_cvs() -> ScoringRequest {
        ScoringRequest::new(
            vec![file("ao.txt")],
            vec![file("cv1.txt"), file("cv2.txt"), file("cv3.txt")],
        )
        .unwrap()
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn test_request_requires_single_job() {
        assert!(ScoringRequest::new(vec![], vec![file("a.txt")]).is_err());
        assert!(
            ScoringRequest::new(vec![file("j1.txt"), file("j2.txt")], vec![file("a.txt")])
                .is_err()
        );
    }

    #[test]
    fn test_request_cv_bounds() {
        assert!(ScoringRequest::new(vec![file("j.txt")], vec![]).is_err());
        let five: Vec<_> = (0..5).map(|i| file(&format!("cv{i}.txt"))).collect();
        assert!(ScoringRequest::new(vec![file("j.txt")], five.clone()).is_ok());
        let mut six = five;
        six.push(file("cv5.txt"));
        assert!(matches!(
            ScoringRequest::new(vec![file("j.txt")], six),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnected_client_parses_nothing() {
        let parser = Arc::new(CountingParser::default());
        let scorer = Arc::new(DisconnectingScorer {
            receiver: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        let (events, rx) = EventSink::channel();
        drop(rx);

        run_scoring(parser.clone(), scorer.clone(), three_cvs(), events).await;

        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disconnect_mid_run_stops_before_next_cv() {
        let parser = Arc::new(CountingParser::default());
        let (events, rx) = EventSink::channel();
        let scorer = Arc::new(DisconnectingScorer {
            receiver: Mutex::new(Some(rx)),
            calls: AtomicUsize::new(0),
        });

        run_scoring(parser.clone(), scorer.clone(), three_cvs(), events).await;

        // Job offer and first CV only.
        assert_eq!(parser.calls.load(Ordering::SeqCst), 2);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }
}
