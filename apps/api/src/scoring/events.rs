//! SSE protocol for `POST /api/scoring`.
//!
//! Every frame is `data: <json>\n\n` where the JSON object carries a `type`
//! discriminator: `progress`, `partial_result`, `complete`, `error`,
//! `streaming_content`.

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use serde::Serialize;
use uuid::Uuid;

use crate::scoring::CandidateResult;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringEvent {
    Progress {
        message: String,
        current: usize,
        total: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    PartialResult {
        index: usize,
        result: CandidateResult,
    },
    Complete {
        run_id: Uuid,
        results: Vec<CandidateResult>,
        total_processed: usize,
        total_errors: usize,
        completed_at: DateTime<Utc>,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    StreamingContent {
        file_name: String,
        content: String,
    },
}

impl ScoringEvent {
    pub fn error(message: impl Into<String>, file_name: Option<&str>) -> Self {
        ScoringEvent::Error {
            message: message.into(),
            file_name: file_name.map(str::to_string),
        }
    }

    /// The `data:` frame carrying this event as JSON.
    pub fn to_sse_event(&self) -> Result<Event, axum::Error> {
        Event::default().json_data(self)
    }
}

/// Sending half of a scoring run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<ScoringEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<ScoringEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Returns `false` once the receiver is gone (client disconnected).
    pub fn emit(&self, event: ScoringEvent) -> bool {
        self.tx.unbounded_send(event).is_ok()
    }
}
