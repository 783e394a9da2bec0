// File ingestion: turns an uploaded CV or job offer into plain text, plus a
// structured profile when the HRFlow parser produced one.

pub mod hrflow;
pub mod text;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

pub use hrflow::HrflowProfile;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("HRFlow credentials are not configured (HRFLOW_API_KEY, HRFLOW_USER_EMAIL, HRFLOW_SOURCE_KEY)")]
    MissingCredentials,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("HRFlow error (status {status}): {message}")]
    Hrflow { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Output of `parse_file`.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub file_name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<HrflowProfile>,
}

impl ParsedDocument {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn candidate_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.info.full_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

/// Supported upload formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
    Doc,
    Rtf,
    Odt,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Result<Self, ParseError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "md" => Ok(DocumentKind::PlainText),
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "doc" => Ok(DocumentKind::Doc),
            "rtf" => Ok(DocumentKind::Rtf),
            "odt" => Ok(DocumentKind::Odt),
            _ => Err(ParseError::UnsupportedFormat(file_name.to_string())),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::PlainText => "text/plain",
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Doc => "application/msword",
            DocumentKind::Rtf => "application/rtf",
            DocumentKind::Odt => "application/vnd.oasis.opendocument.text",
        }
    }
}

/// Document parsing backend. Carried in `AppState` as `Arc<dyn DocumentParser>`.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Fails when the backend cannot parse anything (e.g. missing credentials).
    fn ensure_ready(&self) -> Result<(), ParseError>;

    async fn parse_file(&self, file: &UploadedFile) -> Result<ParsedDocument, ParseError>;
}
