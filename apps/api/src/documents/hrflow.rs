//! HRFlow profile parsing client and the production `DocumentParser`.
//!
//! Plain-text uploads are decoded locally. Binary documents go to
//! `POST {base}/profile/parsing/file` as multipart form data. When HRFlow
//! returns a profile without text for a PDF, pdf-extract is used as a fallback.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::HrflowConfig;
use crate::documents::text::{decode_plain_text, extract_pdf_text, normalize_whitespace};
use crate::documents::{DocumentKind, DocumentParser, ParseError, ParsedDocument, UploadedFile};

const PARSING_ENDPOINT: &str = "/profile/parsing/file";
const TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Clone)]
struct HrflowCredentials {
    api_key: String,
    user_email: String,
    source_key: String,
}

#[derive(Debug, Deserialize)]
struct HrflowEnvelope {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    data: Option<HrflowData>,
}

#[derive(Debug, Deserialize)]
struct HrflowData {
    profile: Option<HrflowProfile>,
    #[serde(default)]
    text: Option<String>,
}

/// Structured profile returned by HRFlow. Only the fields the scoring prompt uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HrflowProfile {
    pub info: ProfileInfo,
    pub text: Option<String>,
    pub skills: Vec<ProfileSkill>,
    pub experiences: Vec<ProfileExperience>,
    pub educations: Vec<ProfileEducation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileInfo {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSkill {
    pub name: String,
    #[serde(rename = "type")]
    pub skill_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileExperience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileEducation {
    pub title: Option<String>,
    pub school: Option<String>,
}

impl HrflowProfile {
    /// The raw profile text if HRFlow supplied one, otherwise a flattened
    /// rendering of the structured sections.
    pub fn full_text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return normalize_whitespace(text);
        }

        let mut sections: Vec<String> = Vec::new();
        if let Some(name) = &self.info.full_name {
            sections.push(name.clone());
        }
        if let Some(summary) = &self.info.summary {
            sections.push(summary.clone());
        }
        if !self.skills.is_empty() {
            let names: Vec<&str> = self.skills.iter().map(|s| s.name.as_str()).collect();
            sections.push(format!("Skills: {}", names.join(", ")));
        }
        for exp in &self.experiences {
            let header = [exp.title.as_deref(), exp.company.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" - ");
            let body = exp.description.as_deref().unwrap_or_default();
            sections.push(format!("{header}\n{body}"));
        }
        for edu in &self.educations {
            let line = [edu.title.as_deref(), edu.school.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" - ");
            sections.push(line);
        }

        normalize_whitespace(&sections.join("\n\n"))
    }
}

/// Production document parser backed by HRFlow.
pub struct HrflowParser {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<HrflowCredentials>,
}

impl HrflowParser {
    pub fn new(config: &HrflowConfig) -> Self {
        let credentials = config
            .credentials()
            .map(|(api_key, user_email, source_key)| HrflowCredentials {
                api_key: api_key.to_string(),
                user_email: user_email.to_string(),
                source_key: source_key.to_string(),
            });

        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    async fn upload(
        &self,
        file: &UploadedFile,
        kind: DocumentKind,
    ) -> Result<(Option<HrflowProfile>, Option<String>), ParseError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ParseError::MissingCredentials)?;
        let url = format!("{}{}", self.base_url, PARSING_ENDPOINT);

        let form = Form::new()
            .text("source_key", credentials.source_key.clone())
            .text("sync_parsing", "1")
            .part(
                "file",
                Part::bytes(file.bytes.to_vec())
                    .file_name(file.file_name.clone())
                    .mime_str(kind.mime_type())?,
            );

        info!(
            "Sending {} ({}) to HRFlow parsing",
            file.file_name,
            file.content_type.as_deref().unwrap_or(kind.mime_type())
        );

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &credentials.api_key)
            .header("X-USER-EMAIL", &credentials.user_email)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<HrflowEnvelope>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(ParseError::Hrflow {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: HrflowEnvelope = serde_json::from_str(&body).map_err(|e| {
            ParseError::Hrflow {
                status: status.as_u16(),
                message: format!("unexpected response body: {e}"),
            }
        })?;

        if let Some(code) = envelope.code.filter(|c| *c >= 400) {
            return Err(ParseError::Hrflow {
                status: code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        debug!("HRFlow parsed {}", file.file_name);
        Ok(match envelope.data {
            Some(data) => (data.profile, data.text),
            None => (None, None),
        })
    }
}

#[async_trait]
impl DocumentParser for HrflowParser {
    fn ensure_ready(&self) -> Result<(), ParseError> {
        if self.credentials.is_some() {
            Ok(())
        } else {
            Err(ParseError::MissingCredentials)
        }
    }

    async fn parse_file(&self, file: &UploadedFile) -> Result<ParsedDocument, ParseError> {
        if file.bytes.is_empty() {
            return Err(ParseError::EmptyFile(file.file_name.clone()));
        }
        let kind = DocumentKind::from_file_name(&file.file_name)?;

        if kind == DocumentKind::PlainText {
            return Ok(ParsedDocument {
                file_name: file.file_name.clone(),
                text: decode_plain_text(&file.bytes),
                profile: None,
            });
        }

        let (profile, parsing_text) = self.upload(file, kind).await?;

        let mut text = profile
            .as_ref()
            .map(HrflowProfile::full_text)
            .filter(|t| !t.is_empty())
            .or_else(|| parsing_text.map(|t| normalize_whitespace(&t)))
            .unwrap_or_default();

        if text.is_empty() && kind == DocumentKind::Pdf {
            warn!(
                "HRFlow returned no text for {}, falling back to local PDF extraction",
                file.file_name
            );
            text = extract_pdf_text(file.bytes.clone()).await?;
        }

        Ok(ParsedDocument {
            file_name: file.file_name.clone(),
            text,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn configured() -> HrflowParser {
        HrflowParser::new(&HrflowConfig {
            api_key: Some("askw_test".to_string()),
            user_email: Some("ops@example.com".to_string()),
            source_key: Some("source".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
        })
    }

    fn txt(name: &str, body: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_missing_credentials_not_ready() {
        let parser = HrflowParser::new(&HrflowConfig::default());
        assert!(matches!(
            parser.ensure_ready(),
            Err(ParseError::MissingCredentials)
        ));
        assert!(configured().ensure_ready().is_ok());
    }

    #[tokio::test]
    async fn test_parse_txt_twice_is_identical() {
        let parser = configured();
        let file = txt("offre.txt", "Mission Data  Engineer\n\n\nStack: Spark, Airflow");
        let first = parser.parse_file(&file).await.unwrap();
        let second = parser.parse_file(&file).await.unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.text, "Mission Data Engineer\n\nStack: Spark, Airflow");
        assert!(first.profile.is_none());
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let result = configured().parse_file(&txt("vide.txt", "")).await;
        assert!(matches!(result, Err(ParseError::EmptyFile(_))));
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_before_upload() {
        let result = configured().parse_file(&txt("cv.exe", "MZ")).await;
        assert!(matches!(result, Err(ParseError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_binary_upload_without_credentials_fails() {
        let parser = HrflowParser::new(&HrflowConfig::default());
        let result = parser.parse_file(&txt("cv.pdf", "%PDF-1.4")).await;
        assert!(matches!(result, Err(ParseError::MissingCredentials)));
    }

    #[test]
    fn test_profile_prefers_raw_text() {
        let profile = HrflowProfile {
            text: Some("  Jeanne Martin \n Data Engineer ".to_string()),
            skills: vec![ProfileSkill {
                name: "Spark".to_string(),
                skill_type: None,
            }],
            ..Default::default()
        };
        assert_eq!(profile.full_text(), "Jeanne Martin\nData Engineer");
    }

    #[test]
    fn test_profile_flattened_when_no_text() {
        let json = r#"{
            "info": {"full_name": "Jeanne Martin", "summary": "Data engineer, 8 ans"},
            "skills": [{"name": "Spark", "type": "hard"}, {"name": "Airflow"}],
            "experiences": [{"title": "Lead Data", "company": "Acme", "description": "Pipelines"}],
            "educations": [{"title": "MSc", "school": "EPITA"}]
        }"#;
        let profile: HrflowProfile = serde_json::from_str(json).unwrap();
        let text = profile.full_text();
        assert!(text.starts_with("Jeanne Martin"));
        assert!(text.contains("Skills: Spark, Airflow"));
        assert!(text.contains("Lead Data - Acme\nPipelines"));
        assert!(text.ends_with("MSc - EPITA"));
    }

    #[test]
    fn test_envelope_tolerates_missing_fields() {
        let envelope: HrflowEnvelope =
            serde_json::from_str(r#"{"code": 201, "message": "ok", "data": {"profile": {}}}"#)
                .unwrap();
        let profile = envelope.data.unwrap().profile.unwrap();
        assert!(profile.full_text().is_empty());
    }
}
