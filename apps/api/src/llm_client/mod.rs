/// LLM Client — the single point of entry for all OpenAI API calls in the service.
///
/// ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
/// Chat completions (plain, JSON, streamed) and embeddings all go through here.
///
/// Models are hardcoded per purpose to prevent drift between routes.
use futures::StreamExt;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod json_repair;
pub mod prompts;
pub mod stream;

use json_repair::{repair_into, RepairError};
use stream::{SseLineDecoder, StreamItem};

/// Final candidate review. Streamed back to the browser token by token.
pub const REVIEW_MODEL: &str = "gpt-4o";
/// Cheaper model for structured extraction on the matching routes.
pub const ANALYSIS_MODEL: &str = "gpt-4o-mini";
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;
/// Embedding input is cut to this many characters.
const EMBEDDING_INPUT_CHARS: usize = 8000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM returned invalid JSON after {attempts} attempts: {source}")]
    InvalidJson {
        attempts: u32,
        #[source]
        source: RepairError,
    },
}

/// Per-call knobs. `Default` is the analysis model at temperature 0.2.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub model: &'static str,
    pub temperature: f32,
    pub json_mode: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            model: ANALYSIS_MODEL,
            temperature: 0.2,
            json_mode: false,
        }
    }
}

impl CallOptions {
    pub fn json(model: &'static str) -> Self {
        Self {
            model,
            json_mode: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatResponse {
    /// Extracts the text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// The single LLM client used by all services.
/// Wraps the OpenAI REST API with retry logic, JSON recovery and streaming helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// POSTs `body` to `path`, retrying on 429 (rate limit) and 5xx errors with
    /// exponential backoff. Returns the successful response unread.
    async fn post_with_retry<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("OpenAI API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OpenAiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Makes a raw Chat Completions call, returning the full response object.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        opts: CallOptions,
    ) -> Result<ChatResponse, LlmError> {
        let request = chat_request(prompt, system, opts, false);
        let response: ChatResponse = self
            .post_with_retry("/chat/completions", &request)
            .await?
            .json()
            .await?;

        if let Some(usage) = &response.usage {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                opts.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(response)
    }

    /// Calls the LLM and recovers a `T` from the text response.
    /// The prompt must instruct the model to return a JSON object.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        opts: CallOptions,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system, opts).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        repair_into(text).map_err(|source| LlmError::InvalidJson {
            attempts: 1,
            source,
        })
    }

    /// Like `call_json`, but re-prompts once with the parse error when the first
    /// answer cannot be recovered into a `T`.
    pub async fn call_validated_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        opts: CallOptions,
    ) -> Result<T, LlmError> {
        let first_error = match self.call_json(prompt, system, opts).await {
            Err(LlmError::InvalidJson { source, .. }) => source,
            other => return other,
        };

        warn!("LLM returned invalid JSON ({first_error}), re-prompting once");
        let retry_prompt = prompts::json_retry_prompt(prompt, &first_error.to_string());
        let response = self.call(&retry_prompt, system, opts).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;

        repair_into(text).map_err(|source| LlmError::InvalidJson {
            attempts: 2,
            source,
        })
    }

    /// Streams a Chat Completions answer, invoking `on_token` for every content
    /// delta as it arrives. Returns the accumulated text.
    pub async fn call_stream<F>(
        &self,
        prompt: &str,
        system: &str,
        opts: CallOptions,
        mut on_token: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str) + Send,
    {
        let request = chat_request(prompt, system, opts, true);
        let response = self.post_with_retry("/chat/completions", &request).await?;

        let mut body = response.bytes_stream();
        let mut decoder = SseLineDecoder::new();
        let mut accumulated = String::new();

        'outer: while let Some(chunk) = body.next().await {
            for item in decoder.feed(&chunk?) {
                match item {
                    StreamItem::Token(token) => {
                        on_token(&token);
                        accumulated.push_str(&token);
                    }
                    StreamItem::Done => break 'outer,
                }
            }
        }
        if let Some(StreamItem::Token(token)) = decoder.finish() {
            on_token(&token);
            accumulated.push_str(&token);
        }

        if accumulated.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        debug!(
            "LLM stream finished: model={}, {} chars",
            opts.model,
            accumulated.len()
        );
        Ok(accumulated)
    }

    /// Returns the embedding vector for `text`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let input = truncate_chars(text, EMBEDDING_INPUT_CHARS);
        let request = EmbeddingRequest {
            model: EMBEDDING_MODEL,
            input,
        };
        let response: EmbeddingResponse = self
            .post_with_retry("/embeddings", &request)
            .await?
            .json()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

fn chat_request<'a>(
    prompt: &'a str,
    system: &'a str,
    opts: CallOptions,
    stream: bool,
) -> ChatRequest<'a> {
    ChatRequest {
        model: opts.model,
        max_tokens: MAX_TOKENS,
        temperature: opts.temperature,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        response_format: opts.json_mode.then_some(ResponseFormat {
            format_type: "json_object",
        }),
        stream,
    }
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{http::header, routing::post, Router};
    use serde_json::json;

    /// Serves `bodies` in order from a local `/chat/completions`, repeating the last one.
    /// Returns the base URL and the request counter.
    async fn stub_openai(
        content_type: &'static str,
        bodies: Vec<String>,
    ) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(bodies);
        let counter = hits.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                let bodies = bodies.clone();
                async move {
                    let i = counter.fetch_add(1, Ordering::SeqCst);
                    let body = bodies[i.min(bodies.len() - 1)].clone();
                    ([(header::CONTENT_TYPE, content_type)], body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn completion(content: &str) -> String {
        json!({
            "choices": [{ "message": { "content": content } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })
        .to_string()
    }

    #[derive(Debug, Deserialize)]
    struct Score {
        final_score: u32,
    }

    #[test]
    fn test_chat_request_json_mode_sets_response_format() {
        let request = chat_request("p", "s", CallOptions::json(REVIEW_MODEL), false);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "p");
        assert!(value.get("stream").is_none());
    }

    #[test]
    fn test_chat_request_stream_flag_serialized() {
        let request = chat_request("p", "s", CallOptions::default(), true);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], true);
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_response_text_skips_blank_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"  "}}],"usage":null}"#,
        )
        .unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("éléphant", 3), "élé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = LlmClient::new("k".to_string(), "http://localhost:9999/v1/".to_string());
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    #[tokio::test]
    async fn test_validated_json_reprompts_once_then_succeeds() {
        let (base_url, hits) = stub_openai(
            "application/json",
            vec![
                completion("Je ne peux pas noter ce profil."),
                completion("{\"final_score\": 7}"),
            ],
        )
        .await;
        let client = LlmClient::new("sk-test".to_string(), base_url);

        let score: Score = client
            .call_validated_json("Note ce CV", "system", CallOptions::json(ANALYSIS_MODEL))
            .await
            .unwrap();

        assert_eq!(score.final_score, 7);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validated_json_gives_up_after_second_failure() {
        let (base_url, hits) =
            stub_openai("application/json", vec![completion("pas de JSON ici")]).await;
        let client = LlmClient::new("sk-test".to_string(), base_url);

        let result: Result<Score, _> = client
            .call_validated_json("Note ce CV", "system", CallOptions::json(ANALYSIS_MODEL))
            .await;

        assert!(matches!(
            result,
            Err(LlmError::InvalidJson { attempts: 2, .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_call_stream_forwards_tokens_and_accumulates() {
        let frame = |content: &str| {
            format!(
                "data: {}\n\n",
                json!({ "choices": [{ "delta": { "content": content } }] })
            )
        };
        let body = format!(
            "{}{}{}data: [DONE]\n\n",
            frame("{\"final_"),
            frame("score\": "),
            frame("81}")
        );
        let (base_url, hits) = stub_openai("text/event-stream", vec![body]).await;
        let client = LlmClient::new("sk-test".to_string(), base_url);

        let mut tokens: Vec<String> = Vec::new();
        let text = client
            .call_stream("Revue", "system", CallOptions::json(REVIEW_MODEL), |token| {
                tokens.push(token.to_string())
            })
            .await
            .unwrap();

        assert_eq!(tokens, vec!["{\"final_", "score\": ", "81}"]);
        assert_eq!(text, "{\"final_score\": 81}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
