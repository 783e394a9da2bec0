//! Incremental decoder for the OpenAI streaming Chat Completions body.
//!
//! The upstream body is itself an SSE stream: `data: {chunk}\n\n` lines ending
//! with `data: [DONE]`. Network chunks can split a line anywhere, so bytes are
//! buffered until a newline arrives.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// One decoded item from the upstream stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Token(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns every complete item they finish.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamItem> {
        self.buffer.extend_from_slice(bytes);
        let mut items = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(item) = decode_line(line.trim_end_matches(['\r', '\n'])) {
                items.push(item);
            }
        }
        items
    }

    /// Decodes whatever is left once the body has ended without a newline.
    pub fn finish(&mut self) -> Option<StreamItem> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        decode_line(String::from_utf8_lossy(&rest).trim())
    }
}

fn decode_line(line: &str) -> Option<StreamItem> {
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload == "[DONE]" {
        return Some(StreamItem::Done);
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!("Skipping undecodable stream chunk: {e}");
            return None;
        }
    };

    let content: String = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();

    if content.is_empty() {
        None
    } else {
        Some(StreamItem::Token(content))
    }
}
