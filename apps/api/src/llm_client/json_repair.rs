//! Best-effort recovery of a JSON object from free-form model output.
//!
//! Three extraction strategies produce candidate strings (fenced code block,
//! bare braces, balanced-brace scan). Each candidate is parsed verbatim, then
//! re-parsed after each cumulative cleanup stage until one succeeds.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("JSON could not be repaired: {0}")]
    Unrecoverable(String),

    #[error("JSON does not match the expected shape: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    FencedBlock,
    BareBraces,
    BalancedScan,
}

/// Cleanup stages, applied cumulatively in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    TrailingCommas = 1,
    LiteralNewlines = 2,
    UnquotedKeys = 3,
    ControlCharacters = 4,
}

impl RepairStage {
    pub const ALL: [RepairStage; 4] = [
        RepairStage::TrailingCommas,
        RepairStage::LiteralNewlines,
        RepairStage::UnquotedKeys,
        RepairStage::ControlCharacters,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    fn apply(self, input: &str) -> String {
        match self {
            RepairStage::TrailingCommas => strip_trailing_commas(input),
            RepairStage::LiteralNewlines => escape_literal_newlines(input),
            RepairStage::UnquotedKeys => quote_unquoted_keys(input),
            RepairStage::ControlCharacters => strip_control_characters(input),
        }
    }
}

/// A recovered JSON object and how it was obtained.
#[derive(Debug, Clone)]
pub struct Repaired {
    pub value: Value,
    pub strategy: ExtractionStrategy,
    /// `None` when the candidate parsed without any cleanup.
    pub stage: Option<RepairStage>,
}

/// Extracts and repairs the first JSON object found in `text`.
pub fn repair_json(text: &str) -> Result<Repaired, RepairError> {
    let candidates = extract_candidates(text);
    if candidates.is_empty() {
        return Err(RepairError::NoJsonFound);
    }

    let mut last_error = String::new();
    for (strategy, candidate) in candidates {
        match parse_object(&candidate) {
            Ok(value) => {
                return Ok(Repaired {
                    value,
                    strategy,
                    stage: None,
                })
            }
            Err(e) => last_error = e,
        }

        let mut current = candidate;
        for stage in RepairStage::ALL {
            let next = stage.apply(&current);
            if next == current {
                continue;
            }
            current = next;
            match parse_object(&current) {
                Ok(value) => {
                    return Ok(Repaired {
                        value,
                        strategy,
                        stage: Some(stage),
                    })
                }
                Err(e) => last_error = e,
            }
        }
    }

    Err(RepairError::Unrecoverable(last_error))
}

/// Repairs `text` and deserializes the recovered object into `T`.
pub fn repair_into<T: DeserializeOwned>(text: &str) -> Result<T, RepairError> {
    let repaired = repair_json(text)?;
    Ok(serde_json::from_value(repaired.value)?)
}

fn parse_object(candidate: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("top-level JSON value is not an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid regex"))
}

fn bare_braces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("valid regex"))
}

/// Candidates in strategy order, without duplicates.
fn extract_candidates(text: &str) -> Vec<(ExtractionStrategy, String)> {
    let mut candidates: Vec<(ExtractionStrategy, String)> = Vec::new();
    let mut push = |strategy, candidate: &str| {
        let candidate = candidate.trim();
        if candidate.contains('{') && !candidates.iter().any(|(_, c)| c == candidate) {
            candidates.push((strategy, candidate.to_string()));
        }
    };

    if let Some(inner) = fenced_block_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
    {
        push(ExtractionStrategy::FencedBlock, inner.as_str());
    }
    if let Some(m) = bare_braces_re().find(text) {
        push(ExtractionStrategy::BareBraces, m.as_str());
    }
    if let Some(block) = balanced_object(text) {
        push(ExtractionStrategy::BalancedScan, block);
    }

    candidates
}

/// Returns the first balanced `{...}` block, ignoring braces inside strings.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_trailing_commas(input: &str) -> String {
    trailing_comma_re().replace_all(input, "$1").into_owned()
}

fn escape_literal_newlines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Quotes bare identifiers that follow `{` or `,` and precede `:`.
/// Text inside string literals is left untouched.
fn quote_unquoted_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            i += 1;
            continue;
        }

        if expect_key && (c.is_ascii_alphabetic() || c == '_') {
            let end = chars[i..]
                .iter()
                .position(|ch| !(ch.is_ascii_alphanumeric() || matches!(*ch, '_' | '-')))
                .map_or(chars.len(), |offset| i + offset);
            let colon = chars[end..]
                .iter()
                .position(|ch| !ch.is_whitespace())
                .map(|offset| end + offset);
            if colon.is_some_and(|idx| chars[idx] == ':') {
                out.push('"');
                out.extend(&chars[i..end]);
                out.push('"');
                expect_key = false;
                i = end;
                continue;
            }
        }

        match c {
            '"' => {
                in_string = true;
                expect_key = false;
            }
            '{' | ',' => expect_key = true,
            _ if c.is_whitespace() => {}
            _ => expect_key = false,
        }
        out.push(c);
        i += 1;
    }
    out
}

fn strip_control_characters(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}
