//! Hybrid preliminary scoring: keyword coverage plus embedding similarity.
//!
//! combined = round(100 × (0.4 × keyword_coverage + 0.6 × cosine(cv, job)))

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::llm_client::{LlmClient, LlmError};

const KEYWORD_WEIGHT: f32 = 0.4;
const EMBEDDING_WEIGHT: f32 = 0.6;
/// Job keywords considered for coverage, by descending frequency.
const MAX_JOB_KEYWORDS: usize = 40;

const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "our", "that", "the", "this", "to", "we", "will", "with",
    "you", "your", "years", "year", "experience", "team", "work", "must", "plus", "etc",
    // French
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "en", "et", "il", "la", "le",
    "les", "leur", "mais", "ou", "par", "pour", "sa", "se", "ses", "son", "sur", "un", "une",
    "vous", "nous", "est", "sont", "être", "avoir", "ans", "qui", "que", "pas",
    "mission", "poste", "profil", "équipe", "expérience", "client",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordOverlap {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    /// matched / (matched + missing), 0.0 when the job has no keywords.
    pub coverage: f32,
}

/// Preliminary score computed before the LLM review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridScore {
    pub keyword_score: f32,
    pub embedding_score: f32,
    /// 0 – 100
    pub combined_score: u32,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
}

impl HybridScore {
    pub fn combine(overlap: KeywordOverlap, embedding_score: f32) -> Self {
        let keyword_score = overlap.coverage.clamp(0.0, 1.0);
        let embedding_score = embedding_score.clamp(0.0, 1.0);
        let combined =
            (100.0 * (KEYWORD_WEIGHT * keyword_score + EMBEDDING_WEIGHT * embedding_score)).round();

        Self {
            keyword_score,
            embedding_score,
            combined_score: (combined as u32).min(100),
            matched_keywords: overlap.matched,
            missing_keywords: overlap.missing,
        }
    }
}

/// Computes the hybrid score. Both embeddings are requested concurrently.
pub async fn hybrid_score(
    llm: &LlmClient,
    cv_text: &str,
    job_text: &str,
) -> Result<HybridScore, LlmError> {
    let (cv_embedding, job_embedding) = tokio::try_join!(llm.embed(cv_text), llm.embed(job_text))?;
    let similarity = cosine_similarity(&cv_embedding, &job_embedding);
    Ok(HybridScore::combine(
        keyword_overlap(cv_text, job_text),
        similarity,
    ))
}

/// Cosine similarity clamped to 0..=1. Empty or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '-')))
        .map(|t| t.trim_matches(|c: char| c == '.' || c == '-').to_lowercase())
        .filter(|t| {
            t.chars().count() >= 2
                && !t.chars().all(|c| c.is_ascii_digit())
                && !STOP_WORDS.contains(&t.as_str())
        })
}

/// Distinct keywords of `text`, sorted for binary search.
pub fn extract_keywords(text: &str) -> Vec<String> {
    tokenize(text).collect::<BTreeSet<_>>().into_iter().collect()
}

/// The `limit` most frequent keywords, ties broken alphabetically.
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

pub fn keyword_overlap(cv_text: &str, job_text: &str) -> KeywordOverlap {
    let cv_keywords = extract_keywords(cv_text);
    let (matched, missing): (Vec<String>, Vec<String>) = top_keywords(job_text, MAX_JOB_KEYWORDS)
        .into_iter()
        .partition(|k| cv_keywords.binary_search(k).is_ok());

    let total = matched.len() + missing.len();
    let coverage = if total == 0 {
        0.0
    } else {
        matched.len() as f32 / total as f32
    };

    KeywordOverlap {
        matched,
        missing,
        coverage,
    }
}

/// Counts case-insensitive occurrences of `term` in `text` that are not
/// embedded in a longer word (`java` does not match `javascript`).
pub fn count_term(text: &str, term: &str) -> usize {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();
    let is_word = |c: char| c.is_alphanumeric();

    haystack
        .match_indices(&term)
        .filter(|(idx, _)| {
            let before = haystack[..*idx].chars().next_back();
            let after = haystack[idx + term.len()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .count()
}
