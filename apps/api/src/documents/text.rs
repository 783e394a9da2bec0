//! Local text extraction: plain-text decoding and the PDF fallback.

use crate::documents::ParseError;

/// Decodes plain-text bytes (lossy UTF-8, BOM stripped) and normalises whitespace.
/// Deterministic: identical bytes always yield identical text.
pub fn decode_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    normalize_whitespace(&String::from_utf8_lossy(bytes))
}

/// Collapses horizontal whitespace runs, trims every line and keeps at most
/// one blank line between paragraphs.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }
    out
}

/// Extracts text from a PDF on the blocking pool. pdf-extract is CPU-bound.
pub async fn extract_pdf_text(bytes: bytes::Bytes) -> Result<String, ParseError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ParseError::Extraction(format!("PDF extraction task failed: {e}")))?
        .map_err(|e| ParseError::Extraction(e.to_string()))?;
    Ok(normalize_whitespace(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_text_is_deterministic() {
        let bytes = "Développeur Rust\r\n\r\n\r\nTJM : 650 €".as_bytes();
        let first = decode_plain_text(bytes);
        let second = decode_plain_text(bytes);
        assert_eq!(first, second);
        assert_eq!(first, "Développeur Rust\n\nTJM : 650 €");
    }

    #[test]
    fn test_bom_is_stripped() {
        assert_eq!(decode_plain_text(b"\xEF\xBB\xBFHello"), "Hello");
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        let text = decode_plain_text(b"abc \xFF def");
        assert!(text.starts_with("abc"));
        assert!(text.ends_with("def"));
    }

    #[test]
    fn test_normalize_collapses_inner_spaces() {
        assert_eq!(
            normalize_whitespace("  Senior\t\tData   Engineer  \nParis"),
            "Senior Data Engineer\nParis"
        );
    }

    #[test]
    fn test_normalize_whitespace_only_is_empty() {
        assert_eq!(normalize_whitespace(" \n \t\n"), "");
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_extraction_error() {
        let result = extract_pdf_text(bytes::Bytes::from_static(b"not a pdf")).await;
        assert!(matches!(result, Err(ParseError::Extraction(_))));
    }
}
