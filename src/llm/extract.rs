//! Tolerant JSON extraction from chat completions.
//!
//! Models wrap JSON in ```json fences, use typographic quotes, or add prose
//! around the payload. Candidates are tried in a fixed order:
//!
//! 1. the body of the first fenced code block, if any;
//! 2. the whole completion;
//! 3. the span between the first opening and last closing delimiter.
//!
//! Every candidate is quote-normalized first. The first one that parses wins.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::ExtractError;

/// Decode bytes as UTF-8, dropping invalid sequences.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{FFFD}', "")
}

/// Replace curly double quotes with `"`. Single quotes are left alone since
/// they show up as apostrophes inside titles.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            other => other,
        })
        .collect()
}

/// Body of the first fenced code block (```json, ```python or bare ```).
pub fn fenced_block(text: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").unwrap());
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn candidates(text: &str, open: char, close: char) -> Vec<String> {
    let mut out = Vec::with_capacity(3);
    if let Some(body) = fenced_block(text) {
        out.push(normalize_quotes(body.trim()));
    }
    out.push(normalize_quotes(text.trim()));
    if let Some(span) = delimited(text, open, close) {
        out.push(normalize_quotes(span));
    }
    out
}

fn parse_with<T: DeserializeOwned>(text: &str, open: char, close: char) -> Result<T, ExtractError> {
    let mut last_err = None;
    for candidate in candidates(text, open, close) {
        match serde_json::from_str::<T>(&candidate) {
            Ok(v) => return Ok(v),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(ExtractError::NotJson(e)),
        None => Err(ExtractError::Shape("empty completion".to_string())),
    }
}

/// Parse a JSON object (e.g. the `{"data": [...]}` envelope) into `T`.
pub fn parse_object<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    parse_with(text, '{', '}')
}

/// Parse a JSON array whose items are rendered as strings.
pub fn parse_string_array(text: &str) -> Result<Vec<String>, ExtractError> {
    let values: Vec<Value> = parse_with(text, '[', ']')?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Last-resort list reading: drop brackets and quotes, split on commas.
pub fn split_loose_list(text: &str) -> Vec<String> {
    normalize_quotes(text)
        .replace(|c: char| matches!(c, '[' | ']' | '"'), "")
        .split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Envelope {
        data: Vec<Value>,
    }

    #[test]
    fn unfenced_array() {
        assert_eq!(parse_string_array(r#"["cat", "box"]"#).unwrap(), ["cat", "box"]);
    }

    #[test]
    fn fenced_json_array() {
        let text = "```json\n[\"cat\", \"box\"]\n```";
        assert_eq!(parse_string_array(text).unwrap(), ["cat", "box"]);
    }

    #[test]
    fn fenced_python_array() {
        let text = "```python\n[\"story\"]\n```";
        assert_eq!(parse_string_array(text).unwrap(), ["story"]);
    }

    #[test]
    fn smart_quoted_array() {
        let text = "[\u{201C}Spotify\u{201D}, \u{201C}Apple\u{201D}]";
        assert_eq!(parse_string_array(text).unwrap(), ["Spotify", "Apple"]);
    }

    #[test]
    fn apostrophes_survive() {
        let text = "{\u{201C}data\u{201D}: [{\"Title\": \"Tuna\u{2019}s Radio\"}]}";
        let env: Envelope = parse_object(text).unwrap();
        assert_eq!(env.data[0]["Title"], "Tuna\u{2019}s Radio");
        assert_eq!(normalize_quotes("\u{2018}hi\u{2019}"), "\u{2018}hi\u{2019}");
    }

    #[test]
    fn array_inside_prose() {
        let text = "Here you go: [\"Netflix\"] hope that helps";
        assert_eq!(parse_string_array(text).unwrap(), ["Netflix"]);
    }

    #[test]
    fn non_string_items_are_stringified() {
        assert_eq!(parse_string_array("[1, \"a\"]").unwrap(), ["1", "a"]);
    }

    #[test]
    fn fenced_envelope() {
        let text = "Sure!\n```json\n{\"data\": [{\"Title\": \"A\", \"Subtitle\": \"B\"}]}\n```";
        let env: Envelope = parse_object(text).unwrap();
        assert_eq!(env.data.len(), 1);
    }

    #[test]
    fn garbage_is_not_json() {
        assert!(matches!(parse_string_array("no list here"), Err(ExtractError::NotJson(_))));
    }

    #[test]
    fn loose_list_fallback() {
        assert_eq!(split_loose_list("[Apple, \"Sherwin\",  ]"), ["Apple", "Sherwin"]);
    }

    #[test]
    fn lossy_decode_drops_invalid_bytes() {
        assert_eq!(decode_lossy(b"ab\xffc"), "abc");
    }
}
