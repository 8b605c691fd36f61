//! Tolerant JSON extraction from raw model output.
//!
//! Models wrap JSON in markdown fences, add prose around it, emit smart quotes,
//! or fall back to Python-style single quotes. [`extract`] tries a fixed
//! sequence of recoveries and stops at the first that parses. It never invents
//! content: if nothing parses, the caller gets an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

lazy_static! {
    static ref LEADING_FENCE: Regex = Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap();
    static ref TRAILING_FENCE: Regex = Regex::new(r"\r?\n?```\s*$").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model response was empty")]
    Empty,

    #[error("no JSON object could be recovered from model response: {0}")]
    Unrecoverable(String),
}

/// Extract a JSON value from raw model text.
///
/// Order of attempts:
/// 1. strip a surrounding code fence
/// 2. normalize BOM and typographic quotes
/// 3. parse directly
/// 4. parse the span between the first `{` and the last `}`
/// 5. swap unescaped single quotes for double quotes and parse that span once
pub fn extract(raw: &str) -> Result<Value, ParseError> {
    let cleaned = normalize_quotes(strip_code_fence(raw));
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let direct_err = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let span = object_span(cleaned);
    if let Some(span) = span {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    let repaired = replace_single_quotes(span.unwrap_or(cleaned));
    serde_json::from_str::<Value>(&repaired)
        .map_err(|_| ParseError::Unrecoverable(direct_err.to_string()))
}

/// Remove one leading and one trailing markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let start = LEADING_FENCE.find(trimmed).map(|m| m.end()).unwrap_or(0);
    let body = &trimmed[start..];
    let end = TRAILING_FENCE.find(body).map(|m| m.start()).unwrap_or(body.len());
    body[..end].trim()
}

/// Replace the byte-order mark and typographic quotes with ASCII equivalents.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\u{feff}')
        .map(|c| match c {
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect()
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Swap single quotes that are not preceded by a backslash.
fn replace_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for c in text.chars() {
        if c == '\'' && prev != Some('\\') {
            out.push('"');
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Whether curly braces outside string literals are balanced.
///
/// Tracks double-quoted strings and backslash escapes inside them. Used to
/// flag truncated streamed output before parsing; it never blocks parsing.
pub fn is_brace_balanced(text: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if c == '"' && !escaped {
            in_string = !in_string;
        }
        escaped = in_string && c == '\\' && !escaped;

        if !in_string {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
    }

    depth == 0
}

/// Pull the list stored under the first matching key.
///
/// A top-level array is accepted as-is. Missing keys or non-array values give
/// an empty list.
pub fn extract_list<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(items) = value {
        return items;
    }
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        assert_eq!(extract(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_json_matches_unwrapped_parse() {
        let body = r#"{"side_jobs": [{"title": "Cafe reels", "description": "Short videos"}]}"#;
        let fenced = format!("```json\n{}\n```", body);

        let direct: Value = serde_json::from_str(body).unwrap();
        assert_eq!(extract(&fenced).unwrap(), direct);
    }

    #[test]
    fn test_fence_without_language_tag() {
        assert_eq!(extract("```\n{\"a\": [1, 2]}\n```").unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_noise_around_object() {
        assert_eq!(
            extract(r#"noise before {"a":1} noise after"#).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_smart_quotes_and_bom() {
        let raw = "\u{feff}{\u{201c}title\u{201d}: \u{201c}Blog\u{201d}}";
        assert_eq!(extract(raw).unwrap(), json!({"title": "Blog"}));
    }

    #[test]
    fn test_single_quoted_keys_recovered() {
        let raw = "Here you go: {'result': [{'title': 'Vlog'}]}";
        assert_eq!(extract(raw).unwrap(), json!({"result": [{"title": "Vlog"}]}));
    }

    #[test]
    fn test_escaped_single_quote_is_kept() {
        assert_eq!(replace_single_quotes(r"{'a': 'it\'s'}"), r#"{"a": "it\'s"}"#);
    }

    #[test]
    fn test_unrecoverable_is_error() {
        assert!(matches!(
            extract("I cannot help with that."),
            Err(ParseError::Unrecoverable(_))
        ));
    }

    #[test]
    fn test_truncated_object_is_error() {
        assert!(extract(r#"{"result": [{"title": "a"}, {"title": "#).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(extract("   "), Err(ParseError::Empty));
        assert_eq!(extract("```json\n```"), Err(ParseError::Empty));
    }

    #[test]
    fn test_top_level_array_parses() {
        assert_eq!(extract("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_brace_balance() {
        assert!(is_brace_balanced(r#"{"a": {"b": 1}}"#));
        assert!(!is_brace_balanced(r#"{"a": {"b": 1}"#));
        assert!(!is_brace_balanced("}{"));
        assert!(is_brace_balanced(""));
    }

    #[test]
    fn test_brace_balance_ignores_braces_in_strings() {
        assert!(is_brace_balanced(r#"{"text": "a } b {"}"#));
        assert!(is_brace_balanced(r#"{"text": "quote \" then }"}"#));
        assert!(is_brace_balanced(r#"{"path": "C:\\"}"#));
    }

    #[test]
    fn test_extract_list_tries_keys_in_order() {
        let value = json!({"recommendations": [{"title": "x"}], "other": 1});
        assert_eq!(extract_list(&value, &["side_jobs", "recommendations"]).len(), 1);
        assert!(extract_list(&value, &["missions"]).is_empty());
        assert!(extract_list(&json!({"result": "nope"}), &["result"]).is_empty());
        assert_eq!(extract_list(&json!([1, 2, 3]), &["result"]).len(), 3);
    }
}
