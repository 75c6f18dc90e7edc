//! JSON Array Extraction
//!
//! Pulls a JSON array out of a model response. Handles the usual LLM output
//! issues:
//! - Markdown code fence wrapping (```json ... ```)
//! - Explanatory text before or after the array
//! - Trailing commas before `]` or `}`
//! - A leading byte-order mark

use serde_json::Value;
use tracing::debug;

use crate::types::{ForgeError, Result, truncate_chars};

/// Characters of the response shown in parse errors
const PREVIEW_CHARS: usize = 200;

/// Extract and parse the JSON array in an LLM response
///
/// This is the primary entry point for card and verdict output. Any failure is
/// a `ForgeError::Parse`, which the chunk generator treats as retryable.
pub fn extract_json_array(content: &str, context: &str) -> Result<Vec<Value>> {
    ArrayExtractor::new(context).extract(content)
}

/// Array extraction with a fixed error context
pub struct ArrayExtractor<'a> {
    context: &'a str,
}

impl<'a> ArrayExtractor<'a> {
    pub fn new(context: &'a str) -> Self {
        Self { context }
    }

    pub fn extract(&self, raw: &str) -> Result<Vec<Value>> {
        let cleaned = self.preprocess(raw);

        let slice = self.array_slice(&cleaned).ok_or_else(|| {
            ForgeError::parse(
                self.context,
                format!(
                    "no JSON array in response: {}",
                    truncate_chars(&cleaned, PREVIEW_CHARS)
                ),
            )
        })?;

        let value = match serde_json::from_str::<Value>(slice) {
            Ok(value) => value,
            Err(_) => {
                debug!("Direct parse failed for {}, removing trailing commas", self.context);
                serde_json::from_str::<Value>(&fix_trailing_commas(slice))
                    .map_err(|e| ForgeError::parse(self.context, e.to_string()))?
            }
        };

        match value {
            Value::Array(items) => Ok(items),
            other => Err(ForgeError::parse(
                self.context,
                format!("expected a JSON array, got {}", json_kind(&other)),
            )),
        }
    }

    fn preprocess(&self, raw: &str) -> String {
        let s = raw.trim().trim_start_matches('\u{feff}');
        strip_code_fences(s).trim().to_string()
    }

    /// Slice between the first `[` and the last `]`
    fn array_slice<'s>(&self, s: &'s str) -> Option<&'s str> {
        let start = s.find('[')?;
        let end = s.rfind(']')?;
        (end > start).then(|| &s[start..=end])
    }
}

/// Strip markdown code fences, keeping the fenced body
fn strip_code_fences(s: &str) -> &str {
    let Some(open) = s.find("```") else {
        return s;
    };

    let after_open = &s[open + 3..];
    // Skip the language tag line (```json)
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };

    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Remove commas directly before `]` or `}` outside strings
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }

        result.push(ch);
    }

    result
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_array() {
        let items = extract_json_array(r#"[{"front": "Q"}]"#, "test").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["front"], "Q");
    }

    #[test]
    fn test_fenced_array() {
        let input = "Here you go:\n```json\n[{\"front\": \"Q\"}, {\"front\": \"R\"}]\n```\nDone.";
        let items = extract_json_array(input, "test").unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_surrounding_prose() {
        let input = "Cards below [ {\"front\": \"Q\"} ] hope this helps";
        assert_eq!(extract_json_array(input, "test").unwrap().len(), 1);
    }

    #[test]
    fn test_trailing_commas() {
        let input = r#"[{"front": "Q", "tags": ["a", "b",],},]"#;
        let items = extract_json_array(input, "test").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["tags"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_comma_inside_string_preserved() {
        let input = r#"[{"front": "a ,]", "back": "x",}]"#;
        let items = extract_json_array(input, "test").unwrap();
        assert_eq!(items[0]["front"], "a ,]");
    }

    #[test]
    fn test_empty_array() {
        assert!(extract_json_array("[]", "test").unwrap().is_empty());
    }

    #[test]
    fn test_no_array_is_parse_error() {
        let err = extract_json_array("I cannot help with that.", "chunk 2").unwrap_err();
        match err {
            ForgeError::Parse { context, .. } => assert_eq!(context, "chunk 2"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_broken_json_is_parse_error() {
        let err = extract_json_array(r#"[{"front": }]"#, "test").unwrap_err();
        assert!(err.is_retryable());
    }
}
