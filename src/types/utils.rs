//! Shared helpers for loosely-typed model output.

use serde_json::Value;

// =============================================================================
// JSON Coercion
// =============================================================================

/// First present key among aliases.
#[inline]
pub fn json_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value.get(*k))
}

/// Coerce a scalar into trimmed text. Strings and numbers are accepted.
pub fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Coerce a non-negative integer, an integral float, or a numeric string.
pub fn coerce_index(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                return u32::try_from(i).ok();
            }
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Tags as an array of strings or a comma-separated string.
pub fn coerce_tags(value: &Value) -> Option<Vec<String>> {
    let tags: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(coerce_text).collect(),
        Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => return None,
    };
    (!tags.is_empty()).then_some(tags)
}

/// Booleans, plus the "true"/"false" strings models sometimes emit.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// =============================================================================
// String Utilities
// =============================================================================

/// Truncate to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Dedupe key for card fronts: lowercase with whitespace collapsed.
pub fn front_key(front: &str) -> String {
    front
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
