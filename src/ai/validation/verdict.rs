//! Review verdict parsing

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::types::{ReviewVerdict, coerce_index, coerce_text, json_field};

const FAIL_VERDICTS: &[&str] = &["fail", "remove", "reject"];
const DEFAULT_REASON: &str = "no reason given";

/// Map reviewer output to verdicts keyed by card position
///
/// Entries without a usable index, or with an index outside `0..card_count`,
/// are ignored. When an index repeats, the first entry wins.
pub fn parse_verdicts(items: &[Value], card_count: usize) -> HashMap<usize, ReviewVerdict> {
    let mut verdicts = HashMap::new();

    for item in items {
        let Some(index) = json_field(item, &["index", "card_index"])
            .and_then(coerce_index)
            .map(|i| i as usize)
            .filter(|i| *i < card_count)
        else {
            debug!("Ignoring verdict without a valid index: {}", item);
            continue;
        };

        verdicts.entry(index).or_insert_with(|| verdict_of(item));
    }

    verdicts
}

fn verdict_of(item: &Value) -> ReviewVerdict {
    let verdict = json_field(item, &["verdict"])
        .and_then(Value::as_str)
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if FAIL_VERDICTS.contains(&verdict.as_str()) {
        let reason = json_field(item, &["reason"])
            .and_then(coerce_text)
            .unwrap_or_else(|| DEFAULT_REASON.to_string());
        ReviewVerdict::Fail { reason }
    } else {
        ReviewVerdict::Pass
    }
}
