//! Card Validation
//!
//! Converts loosely-typed JSON objects from model output into
//! `CandidateCard`s. Each card is checked on its own: a malformed card is
//! dropped with a warning and never fails its batch.

use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

use crate::types::{
    CandidateCard, ValidationError, ValidationErrorKind, coerce_bool, coerce_index, coerce_tags,
    coerce_text, json_field,
};

const FRONT_KEYS: &[&str] = &["front"];
const BACK_KEYS: &[&str] = &["back"];
const EVIDENCE_KEYS: &[&str] = &["evidence"];
const INDEX_KEYS: &[&str] = &[
    "evidenceSourceIndex",
    "evidence_source_index",
    "evidence_page",
];
const TAG_KEYS: &[&str] = &["tags"];
const RECOMMENDED_KEYS: &[&str] = &["recommended", "recommend"];

/// Validate one card object
///
/// `valid_indices` holds the source unit indices the card may cite as evidence.
pub fn validate_card(
    value: &Value,
    category: &str,
    valid_indices: &HashSet<u32>,
) -> Result<CandidateCard, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::new(
            ValidationErrorKind::Shape,
            "card is not a JSON object",
        ));
    }

    let front = required_text(value, FRONT_KEYS)?;
    let back = required_text(value, BACK_KEYS)?;
    let evidence = required_text(value, EVIDENCE_KEYS)?;

    let raw_index = json_field(value, INDEX_KEYS)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::missing(INDEX_KEYS[0]))?;
    let index = coerce_index(raw_index).ok_or_else(|| {
        ValidationError::format(INDEX_KEYS[0], format!("not a unit index: {}", raw_index))
    })?;
    if !valid_indices.contains(&index) {
        return Err(ValidationError::new(
            ValidationErrorKind::Range,
            format!("unit {} is not part of this request", index),
        )
        .with_field(INDEX_KEYS[0]));
    }

    let mut card = CandidateCard::new(front, back, evidence, index, category);

    // Absent or unusable tags keep the category default
    if let Some(tags) = json_field(value, TAG_KEYS).and_then(coerce_tags) {
        card = card.with_tags(tags);
    }

    if let Some(recommended) = json_field(value, RECOMMENDED_KEYS).and_then(coerce_bool) {
        card = card.with_recommended(recommended);
    }

    Ok(card)
}

/// Validate a batch, dropping malformed cards individually
pub fn validate_cards(
    items: &[Value],
    category: &str,
    valid_indices: &HashSet<u32>,
    context: &str,
) -> Vec<CandidateCard> {
    let mut cards = Vec::with_capacity(items.len());

    for (position, item) in items.iter().enumerate() {
        match validate_card(item, category, valid_indices) {
            Ok(card) => cards.push(card),
            Err(e) => warn!("{}: dropping card #{}: {}", context, position, e),
        }
    }

    if cards.len() < items.len() {
        warn!(
            "{}: kept {} of {} cards after validation",
            context,
            cards.len(),
            items.len()
        );
    }

    cards
}

fn required_text(value: &Value, keys: &[&str]) -> Result<String, ValidationError> {
    let field = keys[0];
    match json_field(value, keys) {
        None | Some(Value::Null) => Err(ValidationError::missing(field)),
        Some(raw) => coerce_text(raw)
            .ok_or_else(|| ValidationError::format(field, "expected non-empty text")),
    }
}
