//! AI Response Validation
//!
//! Turns raw model text into typed pipeline values:
//! - JSON array extraction from fenced or chatty responses
//! - Per-card validation with field aliases and type coercion
//! - Review verdict parsing
//!
//! ## Design Philosophy
//! - Fail the request on unparseable output (retried upstream)
//! - Drop individual malformed cards, keep the rest

mod card;
mod json_repair;
mod verdict;

pub use card::{validate_card, validate_cards};
pub use json_repair::{ArrayExtractor, extract_json_array};
pub use verdict::parse_verdicts;

use std::collections::HashSet;

use crate::types::{CandidateCard, Result, SourceUnit};

/// Parse a generation response into validated cards
///
/// Returns `ForgeError::Parse` when no JSON array can be recovered. Cards that
/// fail validation are dropped; an empty result is not an error.
pub fn parse_cards(
    raw_response: &str,
    units: &[SourceUnit],
    category: &str,
    context: &str,
) -> Result<Vec<CandidateCard>> {
    let items = extract_json_array(raw_response, context)?;
    let valid_indices: HashSet<u32> = units.iter().map(|u| u.index).collect();
    Ok(validate_cards(&items, category, &valid_indices, context))
}
