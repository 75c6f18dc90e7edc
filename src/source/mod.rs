//! Source unit suppliers
//!
//! Turn an input document into indexed [`SourceUnit`]s. Text files split on
//! form-feed page breaks (what `pdftotext` emits); JSON files carry the units
//! directly.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{ForgeError, Result, SourceUnit};

const PAGE_BREAK: char = '\x0c';

pub trait SourceSupplier {
    fn units(&self) -> Result<Vec<SourceUnit>>;
}

/// Plain text, one unit per form-feed separated page
///
/// Pages are numbered from 1 in file order. Blank pages are skipped but
/// still consume their number, so unit indices match page numbers.
pub struct TextFileSupplier {
    path: PathBuf,
}

impl TextFileSupplier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceSupplier for TextFileSupplier {
    fn units(&self) -> Result<Vec<SourceUnit>> {
        let content = fs::read_to_string(&self.path)?;
        let units = split_pages(&content);
        debug!("{}: {} pages", self.path.display(), units.len());
        Ok(units)
    }
}

pub fn split_pages(content: &str) -> Vec<SourceUnit> {
    content
        .split(PAGE_BREAK)
        .enumerate()
        .filter_map(|(i, page)| {
            let text = page.trim();
            (!text.is_empty()).then(|| SourceUnit::new(i as u32 + 1, text))
        })
        .collect()
}

/// JSON array of `{"index": n, "text": "..."}` objects
pub struct JsonUnitsSupplier {
    path: PathBuf,
}

#[derive(Deserialize)]
struct RawUnit {
    index: u32,
    text: String,
}

impl JsonUnitsSupplier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceSupplier for JsonUnitsSupplier {
    fn units(&self) -> Result<Vec<SourceUnit>> {
        let content = fs::read_to_string(&self.path)?;
        parse_units(&content)
    }
}

/// Units from a JSON document, rejecting duplicate indices
pub fn parse_units(content: &str) -> Result<Vec<SourceUnit>> {
    let raw: Vec<RawUnit> = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    let mut units = Vec::with_capacity(raw.len());
    for unit in raw {
        if !seen.insert(unit.index) {
            return Err(ForgeError::InvalidInput(format!(
                "duplicate unit index {}",
                unit.index
            )));
        }
        if unit.text.trim().is_empty() {
            continue;
        }
        units.push(SourceUnit::new(unit.index, unit.text));
    }
    Ok(units)
}

/// Supplier chosen by file extension: `.json` reads units, anything else is text
pub fn supplier_for(path: &Path) -> Box<dyn SourceSupplier> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Box::new(JsonUnitsSupplier::new(path))
    } else {
        Box::new(TextFileSupplier::new(path))
    }
}
