//! Source unit chunking

use crate::types::SourceUnit;

/// Contiguous batch of source units sent in one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub units: Vec<SourceUnit>,
}

impl Chunk {
    pub fn char_count(&self) -> usize {
        self.units.iter().map(SourceUnit::char_count).sum()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// First and last unit index, for log lines
    pub fn span(&self) -> Option<(u32, u32)> {
        Some((self.units.first()?.index, self.units.last()?.index))
    }
}

/// Split units into groups of `chunk_size`, merging short groups backward
///
/// Any group after the first whose character total is below
/// `min_chunk_chars` is appended to the previous chunk. Order is preserved and
/// every unit appears exactly once.
pub fn chunk_units(units: &[SourceUnit], chunk_size: usize, min_chunk_chars: usize) -> Vec<Chunk> {
    if units.is_empty() {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    if units.len() <= chunk_size {
        return vec![Chunk {
            units: units.to_vec(),
        }];
    }

    let mut chunks: Vec<Chunk> = Vec::with_capacity(units.len().div_ceil(chunk_size));
    for group in units.chunks(chunk_size) {
        let group = Chunk {
            units: group.to_vec(),
        };

        match chunks.last_mut() {
            Some(previous) if group.char_count() < min_chunk_chars => {
                previous.units.extend(group.units);
            }
            _ => chunks.push(group),
        }
    }

    chunks
}
