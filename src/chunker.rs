use anyhow::anyhow;

use crate::ir::TranslationUnit;

/// Documented default for `max_tokens_per_chunk`.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 100_000;

/// A contiguous, non-empty sub-slice of the document's translation units,
/// consumed once by a chunk-processing attempt.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    pub units: &'a [TranslationUnit],
}

impl Chunk<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.units.iter().map(estimate_tokens).sum()
    }
}

/// Cheap character-count proxy for LLM input size: ceil(chars / 4).
/// Deliberately approximate; not a real tokenizer.
#[must_use]
pub fn estimate_tokens(unit: &TranslationUnit) -> usize {
    (unit.source.len() + unit.target.len()).div_ceil(4)
}

/// Splits `units` into contiguous chunks whose estimated token totals stay
/// within `max_tokens_per_chunk`.
///
/// A chunk is only closed when it already holds at least one unit, so a single
/// unit whose estimate alone exceeds the budget still lands alone in its own
/// chunk rather than being split or dropped. Empty input yields no chunks.
pub fn chunk_units(
    units: &[TranslationUnit],
    max_tokens_per_chunk: usize,
) -> anyhow::Result<Vec<Chunk<'_>>> {
    if max_tokens_per_chunk == 0 {
        return Err(anyhow!("max_tokens_per_chunk must be positive"));
    }

    let mut chunks: Vec<Chunk<'_>> = Vec::new();
    let mut start = 0usize;
    let mut running = 0usize;

    for (idx, unit) in units.iter().enumerate() {
        let cost = estimate_tokens(unit);
        if running + cost > max_tokens_per_chunk && idx > start {
            chunks.push(Chunk {
                units: &units[start..idx],
            });
            start = idx;
            running = 0;
        }
        running += cost;
    }
    if start < units.len() {
        chunks.push(Chunk {
            units: &units[start..],
        });
    }

    Ok(chunks)
}
