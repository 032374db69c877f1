// Direction-preserving note alteration.
//
// Picks random positions in a note sequence and swaps each for another
// palette entry that keeps the local melodic shape: a peak stays above both
// neighbors, a trough stays below both, and a passing note stays strictly
// between them. Pitch order is the palette's index order. Every
// substitution reads its neighbors from the untouched input, so edits within
// one call never influence each other.
//
// Positions are sampled without replacement: a call with `count`
// substitutions rewrites `min(count, len)` distinct positions.

use crate::error::{ClipError, Result};
use crate::note::{Note, Palette};
use rand::Rng;
use rand::seq::index;
use std::ops::Range;
use tracing::debug;

/// Shape of a note relative to its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contour {
    Peak,
    Trough,
    Passing,
}

/// Classify palette index `current` against its neighbors' indices.
pub fn classify(left: usize, current: usize, right: usize) -> Contour {
    if current > left && current > right {
        Contour::Peak
    } else if current < left && current < right {
        Contour::Trough
    } else {
        Contour::Passing
    }
}

/// Palette indices a replacement may take while keeping `shape`.
/// May be empty for passing notes whose neighbors are adjacent or equal.
pub fn eligible_range(
    shape: Contour,
    left: usize,
    right: usize,
    palette_len: usize,
) -> Range<usize> {
    let low = left.min(right);
    let high = left.max(right);
    match shape {
        Contour::Peak => high + 1..palette_len,
        Contour::Trough => 0..low,
        Contour::Passing => low + 1..high,
    }
}

/// Return a copy of `notes` with up to `count` shape-preserving
/// substitutions drawn from `palette`.
///
/// A boundary note uses itself as its missing neighbor. When a position has
/// no eligible replacement it is left unchanged. Every note must appear in
/// the palette.
pub fn alter_notes(
    notes: &[Note],
    palette: &Palette,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Note>> {
    let mut out = notes.to_vec();
    if count == 0 || notes.is_empty() {
        return Ok(out);
    }
    let indices = notes
        .iter()
        .enumerate()
        .map(|(position, note)| {
            palette
                .index_of(note)
                .ok_or(ClipError::NoteNotInPalette { position })
        })
        .collect::<Result<Vec<usize>>>()?;

    let last = notes.len() - 1;
    for position in index::sample(rng, notes.len(), count.min(notes.len())) {
        let left = indices[position.saturating_sub(1)];
        let current = indices[position];
        let right = indices[(position + 1).min(last)];
        let shape = classify(left, current, right);
        let range = eligible_range(shape, left, right, palette.len());
        if range.is_empty() {
            debug!(position, ?shape, left, current, right, "no eligible replacement");
            continue;
        }
        let replacement = rng.random_range(range);
        debug!(position, ?shape, from = current, to = replacement, "note altered");
        out[position] = palette.entries()[replacement].clone();
    }
    Ok(out)
}
