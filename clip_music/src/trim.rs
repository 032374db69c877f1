// Partition trimming: shrinking a sequence to a length budget.
//
// The input is cut into `p` equal contiguous partitions and each partition
// keeps only its head, so a shortened sequence still has `p` blocks in their
// original order instead of losing everything past the budget. The same
// routine trims rhythm patterns to a slot budget and note lists to the onset
// count of the trimmed pattern; both use the rhythm repeat count as `p` so
// repeated rhythm blocks stay aligned.

use crate::error::{ClipError, Result};
use crate::note::Note;
use crate::pattern::Pattern;

/// Keep the first `desired / partitions` elements of each of `partitions`
/// equal slices of `items`. Both divisions floor: any remainder past the
/// last full partition, and any tail of a partition beyond its share, is
/// dropped. A partition shorter than its share is kept whole.
pub fn trim_partitions<T: Clone>(items: &[T], desired: usize, partitions: usize) -> Result<Vec<T>> {
    if partitions == 0 {
        return Err(ClipError::ZeroPartitions);
    }
    let size = items.len() / partitions;
    let keep = (desired / partitions).min(size);
    let mut out = Vec::with_capacity(keep * partitions);
    for chunk in items.chunks_exact(size.max(1)).take(partitions) {
        out.extend_from_slice(&chunk[..keep]);
    }
    Ok(out)
}

/// Trim a pattern to `slots` markers.
pub fn trim_pattern(pattern: &Pattern, slots: usize, partitions: usize) -> Result<Pattern> {
    Ok(Pattern::new(trim_partitions(pattern.events(), slots, partitions)?))
}

/// Trim notes to the number of onsets in an already-trimmed pattern.
pub fn trim_notes(pattern: &Pattern, notes: &[Note], partitions: usize) -> Result<Vec<Note>> {
    trim_partitions(notes, pattern.onset_count(), partitions)
}
