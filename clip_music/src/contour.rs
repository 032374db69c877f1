// Sine-contour note mapping.
//
// A driving sequence feeds increments into an accumulator `x`; at every step
// the contour `sin(pi * x) + 1` (range [0, 2]) is split into `len - 1` equal
// bands and rounded onto a palette index. The band ratio is rounded to 10
// decimal places first so floating-point noise around a half-way tie cannot
// flip the chosen index. When the step from the previous index is wider than
// the allowed maximum, the jump is replaced by a random offset in [1, max) in
// the same direction. Replacements are cached by the raw difference, so
// within one run the same jump shape is always corrected the same way.
//
// Both the driving sequence and the mapper are pull-based: callers ask for
// one value at a time and all state lives in the structs.

use crate::error::{ClipError, Result};
use crate::note::{Note, Palette};
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

/// Decimal digits kept before rounding a contour value onto an index.
const INDEX_PRECISION: f64 = 1e10;

/// An unbounded producer of accumulator increments.
pub trait DrivingSequence {
    fn next_increment(&mut self) -> f64;
}

impl<D: DrivingSequence + ?Sized> DrivingSequence for &mut D {
    fn next_increment(&mut self) -> f64 {
        (**self).next_increment()
    }
}

impl<D: DrivingSequence + ?Sized> DrivingSequence for Box<D> {
    fn next_increment(&mut self) -> f64 {
        (**self).next_increment()
    }
}

/// The same increment forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl DrivingSequence for Constant {
    fn next_increment(&mut self) -> f64 {
        self.0
    }
}

/// Repeats a fixed, non-empty list of increments.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    values: Vec<f64>,
    pos: usize,
}

impl Cycle {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ClipError::InvalidConfig(
                "cyclic driving sequence needs at least one value".into(),
            ));
        }
        Ok(Cycle { values, pos: 0 })
    }
}

impl DrivingSequence for Cycle {
    fn next_increment(&mut self) -> f64 {
        let v = self.values[self.pos];
        self.pos = (self.pos + 1) % self.values.len();
        v
    }
}

/// Adapter for closures, see [`from_fn`].
pub struct FromFn<F>(F);

/// Wrap a closure as a driving sequence.
pub fn from_fn<F: FnMut() -> f64>(f: F) -> FromFn<F> {
    FromFn(f)
}

impl<F: FnMut() -> f64> DrivingSequence for FromFn<F> {
    fn next_increment(&mut self) -> f64 {
        (self.0)()
    }
}

/// Palette index closest to the contour value at `x`, for a palette split
/// into bands of width `interval`.
pub fn contour_index(x: f64, interval: f64, palette_len: usize) -> usize {
    let y = (PI * x).sin() + 1.0;
    let ratio = (y / interval * INDEX_PRECISION).round() / INDEX_PRECISION;
    let index = ratio.round_ties_even().max(0.0) as usize;
    index.min(palette_len - 1)
}

/// Pull-based contour walker over a palette.
pub struct ContourMapper<'a, D> {
    palette: &'a Palette,
    driving: D,
    max_distance: usize,
    interval: f64,
    x: f64,
    previous: Option<usize>,
    jump_cache: BTreeMap<i64, i64>,
}

impl<'a, D: DrivingSequence> ContourMapper<'a, D> {
    /// `max_distance` defaults to the palette length, which never triggers
    /// a jump correction. An explicit value below 2 leaves no room for a
    /// corrected offset and is rejected here, whether or not a later step
    /// would need one.
    pub fn new(palette: &'a Palette, driving: D, max_distance: Option<usize>) -> Result<Self> {
        if palette.len() < 2 {
            return Err(ClipError::PaletteTooSmall(palette.len()));
        }
        let max_distance = max_distance.unwrap_or(palette.len());
        if max_distance < 2 {
            return Err(ClipError::InvalidMaxDistance(max_distance));
        }
        Ok(ContourMapper {
            palette,
            driving,
            max_distance,
            interval: 2.0 / (palette.len() - 1) as f64,
            x: 0.0,
            previous: None,
            jump_cache: BTreeMap::new(),
        })
    }

    /// Start with pre-decided jump replacements, keyed by raw difference.
    pub fn with_jump_cache(mut self, cache: BTreeMap<i64, i64>) -> Self {
        self.jump_cache = cache;
        self
    }

    pub fn jump_cache(&self) -> &BTreeMap<i64, i64> {
        &self.jump_cache
    }

    /// Produce the next palette index and advance the accumulator.
    pub fn next_index(&mut self, rng: &mut impl Rng) -> usize {
        let raw = contour_index(self.x, self.interval, self.palette.len());
        let index = match self.previous {
            Some(prev) => {
                let diff = raw as i64 - prev as i64;
                if diff.unsigned_abs() as usize > self.max_distance {
                    let max = self.max_distance;
                    let offset = *self.jump_cache.entry(diff).or_insert_with(|| {
                        let magnitude = rng.random_range(1..max) as i64;
                        magnitude * diff.signum()
                    });
                    let corrected = (prev as i64 + offset).clamp(0, self.palette.len() as i64 - 1);
                    debug!(raw, prev, diff, offset, corrected, "contour jump corrected");
                    corrected as usize
                } else {
                    raw
                }
            }
            None => raw,
        };
        self.previous = Some(index);
        self.x += self.driving.next_increment();
        index
    }

    /// Produce the next palette entry.
    pub fn next_note(&mut self, rng: &mut impl Rng) -> &'a Note {
        let index = self.next_index(rng);
        &self.palette.entries()[index]
    }
}

/// Map `count` steps of a driving sequence onto palette entries.
pub fn map_contour<D: DrivingSequence>(
    palette: &Palette,
    driving: D,
    count: usize,
    max_distance: Option<usize>,
    rng: &mut impl Rng,
) -> Result<Vec<Note>> {
    let mut mapper = ContourMapper::new(palette, driving, max_distance)?;
    Ok((0..count).map(|_| mapper.next_note(rng).clone()).collect())
}

/// Like [`map_contour`] but returns palette indices.
pub fn map_contour_indices<D: DrivingSequence>(
    palette: &Palette,
    driving: D,
    count: usize,
    max_distance: Option<usize>,
    rng: &mut impl Rng,
) -> Result<Vec<usize>> {
    let mut mapper = ContourMapper::new(palette, driving, max_distance)?;
    Ok((0..count).map(|_| mapper.next_index(rng)).collect())
}
