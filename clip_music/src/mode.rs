// Scale resolution: turning a named scale and a pitch range into a palette.
//
// The generation core treats palettes as opaque input. This module is the
// built-in resolver the `generate` binary uses to produce them: each scale is
// an interval pattern from its tonic, and a `ScaleInstance` pins that pattern
// to a tonic pitch class. Palettes are either every in-scale pitch in a range
// (for melodies) or the diatonic triads rooted on those pitches (for chordal
// material).

use crate::error::{ClipError, Result};
use crate::note::{Note, Palette, Pitch};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named scales, each defined by its interval pattern from the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    NaturalMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    MajorPentatonic,
    MinorPentatonic,
    Chromatic,
}

impl Scale {
    /// Semitone offsets from the tonic for each scale degree.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::NaturalMinor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::MajorPentatonic => &[0, 2, 4, 7, 9],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
            Scale::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    /// The 12 pitch classes that are in the scale, relative to the tonic.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }
}

impl FromStr for Scale {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "major" | "ionian" => Ok(Scale::Major),
            "minor" | "natural_minor" | "aeolian" => Ok(Scale::NaturalMinor),
            "dorian" => Ok(Scale::Dorian),
            "phrygian" => Ok(Scale::Phrygian),
            "lydian" => Ok(Scale::Lydian),
            "mixolydian" => Ok(Scale::Mixolydian),
            "major_pentatonic" | "pentatonic" => Ok(Scale::MajorPentatonic),
            "minor_pentatonic" => Ok(Scale::MinorPentatonic),
            "chromatic" => Ok(Scale::Chromatic),
            other => Err(ClipError::InvalidConfig(format!("unknown scale '{other}'"))),
        }
    }
}

/// A scale pinned to a tonic pitch class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleInstance {
    pub scale: Scale,
    /// Pitch class of the tonic (0 = C, 2 = D, ...).
    pub tonic_pc: u8,
}

impl ScaleInstance {
    pub fn new(scale: Scale, tonic_pc: u8) -> Self {
        ScaleInstance {
            scale,
            tonic_pc: tonic_pc % 12,
        }
    }

    pub fn is_in_scale(&self, pitch: Pitch) -> bool {
        let pc = (pitch % 12 + 12 - self.tonic_pc) % 12;
        self.scale.pitch_classes()[pc as usize]
    }

    /// All in-scale pitches in `[low, high]`, ascending.
    pub fn pitches_in_range(&self, low: Pitch, high: Pitch) -> Vec<Pitch> {
        (low..=high.min(127)).filter(|&p| self.is_in_scale(p)).collect()
    }

    /// The in-scale pitch `steps` scale degrees above `pitch`, if one exists
    /// below MIDI 128. `pitch` must itself be in the scale.
    pub fn step_up(&self, pitch: Pitch, steps: usize) -> Option<Pitch> {
        (pitch..=127).filter(|&p| self.is_in_scale(p)).nth(steps)
    }
}

impl Palette {
    /// Single-note palette of every in-scale pitch between `low` and `high`.
    pub fn from_scale(scale: &ScaleInstance, low: Pitch, high: Pitch) -> Self {
        Palette::from_pitches(scale.pitches_in_range(low, high))
    }

    /// Diatonic triads (root, third, fifth stacked in scale steps) rooted on
    /// every in-scale pitch between `low` and `high`. Roots whose fifth
    /// would leave the MIDI range are skipped.
    pub fn triads(scale: &ScaleInstance, low: Pitch, high: Pitch) -> Self {
        let entries = scale
            .pitches_in_range(low, high)
            .into_iter()
            .filter_map(|root| {
                let third = scale.step_up(root, 2)?;
                let fifth = scale.step_up(root, 4)?;
                Some(Note::chord([root, third, fifth]))
            })
            .collect();
        Palette::new(entries)
    }
}

/// Parse a pitch-class name such as "C", "f#", "Bb" into 0-11.
pub fn parse_pitch_class(name: &str) -> Result<u8> {
    let name = name.trim();
    let mut chars = name.chars();
    let base = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(ClipError::InvalidConfig(format!("unknown tonic '{name}'"))),
    };
    let offset: i8 = match chars.as_str() {
        "" => 0,
        "#" | "s" | "is" => 1,
        "b" | "es" => -1,
        _ => return Err(ClipError::InvalidConfig(format!("unknown tonic '{name}'"))),
    };
    Ok(((base as i8 + offset + 12) % 12) as u8)
}
