// Pitch, note and palette types.
//
// A note is either a single MIDI pitch or a chord (an unordered set of MIDI
// pitches). A palette is an ordered, read-only list of notes; generation picks
// entries from it by index and alteration uses the index order as the pitch
// order. Palettes come from outside the core (see mode.rs for the built-in
// scale resolver), so nothing here mutates one after construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// MIDI pitch number (0-127).
pub type Pitch = u8;

/// A single pitch or a chord.
///
/// Serialized untagged, so JSON palettes read naturally: `60` is a single
/// note and `[60, 64, 67]` is a chord.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Note {
    Single(Pitch),
    Chord(BTreeSet<Pitch>),
}

impl Note {
    /// Build a chord from any collection of pitches. Duplicates collapse.
    pub fn chord(pitches: impl IntoIterator<Item = Pitch>) -> Self {
        Note::Chord(pitches.into_iter().collect())
    }

    /// All sounding pitches, lowest first.
    pub fn pitches(&self) -> Vec<Pitch> {
        match self {
            Note::Single(p) => vec![*p],
            Note::Chord(set) => set.iter().copied().collect(),
        }
    }

    pub fn is_chord(&self) -> bool {
        matches!(self, Note::Chord(_))
    }
}

impl From<Pitch> for Note {
    fn from(pitch: Pitch) -> Self {
        Note::Single(pitch)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Single(p) => f.write_str(&pitch_name(*p)),
            Note::Chord(set) => {
                let names: Vec<String> = set.iter().map(|p| pitch_name(*p)).collect();
                write!(f, "<{}>", names.join(" "))
            }
        }
    }
}

/// Ordered list of candidate notes, referenced by index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    entries: Vec<Note>,
}

impl Palette {
    pub fn new(entries: Vec<Note>) -> Self {
        Palette { entries }
    }

    /// Palette of single notes from raw MIDI pitches.
    pub fn from_pitches(pitches: impl IntoIterator<Item = Pitch>) -> Self {
        Palette {
            entries: pitches.into_iter().map(Note::Single).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[Note] {
        &self.entries
    }

    /// Index of the first entry equal to `note`.
    pub fn index_of(&self, note: &Note) -> Option<usize> {
        self.entries.iter().position(|n| n == note)
    }
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Convert a MIDI pitch to a compact note name (e.g., "C4", "F#3").
pub fn pitch_name(pitch: Pitch) -> String {
    let octave = (pitch / 12) as i8 - 1;
    format!("{}{}", PITCH_CLASS_NAMES[(pitch % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_name() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(66), "F#4");
        assert_eq!(pitch_name(21), "A0");
        assert_eq!(pitch_name(0), "C-1");
    }

    #[test]
    fn test_chord_collapses_duplicates() {
        let chord = Note::chord([67, 60, 64, 60]);
        assert_eq!(chord.pitches(), vec![60, 64, 67]);
        assert!(chord.is_chord());
        assert_eq!(chord.to_string(), "<C4 E4 G4>");
    }

    #[test]
    fn test_palette_index_of() {
        let palette = Palette::new(vec![
            Note::Single(60),
            Note::chord([60, 64, 67]),
            Note::Single(62),
        ]);
        assert_eq!(palette.index_of(&Note::Single(62)), Some(2));
        assert_eq!(palette.index_of(&Note::chord([67, 64, 60])), Some(1));
        assert_eq!(palette.index_of(&Note::Single(61)), None);
    }

    #[test]
    fn test_palette_json_shape() {
        let palette: Palette = serde_json::from_str("[60, [60, 64, 67], 62]").unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(palette.get(0), Some(&Note::Single(60)));
        assert!(palette.get(1).is_some_and(Note::is_chord));
        let json = serde_json::to_string(&palette).unwrap();
        assert_eq!(json, "[60,[60,64,67],62]");
    }
}
