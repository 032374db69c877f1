// Clip generation parameters.
//
// `ClipConfig` gathers everything the assembler (clip.rs) needs besides the
// note material itself: repeat counts, alteration settings, the note length
// token, the rhythm strategy and its tuning. Every field has a default, so a
// JSON config file only needs to name what it changes. The config is checked
// once by `validate()` at the start of assembly and never mutated afterwards.
//
// Note lengths are written as rational tokens ("1/8", "3/16") and parsed by
// a fixed grammar: `<numerator>/<denominator>` or a bare integer, both parts
// positive.

use crate::error::{ClipError, Result};
use crate::markov::TransitionMatrix;
use crate::note::Palette;
use crate::pattern::PatternType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Slowest playable tempo. A MIDI tempo is microseconds per quarter in 24
/// bits, which tops out just above 3.5 bpm.
pub const MIN_TEMPO_BPM: u16 = 4;

/// Duration of one pattern slot, as a fraction of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteLength {
    numerator: u32,
    denominator: u32,
}

impl NoteLength {
    pub fn new(numerator: u32, denominator: u32) -> Result<Self> {
        if numerator == 0 || denominator == 0 {
            return Err(ClipError::InvalidNoteLength(format!("{numerator}/{denominator}")));
        }
        Ok(NoteLength {
            numerator,
            denominator,
        })
    }

    pub fn numerator(self) -> u32 {
        self.numerator
    }

    pub fn denominator(self) -> u32 {
        self.denominator
    }

    /// Length as a fraction of a whole note.
    pub fn as_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// How many slots of this length fit in `quarters` quarter notes,
    /// rounded down.
    pub fn slots_in(self, quarters: u32) -> usize {
        let total = quarters as u64 * self.denominator as u64;
        (total / (4 * self.numerator as u64)) as usize
    }
}

impl FromStr for NoteLength {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ClipError::InvalidNoteLength(s.to_string());
        let parse_part = |part: &str| -> Result<u32> {
            let part = part.trim();
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let (numerator, denominator) = match s.split_once('/') {
            Some((n, d)) => (parse_part(n)?, parse_part(d)?),
            None => (parse_part(s)?, 1),
        };
        NoteLength::new(numerator, denominator).map_err(|_| invalid())
    }
}

impl TryFrom<String> for NoteLength {
    type Error = ClipError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<NoteLength> for String {
    fn from(length: NoteLength) -> String {
        length.to_string()
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Parameters for assembling one clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// How many times the rendered clip plays back to back.
    pub times_to_play_clip: usize,
    /// Rhythm repeat-group count; also the partition count for trimming.
    pub times_to_play_rhythm: usize,
    /// Extra alteration passes beyond the first.
    pub alter_count: usize,
    /// Substitutions per alteration pass.
    pub alter_note_count: usize,
    /// Palette substitutions are drawn from. Required when
    /// `alter_note_count > 0`.
    pub alter_scale: Palette,
    /// Length of one pattern slot.
    pub note_length: NoteLength,
    /// Output name handed to the renderers, without extension.
    pub filename: String,
    /// Cycle the input notes until they fill the length budget.
    pub repeat_notes: bool,
    pub pattern_type: PatternType,
    /// Literal pattern for `PatternType::Manual`.
    pub manual_pattern: Option<String>,
    /// Exclusive upper bound on holds per onset for `PatternType::Random`.
    pub max_hold: usize,
    /// Exclusive upper bound on rests per onset for `PatternType::Random`.
    pub max_rest: usize,
    /// Rest-count transitions for `PatternType::Markov`.
    pub transition_matrix: TransitionMatrix,
    /// Playback tempo in quarter notes per minute, at least [`MIN_TEMPO_BPM`].
    pub tempo_bpm: u16,
}

impl Default for ClipConfig {
    fn default() -> Self {
        ClipConfig {
            times_to_play_clip: 1,
            times_to_play_rhythm: 1,
            alter_count: 0,
            alter_note_count: 0,
            alter_scale: Palette::default(),
            note_length: NoteLength {
                numerator: 1,
                denominator: 8,
            },
            filename: "clip".to_string(),
            repeat_notes: false,
            pattern_type: PatternType::Normal,
            manual_pattern: None,
            max_hold: 3,
            max_rest: 2,
            transition_matrix: TransitionMatrix::default_rests(),
            tempo_bpm: 96,
        }
    }
}

impl ClipConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: ClipConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Reject parameter combinations that cannot produce a clip.
    pub fn validate(&self) -> Result<()> {
        if self.times_to_play_clip == 0 {
            return Err(ClipError::InvalidConfig("times_to_play_clip must be at least 1".into()));
        }
        if self.times_to_play_rhythm == 0 {
            return Err(ClipError::InvalidConfig("times_to_play_rhythm must be at least 1".into()));
        }
        if self.tempo_bpm < MIN_TEMPO_BPM {
            return Err(ClipError::InvalidConfig(format!(
                "tempo_bpm must be at least {MIN_TEMPO_BPM}, got {}",
                self.tempo_bpm
            )));
        }
        if self.alter_note_count > 0 && self.alter_scale.is_empty() {
            return Err(ClipError::InvalidConfig(
                "alter_scale is required when alter_note_count is set".into(),
            ));
        }
        match self.pattern_type {
            PatternType::Manual if self.manual_pattern.is_none() => {
                return Err(ClipError::MissingManualPattern);
            }
            PatternType::Random if self.max_hold == 0 || self.max_rest == 0 => {
                return Err(ClipError::InvalidConfig(
                    "max_hold and max_rest must be at least 1".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_length_grammar() {
        assert_eq!("1/4".parse::<NoteLength>().unwrap(), NoteLength::new(1, 4).unwrap());
        assert_eq!(" 3 / 16 ".parse::<NoteLength>().unwrap(), NoteLength::new(3, 16).unwrap());
        assert_eq!("2".parse::<NoteLength>().unwrap(), NoteLength::new(2, 1).unwrap());
    }

    #[test]
    fn test_note_length_rejects_expressions() {
        let inputs = [
            "", "1/", "/4", "0/4", "1/0", "1/4/2", "-1/4", "1.5/4", "__import__('os')", "1+1",
        ];
        for bad in inputs {
            let err = bad.parse::<NoteLength>().unwrap_err();
            assert!(matches!(err, ClipError::InvalidNoteLength(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_slots_in() {
        let sixteenth = NoteLength::new(1, 16).unwrap();
        assert_eq!(sixteenth.slots_in(4), 16);
        let quarter = NoteLength::new(1, 4).unwrap();
        assert_eq!(quarter.slots_in(7), 7);
        let dotted_eighth = NoteLength::new(3, 16).unwrap();
        assert_eq!(dotted_eighth.slots_in(3), 4);
        assert!((dotted_eighth.as_f64() - 0.1875).abs() < 1e-12);
    }

    #[test]
    fn test_defaults_validate() {
        ClipConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_repeats() {
        let config = ClipConfig {
            times_to_play_rhythm: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClipError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_tempo_floor() {
        let slow = |tempo_bpm| ClipConfig {
            tempo_bpm,
            ..Default::default()
        };
        assert!(matches!(slow(0).validate(), Err(ClipError::InvalidConfig(_))));
        assert!(matches!(slow(3).validate(), Err(ClipError::InvalidConfig(_))));
        slow(MIN_TEMPO_BPM).validate().unwrap();
    }

    #[test]
    fn test_validate_manual_without_pattern() {
        let config = ClipConfig {
            pattern_type: PatternType::Manual,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ClipError::MissingManualPattern)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json =
            r#"{"note_length": "1/16", "pattern_type": "swing", "alter_scale": [60, 62, 64]}"#;
        let config: ClipConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.note_length, NoteLength::new(1, 16).unwrap());
        assert_eq!(config.pattern_type, PatternType::Swing);
        assert_eq!(config.alter_scale.len(), 3);
        assert_eq!(config.times_to_play_clip, 1);
        assert_eq!(config.transition_matrix, TransitionMatrix::default_rests());
    }

    #[test]
    fn test_json_rejects_bad_tokens() {
        assert!(serde_json::from_str::<ClipConfig>(r#"{"note_length": "eval(1/4)"}"#).is_err());
        assert!(serde_json::from_str::<ClipConfig>(r#"{"pattern_type": "polka"}"#).is_err());
        let lopsided = r#"{"transition_matrix": [[0.3, 0.3], [0.5, 0.5]]}"#;
        assert!(serde_json::from_str::<ClipConfig>(lopsided).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.json");
        std::fs::write(&path, r#"{"times_to_play_clip": 3, "filename": "riff"}"#).unwrap();
        let config = ClipConfig::load(&path).unwrap();
        assert_eq!(config.times_to_play_clip, 3);
        assert_eq!(config.filename, "riff");
    }
}
