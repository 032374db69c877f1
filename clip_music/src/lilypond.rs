// LilyPond sheet music output for clips.
//
// Renders a Clip into a LilyPond (.ly) text file that can be engraved into
// PDF/SVG sheet music. The clip body goes on a single staff inside
// `\repeat unfold`, so whole-clip repetition is expressed by the score rather
// than by duplicating notes.
//
// Durations are counted in 64th-note ticks. Each pattern slot lasts
// `note_length` of a whole note, which must come out to a whole number of
// ticks. Segments (clip.rs) are split at 4/4 barlines and each fragment is
// decomposed into power-of-two note values with optional dots, tied
// together. Chords are written as `<...>` with a shared duration.
//
// Uses absolute pitches (not \relative) for simplicity and correctness.

use crate::clip::{Clip, ClipRenderer};
use crate::config::NoteLength;
use crate::error::{ClipError, Result};
use crate::mode::{Scale, ScaleInstance};
use crate::note::{Note, Pitch};
use std::fmt::Write;

/// Ticks per whole note; one tick is a 64th note.
const TICKS_PER_WHOLE: u32 = 64;

/// Ticks per 4/4 bar.
const BAR_TICKS: usize = TICKS_PER_WHOLE as usize;

/// Pitch class names in LilyPond notation (indexed by pitch class 0-11).
const LY_PITCH_NAMES: [&str; 12] = [
    "c", "cis", "d", "ees", "e", "f", "fis", "g", "aes", "a", "bes", "b",
];

/// Convert a MIDI pitch number to a LilyPond absolute pitch string.
///
/// LilyPond's `c` with no octave marks = MIDI 48 (C3).
/// Each `'` raises one octave, each `,` lowers one octave.
pub fn midi_to_ly_note(midi_pitch: Pitch) -> String {
    let pc = (midi_pitch % 12) as usize;
    let octave = (midi_pitch / 12) as i8 - 4;
    let mut result = LY_PITCH_NAMES[pc].to_string();
    let mark = if octave > 0 { '\'' } else { ',' };
    for _ in 0..octave.unsigned_abs() {
        result.push(mark);
    }
    result
}

/// A note or chord without its duration.
pub fn note_to_ly(note: &Note) -> String {
    match note {
        Note::Single(p) => midi_to_ly_note(*p),
        Note::Chord(set) => {
            let names: Vec<String> = set.iter().map(|p| midi_to_ly_note(*p)).collect();
            format!("<{}>", names.join(" "))
        }
    }
}

/// Valid LilyPond durations in 64th-note ticks, largest first.
const DURATION_TABLE: [(usize, &str); 12] = [
    (64, "1"),
    (48, "2."),
    (32, "2"),
    (24, "4."),
    (16, "4"),
    (12, "8."),
    (8, "8"),
    (6, "16."),
    (4, "16"),
    (3, "32."),
    (2, "32"),
    (1, "64"),
];

/// Decompose a duration (in ticks) into LilyPond duration strings, largest
/// first. Multiple parts are connected with ties.
pub fn decompose_duration(mut ticks: usize) -> Vec<&'static str> {
    let mut parts = Vec::new();
    for &(value, name) in &DURATION_TABLE {
        while ticks >= value {
            parts.push(name);
            ticks -= value;
        }
    }
    parts
}

/// Split a duration at 4/4 barlines. Returns the fragment lengths.
pub fn split_at_barlines(start: usize, duration: usize) -> Vec<usize> {
    let mut fragments = Vec::new();
    let mut remaining = duration;
    let mut pos = start;
    while remaining > 0 {
        let bar_end = (pos / BAR_TICKS + 1) * BAR_TICKS;
        let frag = remaining.min(bar_end - pos);
        fragments.push(frag);
        remaining -= frag;
        pos += frag;
    }
    fragments
}

/// Ticks per pattern slot. Fails unless the note length is a whole number
/// of 64th notes.
pub fn slot_ticks(length: NoteLength) -> Result<usize> {
    let scaled = TICKS_PER_WHOLE as u64 * length.numerator() as u64;
    let denominator = length.denominator() as u64;
    if scaled % denominator != 0 {
        return Err(ClipError::UnsupportedDuration(length.to_string()));
    }
    Ok((scaled / denominator) as usize)
}

/// Map a scale to a LilyPond `\key` command. Chromatic has no key.
pub fn scale_to_ly_key(scale: &ScaleInstance) -> Option<String> {
    let mode_name = match scale.scale {
        Scale::Major | Scale::MajorPentatonic => "major",
        Scale::NaturalMinor | Scale::MinorPentatonic => "minor",
        Scale::Dorian => "dorian",
        Scale::Phrygian => "phrygian",
        Scale::Lydian => "lydian",
        Scale::Mixolydian => "mixolydian",
        Scale::Chromatic => return None,
    };
    let pitch = LY_PITCH_NAMES[scale.tonic_pc as usize % 12];
    Some(format!("\\key {pitch} \\{mode_name}"))
}

/// Render one pass of the clip body as a LilyPond music expression.
pub fn render_body(clip: &Clip) -> Result<String> {
    let tick = slot_ticks(clip.note_length)?;
    let mut out = String::new();
    let mut pos = 0;

    for segment in clip.segments()? {
        let duration = segment.slots * tick;
        let name = match &segment.note {
            Some(note) => note_to_ly(note),
            None => "r".to_string(),
        };
        let fragments = split_at_barlines(pos, duration);
        for (i, frag) in fragments.iter().enumerate() {
            let parts = decompose_duration(*frag);
            for (j, dur_str) in parts.iter().enumerate() {
                if !out.is_empty() {
                    out.push(' ');
                }
                let _ = write!(out, "{name}{dur_str}");
                let more = j + 1 < parts.len() || i + 1 < fragments.len();
                if more && segment.note.is_some() {
                    out.push('~');
                }
            }
        }
        pos += duration;
    }
    Ok(out)
}

/// Generate a complete LilyPond file for a clip.
pub fn clip_to_lilypond(
    clip: &Clip,
    title: &str,
    tempo_bpm: u16,
    key: Option<&ScaleInstance>,
) -> Result<String> {
    let body = render_body(clip)?;
    let mut ly = String::new();

    ly.push_str("\\version \"2.24.0\"\n\n");
    let _ = write!(ly, "\\header {{\n  title = \"{}\"\n}}\n\n", title.replace('"', "\\\""));

    let key_str = key.and_then(scale_to_ly_key).map(|k| format!("{k} ")).unwrap_or_default();
    let _ = write!(ly, "global = {{\n  {key_str}\\time 4/4 \\tempo 4 = {tempo_bpm}\n}}\n\n");

    let _ = write!(
        ly,
        "clip = \\absolute {{\n  \\global\n  \\repeat unfold {} {{\n    {}\n  }}\n}}\n\n",
        clip.repeats, body
    );

    ly.push_str("\\score {\n  \\new Staff { \\clip }\n");
    ly.push_str("  \\layout { }\n");
    ly.push_str("  \\midi { }\n");
    ly.push_str("}\n");
    Ok(ly)
}

/// LilyPond text renderer.
#[derive(Debug, Clone)]
pub struct LilyPondRenderer {
    pub title: String,
    pub tempo_bpm: u16,
    pub key: Option<ScaleInstance>,
}

impl ClipRenderer for LilyPondRenderer {
    fn extension(&self) -> &'static str {
        "ly"
    }

    fn render(&self, clip: &Clip) -> Result<Vec<u8>> {
        clip_to_lilypond(clip, &self.title, self.tempo_bpm, self.key.as_ref())
            .map(String::into_bytes)
    }
}
