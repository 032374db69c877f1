// Clip assembly: turning raw notes and a config into a renderable clip.
//
// Pipeline, in order:
// 1. Validate the config.
// 2. With a length budget, derive the slot count and (if `repeat_notes`)
//    cycle the notes until they cover it.
// 3. Build the rhythm with the configured pattern builder (pattern.rs).
// 4. With a length budget, trim the pattern to the slot count and the notes
//    to the trimmed pattern's onsets (trim.rs), partitioned by the rhythm
//    repeat count.
// 5. Run `alter_count + 1` alteration passes, each over the same trimmed
//    notes (alter.rs), and concatenate them; repeat the pattern to match.
//
// Whole-clip repetition (`times_to_play_clip`) is not applied to the notes
// or the pattern. It travels with the clip as `repeats` and the renderers
// (lilypond.rs, midi.rs) play the rendered body that many times.

use crate::alter::alter_notes;
use crate::config::{ClipConfig, NoteLength};
use crate::error::{ClipError, Result};
use crate::note::Note;
use crate::pattern::{Pattern, PatternParams, PatternType, RhythmEvent, build_pattern};
use crate::trim::{trim_notes, trim_pattern};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A finished clip: what the renderers and the snapshot store consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub notes: Vec<Note>,
    pub pattern: Pattern,
    pub note_length: NoteLength,
    /// How many times the rendered body plays back to back.
    pub repeats: usize,
}

/// A contiguous run of slots: one note (or chord) sounding, or silence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub note: Option<Note>,
    pub slots: usize,
}

impl Clip {
    /// Check that the pattern has a note for every onset.
    pub fn check(&self) -> Result<()> {
        let needed = self.pattern.onset_count();
        if needed > self.notes.len() {
            return Err(ClipError::NoteShortfall {
                needed,
                available: self.notes.len(),
            });
        }
        Ok(())
    }

    /// Length of one pass through the body, in slots.
    pub fn body_slots(&self) -> usize {
        self.pattern.len()
    }

    /// Walk the pattern and pair onsets with notes, merging holds into the
    /// preceding segment and adjacent rests into one.
    pub fn segments(&self) -> Result<Vec<Segment>> {
        self.check()?;
        let mut notes = self.notes.iter();
        let mut segments: Vec<Segment> = Vec::new();
        for event in self.pattern.events() {
            match event {
                RhythmEvent::Onset => {
                    // `check` guarantees a note per onset.
                    let note = notes.next().cloned();
                    segments.push(Segment { note, slots: 1 });
                }
                RhythmEvent::Hold => match segments.last_mut() {
                    Some(last) => last.slots += 1,
                    None => segments.push(Segment { note: None, slots: 1 }),
                },
                RhythmEvent::Rest => match segments.last_mut() {
                    Some(last) if last.note.is_none() => last.slots += 1,
                    _ => segments.push(Segment { note: None, slots: 1 }),
                },
            }
        }
        Ok(segments)
    }
}

/// Turns a finished clip into a playable file format.
pub trait ClipRenderer {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Encode the clip, body repeated `clip.repeats` times.
    fn render(&self, clip: &Clip) -> Result<Vec<u8>>;

    /// Render to `<stem>.<extension>` and return the written path.
    fn write(&self, clip: &Clip, stem: &Path) -> Result<PathBuf> {
        let path = stem.with_extension(self.extension());
        std::fs::write(&path, self.render(clip)?)?;
        info!(path = %path.display(), "clip rendered");
        Ok(path)
    }
}

/// Assemble a clip from raw notes.
///
/// `length_budget` is in quarter notes. Without it, the pattern is used at
/// its generated length and no trimming or note cycling takes place.
pub fn assemble_clip(
    notes: &[Note],
    length_budget: Option<u32>,
    config: &ClipConfig,
    rng: &mut impl Rng,
) -> Result<Clip> {
    config.validate()?;
    let groups = config.times_to_play_rhythm;
    let slots = length_budget.map(|quarters| config.note_length.slots_in(quarters));
    // Random onsets are not spread evenly, so a partition can end up with
    // fewer onsets than its share of the notes.
    if slots.is_some() && config.pattern_type == PatternType::Random && groups > 1 {
        return Err(ClipError::InvalidConfig(
            "a random rhythm can only be trimmed to a length budget with one rhythm group".into(),
        ));
    }

    let mut working = notes.to_vec();
    match slots {
        Some(slots) if config.repeat_notes && !notes.is_empty() && notes.len() < slots => {
            working = vec![notes.to_vec(); slots.div_ceil(notes.len())].concat();
            debug!(from = notes.len(), to = working.len(), "cycled notes to fill budget");
        }
        _ => {}
    }

    let params = PatternParams {
        max_hold: config.max_hold,
        max_rest: config.max_rest,
        groups,
        matrix: &config.transition_matrix,
        manual: config.manual_pattern.as_deref(),
    };
    let mut pattern = build_pattern(config.pattern_type, working.len(), &params, rng)?;
    debug!(kind = ?config.pattern_type, pattern = %pattern, "built rhythm");

    if let Some(slots) = slots {
        pattern = trim_pattern(&pattern, slots, groups)?;
        working = trim_notes(&pattern, &working, groups)?;
        debug!(slots, pattern = %pattern, notes = working.len(), "trimmed to budget");
    }

    let passes = config.alter_count + 1;
    let mut clip_notes = Vec::with_capacity(working.len() * passes);
    for pass in 0..passes {
        if config.alter_note_count > 0 {
            let altered = alter_notes(&working, &config.alter_scale, config.alter_note_count, rng)?;
            debug!(pass, "alteration pass done");
            clip_notes.extend(altered);
        } else {
            clip_notes.extend_from_slice(&working);
        }
    }

    let clip = Clip {
        notes: clip_notes,
        pattern: pattern.repeated(passes),
        note_length: config.note_length,
        repeats: config.times_to_play_clip,
    };
    clip.check()?;
    info!(
        notes = clip.notes.len(),
        slots = clip.body_slots(),
        passes,
        repeats = clip.repeats,
        "clip assembled"
    );
    Ok(clip)
}
