// MIDI output for clips.
//
// Converts a Clip into a Standard MIDI File (SMF) for playback. Output is
// SMF Format 0: one track carrying the tempo, the track name, and the clip
// body written `repeats` times back to back. Each pattern slot lasts
// `note_length` of a whole note, which must come out to a whole number of
// ticks. Chords sound all their pitches together on channel 0.
//
// Uses the `midly` crate for MIDI writing.

use crate::clip::{Clip, ClipRenderer, Segment};
use crate::config::{MIN_TEMPO_BPM, NoteLength};
use crate::error::{ClipError, Result};
use crate::note::Pitch;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use tracing::debug;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Ticks per whole note.
const TICKS_PER_WHOLE: u32 = TICKS_PER_QUARTER as u32 * 4;

/// Largest delta-time a track event can carry.
const MAX_DELTA: u64 = (1 << 28) - 1;

const CHANNEL: u8 = 0;
const VELOCITY: u8 = 80;

/// Ticks per pattern slot. Fails unless the note length is a whole number
/// of ticks.
pub fn slot_ticks(length: NoteLength) -> Result<u32> {
    let scaled = TICKS_PER_WHOLE as u64 * length.numerator() as u64;
    let denominator = length.denominator() as u64;
    if scaled % denominator != 0 || scaled / denominator > MAX_DELTA {
        return Err(ClipError::UnsupportedDuration(length.to_string()));
    }
    Ok((scaled / denominator) as u32)
}

fn key(pitch: Pitch) -> Result<u7> {
    if pitch > 127 {
        return Err(ClipError::Midi(format!("pitch {pitch} is outside the MIDI range")));
    }
    Ok(u7::new(pitch))
}

fn midi_event(delta: u32, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(CHANNEL),
            message,
        },
    }
}

/// Append one pass of the body. `pending` carries rest time that has not
/// been attached to an event yet.
fn push_body(
    track: &mut Track<'static>,
    segments: &[Segment],
    tick: u32,
    pending: &mut u32,
) -> Result<()> {
    for segment in segments {
        let duration = segment.slots as u32 * tick;
        let Some(note) = &segment.note else {
            *pending += duration;
            continue;
        };
        let keys = note.pitches().into_iter().map(key).collect::<Result<Vec<u7>>>()?;
        for (i, k) in keys.iter().enumerate() {
            let delta = if i == 0 { std::mem::take(pending) } else { 0 };
            track.push(midi_event(
                delta,
                MidiMessage::NoteOn {
                    key: *k,
                    vel: u7::new(VELOCITY),
                },
            ));
        }
        for (i, k) in keys.iter().enumerate() {
            let delta = if i == 0 { duration } else { 0 };
            track.push(midi_event(
                delta,
                MidiMessage::NoteOff {
                    key: *k,
                    vel: u7::new(0),
                },
            ));
        }
    }
    Ok(())
}

/// Convert a clip to an in-memory SMF.
pub fn clip_to_smf(clip: &Clip, tempo_bpm: u16) -> Result<Smf<'static>> {
    if tempo_bpm < MIN_TEMPO_BPM {
        return Err(ClipError::InvalidConfig(format!(
            "tempo_bpm must be at least {MIN_TEMPO_BPM}, got {tempo_bpm}"
        )));
    }
    let tick = slot_ticks(clip.note_length)?;
    let segments = clip.segments()?;

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    let mut track: Track<'static> = Vec::new();
    let tempo_microseconds = 60_000_000 / tempo_bpm as u32;
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(b"Clip")),
    });

    let mut pending = 0;
    for _ in 0..clip.repeats {
        push_body(&mut track, &segments, tick, &mut pending)?;
    }
    // Trailing rests still count toward the clip's length.
    track.push(TrackEvent {
        delta: u28::new(pending),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    debug!(events = track.len(), repeats = clip.repeats, "midi track built");
    smf.tracks.push(track);
    Ok(smf)
}

/// Standard MIDI File renderer.
#[derive(Debug, Clone, Copy)]
pub struct MidiRenderer {
    pub tempo_bpm: u16,
}

impl ClipRenderer for MidiRenderer {
    fn extension(&self) -> &'static str {
        "mid"
    }

    fn render(&self, clip: &Clip) -> Result<Vec<u8>> {
        let smf = clip_to_smf(clip, self.tempo_bpm)?;
        let mut buf = Vec::new();
        smf.write(&mut buf).map_err(|e| ClipError::Midi(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    fn clip(notes: Vec<Note>, pattern: &str, repeats: usize) -> Clip {
        Clip {
            notes,
            pattern: pattern.parse().unwrap(),
            note_length: "1/8".parse().unwrap(),
            repeats,
        }
    }

    /// (absolute tick, key, is_on) for every note event in the track.
    fn note_events(track: &Track<'_>) -> Vec<(u32, u8, bool)> {
        let mut now = 0;
        let mut out = Vec::new();
        for event in track {
            now += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                match message {
                    MidiMessage::NoteOn { key, .. } => out.push((now, key.as_int(), true)),
                    MidiMessage::NoteOff { key, .. } => out.push((now, key.as_int(), false)),
                    _ => {}
                }
            }
        }
        out
    }

    #[test]
    fn test_slot_ticks() {
        assert_eq!(slot_ticks("1/8".parse().unwrap()).unwrap(), 240);
        assert_eq!(slot_ticks("1/3".parse().unwrap()).unwrap(), 640);
        assert!(slot_ticks("1/7".parse().unwrap()).is_err());
    }

    #[test]
    fn test_single_track_timing() {
        let c = clip(vec![Note::Single(60), Note::Single(64)], "x_rx", 1);
        let smf = clip_to_smf(&c, 120).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        assert_eq!(
            note_events(&smf.tracks[0]),
            vec![(0, 60, true), (480, 60, false), (720, 64, true), (960, 64, false)]
        );
    }

    #[test]
    fn test_chord_and_repeats() {
        let c = clip(vec![Note::chord([60, 67])], "x_", 2);
        let smf = clip_to_smf(&c, 96).unwrap();
        let events = note_events(&smf.tracks[0]);
        assert_eq!(events.len(), 8);
        assert_eq!(events[4], (480, 60, true));
        assert_eq!(events[7], (960, 67, false));
    }

    #[test]
    fn test_trailing_rest_extends_track() {
        let c = clip(vec![Note::Single(60)], "xrr", 1);
        let smf = clip_to_smf(&c, 96).unwrap();
        let total: u32 = smf.tracks[0].iter().map(|e| e.delta.as_int()).sum();
        assert_eq!(total, 720);
    }

    #[test]
    fn test_tempo_fits_24_bits() {
        let c = clip(vec![Note::Single(60)], "x", 1);
        for slow in [1, 2, 3] {
            assert!(matches!(clip_to_smf(&c, slow), Err(ClipError::InvalidConfig(_))));
        }
        let smf = clip_to_smf(&c, MIN_TEMPO_BPM).unwrap();
        assert!(matches!(
            smf.tracks[0][0].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 15_000_000
        ));
    }

    #[test]
    fn test_rejects_out_of_range_pitch() {
        let c = clip(vec![Note::Single(200)], "x", 1);
        assert!(matches!(clip_to_smf(&c, 96), Err(ClipError::Midi(_))));
    }

    #[test]
    fn test_render_parses_back() {
        let c = clip(vec![Note::Single(62), Note::Single(65)], "x_x_", 3);
        let bytes = MidiRenderer { tempo_bpm: 100 }.render(&c).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(note_events(&smf.tracks[0]).len(), 12);
    }
}
