// Clip Music Generator
//
// Procedurally generates one musical clip: a melodic line mapped from a sine
// contour onto a palette of notes or chords, paired with a rhythm pattern
// from one of five builders, fitted to a length budget and varied by
// shape-preserving note substitution. The finished clip is rendered to
// LilyPond or MIDI and can be snapshotted as JSON.
//
// Architecture:
// - note.rs: Pitch, Note (single or chord) and Palette types
// - mode.rs: Named scales and the scale-to-palette resolver
// - markov.rs: Weighted transition chain over rest-count states
// - contour.rs: Driving sequences and the sine-contour note mapper
// - pattern.rs: Rhythm events, patterns and the five pattern builders
// - trim.rs: Partition trimming of patterns and notes to a budget
// - alter.rs: Direction-preserving random note substitution
// - config.rs: Clip configuration, note-length grammar, JSON loading
// - clip.rs: Clip assembly pipeline and the renderer trait
// - lilypond.rs: LilyPond sheet music output (.ly files for engraving)
// - midi.rs: MIDI file output
// - snapshot.rs: JSON backup of assembled clips
// - error.rs: Shared error type
//
// All randomness comes from a caller-supplied `rand::Rng`, so output is
// deterministic given a seeded generator (see the clip_prng crate).

pub mod alter;
pub mod clip;
pub mod config;
pub mod contour;
pub mod error;
pub mod lilypond;
pub mod markov;
pub mod midi;
pub mod mode;
pub mod note;
pub mod pattern;
pub mod snapshot;
pub mod trim;
