// Error type shared by every stage of clip generation.
//
// All configuration problems are fatal: the assembler aborts the whole clip
// and no partial output is produced. I/O and encoding failures from the
// renderers and snapshot persistence are wrapped here too so callers deal with
// a single `Result` type.

use thiserror::Error;

/// Errors raised while validating, generating, or rendering a clip.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("unknown pattern type '{0}' (expected normal, swing, random, markov or manual)")]
    UnknownPatternType(String),

    #[error("note count {notes} is not divisible by the rhythm repeat count {groups}")]
    IndivisibleNoteCount { notes: usize, groups: usize },

    #[error("palette needs at least 2 entries, got {0}")]
    PaletteTooSmall(usize),

    #[error("invalid transition matrix at row {row}: {reason}")]
    InvalidMatrix { row: usize, reason: String },

    #[error("draw {draw} matched no outgoing link of chain node {node}")]
    NoTransition { node: usize, draw: f64 },

    #[error("invalid note length '{0}' (expected numerator/denominator)")]
    InvalidNoteLength(String),

    #[error("invalid rhythm marker '{0}' (expected 'x', '_' or 'r')")]
    InvalidPatternMarker(char),

    #[error("pattern type manual requires a manual pattern")]
    MissingManualPattern,

    #[error("note at position {position} is not in the alteration palette")]
    NoteNotInPalette { position: usize },

    #[error("partition count must be at least 1")]
    ZeroPartitions,

    /// Raised when the contour mapper is built, before any step is taken.
    #[error("max step distance must be at least 2, got {0}")]
    InvalidMaxDistance(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("pattern needs {needed} notes but only {available} are available")]
    NoteShortfall { needed: usize, available: usize },

    #[error("note length {0} cannot be expressed by this renderer")]
    UnsupportedDuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MIDI encoding error: {0}")]
    Midi(String),
}

pub type Result<T> = std::result::Result<T, ClipError>;
