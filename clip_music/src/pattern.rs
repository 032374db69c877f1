// Rhythm patterns and the strategies that build them.
//
// A pattern is a dense string of one-slot markers: `x` starts a note, `_`
// holds whatever is sounding, `r` is a rest. The number of `x` markers is the
// number of notes the pattern consumes when rendered.
//
// Five builders produce patterns from a note count:
// - Normal: every note is an onset plus one hold.
// - Swing: onsets alternate between no rest and one rest.
// - Random: each onset gets a random number of holds and rests.
// - Markov: rests per onset come from a weighted transition chain
//   (markov.rs); one block is sampled and repeated per rhythm group.
// - Manual: a caller-supplied literal, used as-is.

use crate::error::{ClipError, Result};
use crate::markov::{Chain, TransitionMatrix};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// One slot of a rhythm pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RhythmEvent {
    Onset,
    Hold,
    Rest,
}

impl RhythmEvent {
    pub fn marker(self) -> char {
        match self {
            RhythmEvent::Onset => 'x',
            RhythmEvent::Hold => '_',
            RhythmEvent::Rest => 'r',
        }
    }

    pub fn from_marker(c: char) -> Result<Self> {
        match c {
            'x' => Ok(RhythmEvent::Onset),
            '_' => Ok(RhythmEvent::Hold),
            'r' => Ok(RhythmEvent::Rest),
            other => Err(ClipError::InvalidPatternMarker(other)),
        }
    }
}

/// A sequence of rhythm events. Displays and serializes as its marker string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    events: Vec<RhythmEvent>,
}

impl Pattern {
    pub fn new(events: Vec<RhythmEvent>) -> Self {
        Pattern { events }
    }

    pub fn events(&self) -> &[RhythmEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of note onsets, i.e. how many notes rendering consumes.
    pub fn onset_count(&self) -> usize {
        self.events.iter().filter(|e| **e == RhythmEvent::Onset).count()
    }

    /// The pattern played back to back `times` times.
    pub fn repeated(&self, times: usize) -> Pattern {
        Pattern {
            events: self.events.repeat(times),
        }
    }

    fn push_n(&mut self, event: RhythmEvent, count: usize) {
        self.events.extend(std::iter::repeat_n(event, count));
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self.events.iter().map(|e| e.marker()).collect();
        f.write_str(&s)
    }
}

impl FromStr for Pattern {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self> {
        let events = s.chars().map(RhythmEvent::from_marker).collect::<Result<Vec<_>>>()?;
        Ok(Pattern { events })
    }
}

impl TryFrom<String> for Pattern {
    type Error = ClipError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> String {
        pattern.to_string()
    }
}

/// Which builder generates the clip's rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PatternType {
    Normal,
    Swing,
    Random,
    Markov,
    Manual,
}

impl FromStr for PatternType {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(PatternType::Normal),
            "swing" => Ok(PatternType::Swing),
            "random" => Ok(PatternType::Random),
            "markov" => Ok(PatternType::Markov),
            "manual" => Ok(PatternType::Manual),
            _ => Err(ClipError::UnknownPatternType(s.to_string())),
        }
    }
}

impl TryFrom<String> for PatternType {
    type Error = ClipError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Every note is an onset followed by exactly one hold.
pub fn normal_pattern(notes: usize) -> Pattern {
    let mut pattern = Pattern::default();
    for _ in 0..notes {
        pattern.push_n(RhythmEvent::Onset, 1);
        pattern.push_n(RhythmEvent::Hold, 1);
    }
    pattern
}

/// Onsets alternating between no trailing rest and one trailing rest,
/// starting with no rest.
pub fn swing_pattern(notes: usize) -> Pattern {
    let mut pattern = Pattern::default();
    for i in 0..notes {
        pattern.push_n(RhythmEvent::Onset, 1);
        pattern.push_n(RhythmEvent::Rest, i % 2);
    }
    pattern
}

/// Each onset is followed by a uniform count in `[0, max_hold)` of holds and
/// then a uniform count in `[0, max_rest)` of rests.
pub fn random_pattern(
    notes: usize,
    max_hold: usize,
    max_rest: usize,
    rng: &mut impl Rng,
) -> Result<Pattern> {
    if max_hold == 0 || max_rest == 0 {
        return Err(ClipError::InvalidConfig(format!(
            "random pattern bounds must be at least 1 (max_hold {max_hold}, max_rest {max_rest})"
        )));
    }
    let mut pattern = Pattern::default();
    for _ in 0..notes {
        pattern.push_n(RhythmEvent::Onset, 1);
        let holds = rng.random_range(0..max_hold);
        pattern.push_n(RhythmEvent::Hold, holds);
        let rests = rng.random_range(0..max_rest);
        pattern.push_n(RhythmEvent::Rest, rests);
    }
    Ok(pattern)
}

/// Chain-driven rests. `notes` must split evenly into `groups`; one block of
/// `notes / groups` onsets is sampled from a fresh chain starting at the
/// zero-rest state, then repeated verbatim `groups` times.
pub fn markov_pattern(
    notes: usize,
    groups: usize,
    matrix: &TransitionMatrix,
    rng: &mut impl Rng,
) -> Result<Pattern> {
    if groups == 0 {
        return Err(ClipError::ZeroPartitions);
    }
    if notes % groups != 0 {
        return Err(ClipError::IndivisibleNoteCount { notes, groups });
    }
    let mut chain = Chain::from_rest_state(matrix)?;
    let mut block = Pattern::default();
    for _ in 0..notes / groups {
        block.push_n(RhythmEvent::Onset, 1);
        let rests = chain.next(rng)?;
        block.push_n(RhythmEvent::Rest, rests);
    }
    debug!(block = %block, groups, "sampled markov rhythm block");
    Ok(block.repeated(groups))
}

/// A literal pattern string, validated but otherwise unchanged.
pub fn manual_pattern(literal: &str) -> Result<Pattern> {
    literal.parse()
}

/// Builder inputs beyond the note count.
#[derive(Debug, Clone, Copy)]
pub struct PatternParams<'a> {
    pub max_hold: usize,
    pub max_rest: usize,
    pub groups: usize,
    pub matrix: &'a TransitionMatrix,
    pub manual: Option<&'a str>,
}

/// Dispatch to the builder selected by `kind`.
pub fn build_pattern(
    kind: PatternType,
    notes: usize,
    params: &PatternParams<'_>,
    rng: &mut impl Rng,
) -> Result<Pattern> {
    match kind {
        PatternType::Normal => Ok(normal_pattern(notes)),
        PatternType::Swing => Ok(swing_pattern(notes)),
        PatternType::Random => random_pattern(notes, params.max_hold, params.max_rest, rng),
        PatternType::Markov => markov_pattern(notes, params.groups, params.matrix, rng),
        PatternType::Manual => {
            manual_pattern(params.manual.ok_or(ClipError::MissingManualPattern)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_prng::ClipRng;

    #[test]
    fn test_normal_pattern() {
        assert_eq!(normal_pattern(3).to_string(), "x_x_x_");
        assert_eq!(normal_pattern(0).to_string(), "");
    }

    #[test]
    fn test_swing_alternates_rests() {
        assert_eq!(swing_pattern(5).to_string(), "xxrxxrx");
        assert_eq!(swing_pattern(5).onset_count(), 5);
    }

    #[test]
    fn test_random_pattern_shape() {
        let mut rng = ClipRng::new(8);
        let pattern = random_pattern(40, 3, 2, &mut rng).unwrap();
        assert_eq!(pattern.onset_count(), 40);
        let text = pattern.to_string();
        for chunk in text.split('x').skip(1) {
            let holds = chunk.chars().take_while(|c| *c == '_').count();
            let rests = chunk.chars().skip(holds).take_while(|c| *c == 'r').count();
            assert_eq!(holds + rests, chunk.len(), "holds must precede rests in {chunk:?}");
            assert!(holds < 3 && rests < 2);
        }
    }

    #[test]
    fn test_random_pattern_rejects_zero_bounds() {
        let mut rng = ClipRng::new(8);
        assert!(random_pattern(4, 0, 2, &mut rng).is_err());
        assert!(random_pattern(4, 2, 0, &mut rng).is_err());
    }

    #[test]
    fn test_markov_single_state_never_rests() {
        let mut rng = ClipRng::new(1);
        let matrix = TransitionMatrix::new(vec![vec![1.0]]).unwrap();
        let pattern = markov_pattern(6, 2, &matrix, &mut rng).unwrap();
        assert_eq!(pattern.to_string(), "xxx".to_owned() + "xxx");
    }

    #[test]
    fn test_markov_block_repeats_verbatim() {
        let mut rng = ClipRng::new(31);
        let matrix = TransitionMatrix::default_rests();
        let pattern = markov_pattern(12, 3, &matrix, &mut rng).unwrap();
        let text = pattern.to_string();
        let block_len = text.len() / 3;
        let block = &text[..block_len];
        assert_eq!(text, block.repeat(3));
        assert_eq!(pattern.onset_count(), 12);
    }

    #[test]
    fn test_markov_requires_even_split() {
        let mut rng = ClipRng::new(1);
        let matrix = TransitionMatrix::default_rests();
        let err = markov_pattern(7, 2, &matrix, &mut rng).unwrap_err();
        assert!(matches!(err, ClipError::IndivisibleNoteCount { notes: 7, groups: 2 }));
    }

    #[test]
    fn test_manual_pattern_literal() {
        assert_eq!(manual_pattern("x_x_").unwrap().to_string(), "x_x_");
        let err = manual_pattern("x-x").unwrap_err();
        assert!(matches!(err, ClipError::InvalidPatternMarker('-')));
    }

    #[test]
    fn test_build_pattern_manual_needs_literal() {
        let mut rng = ClipRng::new(1);
        let matrix = TransitionMatrix::default_rests();
        let params = PatternParams {
            max_hold: 2,
            max_rest: 2,
            groups: 1,
            matrix: &matrix,
            manual: None,
        };
        let err = build_pattern(PatternType::Manual, 4, &params, &mut rng).unwrap_err();
        assert!(matches!(err, ClipError::MissingManualPattern));
    }

    #[test]
    fn test_pattern_type_parsing() {
        assert_eq!("Markov".parse::<PatternType>().unwrap(), PatternType::Markov);
        let err = "waltz".parse::<PatternType>().unwrap_err();
        assert!(matches!(err, ClipError::UnknownPatternType(ref s) if s == "waltz"));
        let kind: PatternType = serde_json::from_str("\"swing\"").unwrap();
        assert_eq!(kind, PatternType::Swing);
        assert!(serde_json::from_str::<PatternType>("\"bossa\"").is_err());
    }

    #[test]
    fn test_pattern_serializes_as_string() {
        let pattern: Pattern = serde_json::from_str("\"x__r\"").unwrap();
        assert_eq!(pattern.onset_count(), 1);
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"x__r\"");
    }
}
