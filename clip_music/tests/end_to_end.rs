// End-to-end tests for clip generation.
//
// Drives the public pipeline the way the `generate` binary does: resolve a
// palette, map a contour, assemble a clip, render it and snapshot it. Every
// run uses a fixed-seed ClipRng, so expected outputs are exact.

use clip_music::clip::{ClipRenderer, assemble_clip};
use clip_music::config::ClipConfig;
use clip_music::contour::{Constant, map_contour, map_contour_indices};
use clip_music::error::ClipError;
use clip_music::lilypond::LilyPondRenderer;
use clip_music::markov::TransitionMatrix;
use clip_music::midi::MidiRenderer;
use clip_music::mode::{Scale, ScaleInstance};
use clip_music::note::{Note, Palette};
use clip_music::pattern::PatternType;
use clip_music::snapshot;
use clip_prng::ClipRng;

fn c_major() -> (ScaleInstance, Palette) {
    let scale = ScaleInstance::new(Scale::Major, 0);
    let palette = Palette::from_scale(&scale, 60, 84);
    (scale, palette)
}

#[test]
fn contour_five_entries_constant_half() {
    let palette = Palette::from_pitches([60, 62, 64, 65, 67]);
    let mut rng = ClipRng::new(0);
    let indices = map_contour_indices(&palette, Constant(0.5), 4, Some(2), &mut rng).unwrap();
    assert_eq!(indices, vec![2, 4, 2, 0]);
}

#[test]
fn markov_single_state_through_assembly() {
    let config = ClipConfig {
        pattern_type: PatternType::Markov,
        times_to_play_rhythm: 2,
        transition_matrix: TransitionMatrix::new(vec![vec![1.0]]).unwrap(),
        ..Default::default()
    };
    let notes: Vec<Note> = (60..66).map(Note::Single).collect();
    let mut rng = ClipRng::new(3);
    let clip = assemble_clip(&notes, None, &config, &mut rng).unwrap();
    assert_eq!(clip.pattern.to_string(), "xxx".to_owned() + "xxx");
    assert_eq!(clip.notes, notes);
}

#[test]
fn markov_indivisible_count_aborts() {
    let config = ClipConfig {
        pattern_type: PatternType::Markov,
        times_to_play_rhythm: 4,
        ..Default::default()
    };
    let notes: Vec<Note> = (60..66).map(Note::Single).collect();
    let mut rng = ClipRng::new(3);
    let err = assemble_clip(&notes, None, &config, &mut rng).unwrap_err();
    assert!(matches!(err, ClipError::IndivisibleNoteCount { notes: 6, groups: 4 }));
}

#[test]
fn manual_pattern_with_and_without_budget() {
    let config = ClipConfig {
        pattern_type: PatternType::Manual,
        manual_pattern: Some("x_x_".into()),
        note_length: "1/8".parse().unwrap(),
        ..Default::default()
    };
    let notes = vec![Note::Single(60), Note::Single(62)];
    let mut rng = ClipRng::new(1);

    let untouched = assemble_clip(&notes, None, &config, &mut rng).unwrap();
    assert_eq!(untouched.pattern.to_string(), "x_x_");

    // One quarter note of eighth-note slots: two slots.
    let trimmed = assemble_clip(&notes, Some(1), &config, &mut rng).unwrap();
    assert_eq!(trimmed.pattern.to_string(), "x_");
    assert_eq!(trimmed.notes, vec![Note::Single(60)]);
}

#[test]
fn trimmed_pattern_onsets_match_notes_for_every_builder() {
    let (_, palette) = c_major();
    // A random rhythm can put different onset counts in each half, so
    // assembly only trims it with a single partition.
    let cases = [
        (PatternType::Normal, 2),
        (PatternType::Swing, 2),
        (PatternType::Markov, 2),
        (PatternType::Random, 1),
    ];
    for (kind, groups) in cases {
        for seed in 0..20 {
            let mut rng = ClipRng::new(seed);
            let notes = map_contour(&palette, Constant(0.15), 24, Some(3), &mut rng).unwrap();
            let config = ClipConfig {
                pattern_type: kind,
                times_to_play_rhythm: groups,
                repeat_notes: true,
                ..Default::default()
            };
            let clip = assemble_clip(&notes, Some(8), &config, &mut rng).unwrap();
            assert_eq!(clip.pattern.onset_count(), clip.notes.len(), "{kind:?} seed {seed}");
            assert!(clip.pattern.len() <= 16, "{kind:?} seed {seed}: {}", clip.pattern);
        }
    }
}

#[test]
fn same_seed_same_clip_and_bytes() {
    let (scale, palette) = c_major();
    let config = ClipConfig {
        pattern_type: PatternType::Random,
        alter_count: 1,
        alter_note_count: 3,
        alter_scale: palette.clone(),
        ..Default::default()
    };
    let run = || {
        let mut rng = ClipRng::new(2024);
        let notes = map_contour(&palette, Constant(0.2), 12, Some(3), &mut rng).unwrap();
        let clip = assemble_clip(&notes, Some(12), &config, &mut rng).unwrap();
        let ly = LilyPondRenderer {
            title: "seeded".into(),
            tempo_bpm: 96,
            key: Some(scale),
        }
        .render(&clip)
        .unwrap();
        let mid = MidiRenderer { tempo_bpm: 96 }.render(&clip).unwrap();
        (clip, ly, mid)
    };
    assert_eq!(run(), run());
}

#[test]
fn render_and_snapshot_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("riff");
    let (scale, palette) = c_major();
    let config = ClipConfig {
        times_to_play_clip: 2,
        pattern_type: PatternType::Swing,
        note_length: "1/16".parse().unwrap(),
        alter_note_count: 2,
        alter_scale: palette.clone(),
        ..Default::default()
    };
    let mut rng = ClipRng::new(11);
    let notes = map_contour(&palette, Constant(0.125), 16, None, &mut rng).unwrap();
    let clip = assemble_clip(&notes, Some(4), &config, &mut rng).unwrap();
    assert_eq!(clip.repeats, 2);

    let ly_path = LilyPondRenderer {
        title: "riff".into(),
        tempo_bpm: config.tempo_bpm,
        key: Some(scale),
    }
    .write(&clip, &stem)
    .unwrap();
    let ly = std::fs::read_to_string(&ly_path).unwrap();
    assert!(ly.contains("\\repeat unfold 2"));
    assert!(ly.contains("\\key c \\major"));

    let mid_path = MidiRenderer {
        tempo_bpm: config.tempo_bpm,
    }
    .write(&clip, &stem)
    .unwrap();
    let bytes = std::fs::read(&mid_path).unwrap();
    let smf = midly::Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 1);

    let snap_path = stem.with_extension("json");
    snapshot::save(&clip, &snap_path).unwrap();
    assert_eq!(snapshot::load(&snap_path).unwrap(), clip);
}

#[test]
fn config_file_drives_assembly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.json");
    std::fs::write(
        &path,
        r#"{
            "pattern_type": "Manual",
            "manual_pattern": "x__rx_",
            "times_to_play_clip": 3,
            "note_length": "1/8"
        }"#,
    )
    .unwrap();
    let config = ClipConfig::load(&path).unwrap();
    let notes = vec![Note::Single(64), Note::Single(67)];
    let mut rng = ClipRng::new(1);
    let clip = assemble_clip(&notes, None, &config, &mut rng).unwrap();
    assert_eq!(clip.pattern.to_string(), "x__rx_");
    assert_eq!(clip.repeats, 3);
}
