// Clip generator CLI entry point.
//
// Generates one clip and writes it as LilyPond and/or MIDI plus a JSON
// snapshot. The pipeline: scale palette -> sine-contour melody -> rhythm,
// trimming and alteration (clip assembly) -> rendering.
//
// Usage:
//   cargo run -p clip_music --bin generate -- [output-stem] [--config clip.json]
//     [--seed N] [--notes N] [--length QUARTERS] [--scale NAME] [--tonic NAME]
//     [--low MIDI] [--high MIDI] [--chords] [--max-distance N] [--step X]
//     [--pattern TYPE] [--format ly|midi|both]
//
// Set RUST_LOG=debug to see every jump correction and substitution.

use clap::{Parser, ValueEnum};
use clip_music::clip::{ClipRenderer, assemble_clip};
use clip_music::config::ClipConfig;
use clip_music::contour::{Constant, map_contour};
use clip_music::error::{ClipError, Result};
use clip_music::lilypond::LilyPondRenderer;
use clip_music::midi::MidiRenderer;
use clip_music::mode::{Scale, ScaleInstance, parse_pitch_class};
use clip_music::note::Palette;
use clip_music::snapshot;
use clip_prng::ClipRng;
use rand::Rng;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Ly,
    Midi,
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "generate")]
#[command(about = "Generate a melodic clip from a sine contour and a rhythm pattern")]
#[command(version)]
struct Cli {
    /// Output path without extension (defaults to the config's filename)
    output: Option<PathBuf>,

    /// JSON clip configuration; missing fields take defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (drawn and printed when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of contour notes to generate
    #[arg(short, long, default_value_t = 16)]
    notes: usize,

    /// Length budget in quarter notes
    #[arg(short, long)]
    length: Option<u32>,

    /// Scale name (major, minor, dorian, ..., chromatic)
    #[arg(long, default_value = "major")]
    scale: String,

    /// Tonic pitch class (C, F#, Bb, ...)
    #[arg(long, default_value = "C")]
    tonic: String,

    /// Lowest MIDI pitch in the palette
    #[arg(long, default_value_t = 55)]
    low: u8,

    /// Highest MIDI pitch in the palette
    #[arg(long, default_value_t = 79)]
    high: u8,

    /// Use diatonic triads instead of single notes
    #[arg(long)]
    chords: bool,

    /// Widest allowed step between consecutive palette indices
    #[arg(long)]
    max_distance: Option<usize>,

    /// Constant driving increment per note
    #[arg(long, default_value_t = 0.125)]
    step: f64,

    /// Pattern type override (normal, swing, random, markov, manual)
    #[arg(short, long)]
    pattern: Option<String>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Both)]
    format: OutputFormat,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ClipConfig::load(path)?,
        None => ClipConfig::default(),
    };
    if let Some(kind) = &cli.pattern {
        config.pattern_type = kind.parse()?;
    }

    let scale = ScaleInstance::new(cli.scale.parse::<Scale>()?, parse_pitch_class(&cli.tonic)?);
    let palette = if cli.chords {
        Palette::triads(&scale, cli.low, cli.high)
    } else {
        Palette::from_scale(&scale, cli.low, cli.high)
    };
    if config.alter_scale.is_empty() {
        config.alter_scale = palette.clone();
    }
    if !cli.step.is_finite() {
        return Err(ClipError::InvalidConfig(format!(
            "driving step must be finite, got {}",
            cli.step
        )));
    }

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    let stem = cli.output.clone().unwrap_or_else(|| PathBuf::from(&config.filename));

    println!("=== Clip Generator ===");
    println!("Output: {}", stem.display());
    println!("Scale: {:?} on pitch class {}", scale.scale, scale.tonic_pc);
    println!("Palette: {} entries", palette.len());
    println!("Pattern: {:?}", config.pattern_type);
    println!("Seed: {seed}");
    println!();

    let mut rng = ClipRng::new(seed);

    println!("[1/3] Mapping contour ({} notes)...", cli.notes);
    let notes = map_contour(&palette, Constant(cli.step), cli.notes, cli.max_distance, &mut rng)?;

    println!("[2/3] Assembling clip...");
    let clip = assemble_clip(&notes, cli.length, &config, &mut rng)?;
    println!("  Notes: {}", clip.notes.len());
    println!("  Pattern: {}", clip.pattern);

    println!("[3/3] Writing output...");
    let mut renderers: Vec<Box<dyn ClipRenderer>> = Vec::new();
    if matches!(cli.format, OutputFormat::Ly | OutputFormat::Both) {
        renderers.push(Box::new(LilyPondRenderer {
            title: config.filename.clone(),
            tempo_bpm: config.tempo_bpm,
            key: Some(scale),
        }));
    }
    if matches!(cli.format, OutputFormat::Midi | OutputFormat::Both) {
        renderers.push(Box::new(MidiRenderer {
            tempo_bpm: config.tempo_bpm,
        }));
    }
    for renderer in &renderers {
        let path = renderer.write(&clip, &stem)?;
        println!("  Wrote {}", path.display());
    }
    let snapshot_path = stem.with_extension("json");
    snapshot::save(&clip, &snapshot_path)?;
    println!("  Wrote {}", snapshot_path.display());
    Ok(())
}
