// Songsmith — CLI entry point.
//
// Generates a short piece from a chord chart: a Markov-walk melody and
// counter-melody over sustained chords, a root-fifth bass, and a
// humanized drum groove, written to a Standard MIDI File.
//
// Usage:
//   songsmith [output.mid] [--key C] [--mode major] [--chords i,vi,iv,v]
//     [--tempo BPM] [--seed N] [--swing AMOUNT] [--repeats N] [--play]

use rand::SeedableRng;
use rand::rngs::StdRng;
use songsmith::error::Result;
use songsmith::humanize;
use songsmith::instruments::InstrumentMap;
use songsmith::key::{Key, Mode};
use songsmith::markov::MelodicGraph;
use songsmith::note::Note;
use songsmith::player::ConsoleSink;
use songsmith::rhythm;
use songsmith::sequencer::{Song, Track};
use songsmith::time::{Measure, TimeSignature};
use std::process::exit;
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("output.mid");
    let root_name: String = parse_flag(&args, "--key").unwrap_or_else(|| "C".to_string());
    let mode_name: String = parse_flag(&args, "--mode").unwrap_or_else(|| "major".to_string());
    let chord_list: String =
        parse_flag(&args, "--chords").unwrap_or_else(|| "i,vi,iv,v".to_string());
    let tempo: f64 = parse_flag(&args, "--tempo").unwrap_or(120.0);
    let seed: Option<u64> = parse_flag(&args, "--seed");
    let swing: f64 = parse_flag(&args, "--swing").unwrap_or(0.0);
    let repeats: usize = parse_flag(&args, "--repeats").unwrap_or(2);
    let play = args.iter().any(|a| a == "--play");

    let root = match Note::from_name(&root_name) {
        Some(note) => note,
        None => {
            eprintln!("Unknown key root '{root_name}'. Using C.");
            Note::C
        }
    };
    let mode = match Mode::from_name(&mode_name) {
        Some(mode) => mode,
        None => {
            eprintln!("Unknown mode '{mode_name}'. Using major.");
            Mode::MAJOR
        }
    };
    let key = Key::new(root, mode);

    println!("=== Songsmith ===");
    println!("Output: {output_path}");
    println!("Key: {} {:?}", key.root, key.mode);
    println!("Chart: {chord_list}");
    println!("Tempo: {tempo} BPM");
    if let Some(s) = seed {
        println!("Seed: {s}");
    }
    println!();

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    // Resolve the chart. Roman numerals resolve against the key root.
    println!("[1/4] Parsing chord chart...");
    let symbols: Vec<_> = chord_list
        .split(',')
        .map(|raw| Key::parse(&format!("{}{}", key.root, raw.trim())))
        .collect::<Result<_>>()?;
    let num_measures = symbols.len();
    for symbol in &symbols {
        println!("  {} {:?}: {:?}", symbol.key.root, symbol.key.mode, symbol.pitches());
    }

    // Melody and counter-melody: weighted walks pulled toward root/fifth
    // resolution, eighth notes.
    println!("[2/4] Generating melody...");
    let mut graph = MelodicGraph::new(&key, 4, 5);
    let fifth = key.note(5);
    graph.strengthen_connections(&[(key.root, fifth), (fifth, key.root)], 0.2);
    let melody = graph.generate_sequence(8 * num_measures, Some(72), &mut rng)?;
    let counter = graph.follow(&melody, &mut rng)?;
    println!("  {} melody notes.", melody.len());

    let gm = InstrumentMap::general_midi();
    let melody_track = line_track(&melody, tempo, 96, 0, gm.get("Acoustic Grand Piano"), "melody")?;
    let counter_track = line_track(&counter, tempo, 72, 1, gm.get("Flute"), "counter")?;

    // Sustained chords and a root-fifth bass, one measure per symbol.
    let mut chord_measures = Vec::new();
    let mut bass_measures = Vec::new();
    for symbol in &symbols {
        let pitches = symbol.pitches();
        chord_measures.push(Measure::from_pattern(
            &[Some(pitches), None, None, None],
            TimeSignature::default(),
            tempo,
            64,
            3.9,
        )?);

        let low_root = symbol.key.root.value_for_octave(1);
        let low_fifth = symbol.key.note(5).value_for_octave(1);
        bass_measures.push(Measure::from_pattern(
            &[Some(vec![low_root]), None, Some(vec![low_fifth]), None],
            TimeSignature::default(),
            tempo,
            90,
            1.8,
        )?);
    }
    let chords_track = Track::from_measures(
        &chord_measures,
        2,
        gm.get("String Ensemble"),
        "chords",
        false,
    );
    let bass_track =
        Track::from_measures(&bass_measures, 3, gm.get("Acoustic Bass"), "bass", false);

    // A kick/hat groove with a soft snare brush layer, humanized.
    println!("[3/4] Building the groove...");
    let kit = InstrumentMap::percussion();
    let kick = kit.get("Kick Drum").unwrap_or(36);
    let hat = kit.get("Hi-Hat Closed").unwrap_or(42);
    let snare = kit.get("Snare").unwrap_or(38);

    let groove = rhythm::four_on_the_floor(&[kick], 110, tempo)?
        .mutate(|m| {
            let hats = rhythm::straight_8ths(&[hat], 80, tempo).map(|h| h.events).unwrap_or_default();
            let brush = rhythm::brushes(&[snare], 40, tempo).map(|b| b.events).unwrap_or_default();
            let mut events = m.events;
            events.extend(hats);
            events.extend(brush);
            Measure { events, ..m }
        })
        .mutate(|m| humanize::pulse(m, false, 0.2))
        .mutate(|m| humanize::swing(m, swing))
        .mutate(|m| humanize::randomize_velocity(m, 0.04, &mut rng))
        .mutate(|m| humanize::randomize_time(m, 0.01, &mut rng));
    let drum_track =
        Track::from_measures(&[groove], 9, None, "drums", false).repeat(num_measures);

    let verse = Song::new(vec![melody_track, counter_track, chords_track, bass_track, drum_track]);
    let song = Song::new(verse.tracks.iter().map(|t| t.repeat(repeats)).collect());

    println!("[4/4] Writing MIDI to {output_path}...");
    song.write_midi(output_path)?;
    println!("  Done: {} ticks.", song.duration_ticks());

    if play {
        println!();
        println!("Playing...");
        song.play_blocking(Arc::new(ConsoleSink))?;
    }

    Ok(())
}

/// Lay a pitch sequence onto an eighth-note grid, one measure per eight
/// pitches.
fn line_track(
    pitches: &[u8],
    tempo: f64,
    velocity: u8,
    channel: u8,
    program: Option<u8>,
    name: &str,
) -> Result<Track> {
    let measures: Vec<Measure> = pitches
        .chunks(8)
        .map(|chunk| {
            let pattern: Vec<Option<Vec<u8>>> = chunk.iter().map(|&p| Some(vec![p])).collect();
            Measure::from_pattern(&pattern, TimeSignature::default(), tempo, velocity, 0.9)
        })
        .collect::<Result<_>>()?;
    Ok(Track::from_measures(&measures, channel, program, name, false))
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
