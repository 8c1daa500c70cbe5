// Songsmith
//
// A symbolic music generation toolkit: a small algebra over pitch classes,
// scales, and chords; a weighted-graph melodic generator; humanization
// transforms; and a tick-based sequencing model that renders to Standard
// MIDI Files or plays in real time through a pluggable sink.
//
// Architecture:
// - note.rs: The twelve pitch classes and their MIDI values
// - key.rs: Scales, modes, chord construction/inversion/voicing, and the
//   chord symbol parser
// - time.rs: Tick grid, time signatures, note events, and the Measure
//   container with pattern-based construction
// - rhythm.rs: Stock percussion patterns on a sixteenth grid
// - humanize.rs: Measure transforms (swing, timing/velocity jitter,
//   pulse accents, dropout)
// - markov.rs: Fully connected weighted pitch graph and random-walk
//   melody generation
// - sequencer.rs: Tracks and songs with append/stack/repeat composition
// - midi.rs: SMF export via midly
// - player.rs: Per-track threaded wall-clock scheduler and the MidiSink
//   trait
// - instruments.rs: General MIDI and percussion name lookup
// - error.rs: Crate-wide error type
//
// Generation is deterministic given a seed: every randomized operation
// takes the RNG as an argument.

pub mod error;
pub mod humanize;
pub mod instruments;
pub mod key;
pub mod markov;
pub mod midi;
pub mod note;
pub mod player;
pub mod rhythm;
pub mod sequencer;
pub mod time;
