// Error taxonomy for the crate.
//
// Construction errors (bad pattern lengths, out-of-range inversions,
// unparseable chord symbols) are fatal and surface to the caller before any
// partial output is produced. Data-quality conditions during humanization
// (a note-on with no matching note-off) are non-fatal: they are logged and
// the event passes through unchanged.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Pattern slots must divide evenly into the measure's beats.
    #[error("pattern length {len} is not a multiple of the time signature numerator {numerator}")]
    PatternLength { len: usize, numerator: u32 },

    /// Inversion index must be in [0, chord size).
    #[error("inversion {inversion} is out of range for a chord of {size} notes")]
    InvalidInversion { inversion: usize, size: usize },

    /// Chord symbol text that doesn't fit the grammar.
    #[error("could not parse chord symbol {symbol:?}: {reason}")]
    ChordParse { symbol: String, reason: String },

    /// Playing or exporting a song with no tracks.
    #[error("song has no tracks")]
    EmptySong,

    /// A generated sequence must have at least one element.
    #[error("requested melodic sequence of length zero")]
    EmptySequence,

    /// Walking a graph with no nodes (inverted octave bounds).
    #[error("melodic graph has no pitches")]
    EmptyGraph,

    /// I/O error while writing MIDI or reading resource maps.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed instrument/percussion map file.
    #[error("invalid resource map: {0}")]
    ResourceMap(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
