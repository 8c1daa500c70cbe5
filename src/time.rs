// Tick-based time: signatures, note events, and the Measure container.
//
// All in-memory timestamps are absolute tick offsets from the start of
// their container; ticks are a fixed grid (TICKS_PER_BEAT per beat of the
// time signature) independent of tempo. Tempo only matters when ticks are
// converted to wall-clock seconds — `duration_secs` here, and the
// scheduler during playback. That keeps every composition operator pure
// tick arithmetic while still supporting per-measure tempo changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tick resolution. Shared by every component; changing it rescales
/// timestamps but no algorithm depends on the specific value.
pub const TICKS_PER_BEAT: u32 = 480;

/// Note length denominators for time signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteLength {
    Whole = 1,
    Half = 2,
    Quarter = 4,
    Eighth = 8,
    Sixteenth = 16,
    ThirtySecond = 32,
    SixtyFourth = 64,
    HundredTwentyEighth = 128,
}

impl NoteLength {
    /// The denominator as written, e.g. Quarter = 4.
    pub fn denominator(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: NoteLength,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: NoteLength) -> TimeSignature {
        TimeSignature {
            numerator,
            denominator,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> TimeSignature {
        TimeSignature::new(4, NoteLength::Quarter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// A timestamped note event. `time` is an absolute tick offset within the
/// owning measure or track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub time: u32,
    pub kind: EventKind,
    pub pitch: u8,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn note_on(time: u32, pitch: u8, velocity: u8) -> NoteEvent {
        NoteEvent {
            time,
            kind: EventKind::NoteOn,
            pitch,
            velocity,
        }
    }

    pub fn note_off(time: u32, pitch: u8) -> NoteEvent {
        NoteEvent {
            time,
            kind: EventKind::NoteOff,
            pitch,
            velocity: 0,
        }
    }

    /// The same event moved by a tick offset.
    pub fn shifted(self, offset_ticks: u32) -> NoteEvent {
        NoteEvent {
            time: self.time + offset_ticks,
            ..self
        }
    }
}

/// One measure: a time signature, a tempo, and the events inside it.
///
/// Events keep their creation order (note-on before its note-off); sorting
/// by time happens when measures are folded into a `Track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub time_signature: TimeSignature,
    /// Beats per minute, where a beat is one denominator unit.
    pub tempo: f64,
    pub events: Vec<NoteEvent>,
}

impl Measure {
    pub fn new(time_signature: TimeSignature, tempo: f64, events: Vec<NoteEvent>) -> Measure {
        Measure {
            time_signature,
            tempo,
            events,
        }
    }

    /// Measure length on the tick grid: one beat per numerator unit,
    /// independent of tempo.
    pub fn duration_ticks(&self) -> u32 {
        TICKS_PER_BEAT * self.time_signature.numerator
    }

    /// Measure length in wall-clock seconds at this measure's tempo.
    /// A 4/4 measure at 30 bpm and a 16/16 measure at 120 bpm last the
    /// same number of seconds despite different tick counts.
    pub fn duration_secs(&self) -> f64 {
        self.time_signature.numerator as f64 * 60.0 / self.tempo
    }

    /// Build a measure from a slot pattern. Each slot is either a rest
    /// (`None`) or the set of pitches struck together; the pattern length
    /// must be a positive multiple of the time signature numerator, and
    /// each slot occupies `numerator / len` beats. Every pitch gets a
    /// note-on at its slot offset and a note-off `gate` slot-widths later.
    pub fn from_pattern(
        pattern: &[Option<Vec<u8>>],
        time_signature: TimeSignature,
        tempo: f64,
        velocity: u8,
        gate: f64,
    ) -> Result<Measure> {
        let numerator = time_signature.numerator;
        if pattern.is_empty() || pattern.len() % numerator as usize != 0 {
            return Err(Error::PatternLength {
                len: pattern.len(),
                numerator,
            });
        }

        let step = numerator as f64 / pattern.len() as f64 * TICKS_PER_BEAT as f64;
        let mut events = Vec::new();
        for (i, slot) in pattern.iter().enumerate() {
            let Some(pitches) = slot else { continue };
            for &pitch in pitches {
                events.push(NoteEvent::note_on((i as f64 * step) as u32, pitch, velocity));
                events.push(NoteEvent::note_off(
                    ((i as f64 + gate) * step) as u32,
                    pitch,
                ));
            }
        }

        Ok(Measure::new(time_signature, tempo, events))
    }

    /// Apply a transform, consuming this measure. Humanization transforms
    /// chain through here; order matters, later transforms see already
    /// perturbed times and velocities.
    pub fn mutate(self, transform: impl FnOnce(Measure) -> Measure) -> Measure {
        transform(self)
    }
}
