// Tracks and songs: tick-accurate event containers and their composition
// operators.
//
// A `Track` owns a sorted list of note events plus tempo/time-signature
// meta events, all with absolute tick timestamps. Composition operators
// (`append`, `stack`, `repeat`, `shift_time`, `shift_pitch`) return new
// tracks and never mutate their operands, so intermediate tracks stay
// valid after being combined. Delta encoding happens only at the MIDI
// export boundary (midi.rs); the in-memory model is always absolute.

use crate::time::{Measure, NoteEvent, TimeSignature};
use serde::{Deserialize, Serialize};

/// Default tempo assumed when a track carries no tempo meta event.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Track-level meta events, timestamped in absolute ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetaEvent {
    Tempo { time: u32, bpm: f64 },
    TimeSignature { time: u32, signature: TimeSignature },
}

impl MetaEvent {
    pub fn time(&self) -> u32 {
        match *self {
            MetaEvent::Tempo { time, .. } => time,
            MetaEvent::TimeSignature { time, .. } => time,
        }
    }

    fn shifted(&self, offset_ticks: u32) -> MetaEvent {
        match *self {
            MetaEvent::Tempo { time, bpm } => MetaEvent::Tempo {
                time: time + offset_ticks,
                bpm,
            },
            MetaEvent::TimeSignature { time, signature } => MetaEvent::TimeSignature {
                time: time + offset_ticks,
                signature,
            },
        }
    }
}

/// A named, channeled event stream with a total tick duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// MIDI channel events are dispatched on (0-15).
    pub channel: u8,
    /// Program (instrument) number, written at export when present.
    pub program: Option<u8>,
    pub duration_ticks: u32,
    events: Vec<NoteEvent>,
    metas: Vec<MetaEvent>,
}

impl Track {
    /// Build a track; events and metas are sorted by time on entry and
    /// stay sorted from then on.
    pub fn new(
        name: &str,
        channel: u8,
        program: Option<u8>,
        duration_ticks: u32,
        mut events: Vec<NoteEvent>,
        mut metas: Vec<MetaEvent>,
    ) -> Track {
        events.sort_by_key(|e| e.time);
        metas.sort_by_key(|m| m.time());
        Track {
            name: name.to_string(),
            channel,
            program,
            duration_ticks,
            events,
            metas,
        }
    }

    pub fn empty(name: &str, channel: u8, program: Option<u8>) -> Track {
        Track::new(name, channel, program, 0, Vec::new(), Vec::new())
    }

    /// Fold measures into a track: sequentially via `append` (default) or
    /// simultaneously via `stack`. Each measure contributes its events
    /// plus tempo and time-signature metas at the measure boundary.
    pub fn from_measures(
        measures: &[Measure],
        channel: u8,
        program: Option<u8>,
        name: &str,
        stack: bool,
    ) -> Track {
        let mut track = Track::empty(name, channel, program);
        for measure in measures {
            let part = Track::new(
                name,
                channel,
                program,
                measure.duration_ticks(),
                measure.events.clone(),
                vec![
                    MetaEvent::TimeSignature {
                        time: 0,
                        signature: measure.time_signature,
                    },
                    MetaEvent::Tempo {
                        time: 0,
                        bpm: measure.tempo,
                    },
                ],
            );
            track = if stack {
                track.stack(&part)
            } else {
                track.append(&part)
            };
        }
        track
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn metas(&self) -> &[MetaEvent] {
        &self.metas
    }

    /// The tempo in effect at a tick: the latest tempo meta at or before
    /// it, or the default when none precedes it.
    pub fn tempo_at(&self, tick: u32) -> f64 {
        self.metas
            .iter()
            .filter_map(|m| match *m {
                MetaEvent::Tempo { time, bpm } if time <= tick => Some((time, bpm)),
                _ => None,
            })
            .max_by_key(|&(time, _)| time)
            .map(|(_, bpm)| bpm)
            .unwrap_or(DEFAULT_TEMPO)
    }

    /// The same track moved later by a tick offset; duration unchanged.
    pub fn shift_time(&self, offset_ticks: u32) -> Track {
        Track {
            events: self.events.iter().map(|e| e.shifted(offset_ticks)).collect(),
            metas: self.metas.iter().map(|m| m.shifted(offset_ticks)).collect(),
            ..self.clone()
        }
    }

    /// Transpose every event by a semitone offset, clamped to the MIDI
    /// pitch range; timing and duration unchanged.
    pub fn shift_pitch(&self, offset: i32) -> Track {
        Track {
            events: self
                .events
                .iter()
                .map(|e| NoteEvent {
                    pitch: (e.pitch as i32 + offset).clamp(0, 127) as u8,
                    ..*e
                })
                .collect(),
            ..self.clone()
        }
    }

    /// Sequential composition: `other` starts when `self` ends.
    /// Durations add; event counts add.
    pub fn append(&self, other: &Track) -> Track {
        let shifted = other.shift_time(self.duration_ticks);
        let mut events = self.events.clone();
        events.extend(shifted.events);
        let mut metas = self.metas.clone();
        metas.extend(shifted.metas);
        Track::new(
            &self.name,
            self.channel,
            self.program,
            self.duration_ticks + other.duration_ticks,
            events,
            metas,
        )
    }

    /// Simultaneous composition: both start together. Duration is the
    /// longer of the two; event lists merge unshifted.
    pub fn stack(&self, other: &Track) -> Track {
        let mut events = self.events.clone();
        events.extend(other.events.iter().copied());
        let mut metas = self.metas.clone();
        metas.extend(other.metas.iter().copied());
        Track::new(
            &self.name,
            self.channel,
            self.program,
            self.duration_ticks.max(other.duration_ticks),
            events,
            metas,
        )
    }

    /// The track appended to itself until it plays `n` times.
    pub fn repeat(&self, n: usize) -> Track {
        let mut track = Track::empty(&self.name, self.channel, self.program);
        for _ in 0..n {
            track = track.append(self);
        }
        track
    }
}

/// An ordered set of tracks, each on its own channel. Channel uniqueness
/// is recommended but not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub tracks: Vec<Track>,
}

impl Song {
    pub fn new(tracks: Vec<Track>) -> Song {
        Song { tracks }
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Total duration: the longest track.
    pub fn duration_ticks(&self) -> u32 {
        self.tracks.iter().map(|t| t.duration_ticks).max().unwrap_or(0)
    }
}
