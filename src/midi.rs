// Standard MIDI File export.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1
// (multi-track): each `Track` becomes one SMF track carrying its name,
// an optional program change, its tempo and time-signature metas, and
// its note events. Absolute ticks convert to deltas only here; the
// in-memory model never sees delta encoding. The first delta is measured
// from tick 0, so a track whose first event sits mid-measure keeps its
// offset in the file.

use crate::error::Result;
use crate::sequencer::{MetaEvent, Song, Track};
use crate::time::{EventKind, TICKS_PER_BEAT};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// One timestamped SMF event before delta encoding. Metas sort ahead of
/// channel events at the same tick so a tempo change governs the notes
/// written with it.
struct AbsEvent<'a> {
    time: u32,
    rank: u8,
    kind: TrackEventKind<'a>,
}

/// Convert a song to an in-memory SMF.
pub fn to_smf(song: &Song) -> Smf<'_> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_BEAT as u16)),
    ));
    for track in &song.tracks {
        smf.tracks.push(track_to_smf(track));
    }
    smf
}

fn track_to_smf(track: &Track) -> Vec<TrackEvent<'_>> {
    let channel = u4::new(track.channel & 0x0f);

    let mut out: Vec<TrackEvent<'_>> = Vec::new();
    out.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
    });
    if let Some(program) = track.program {
        out.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program & 0x7f),
                },
            },
        });
    }

    let mut abs: Vec<AbsEvent<'_>> = Vec::new();
    for meta in track.metas() {
        abs.push(AbsEvent {
            time: meta.time(),
            rank: 0,
            kind: meta_kind(meta),
        });
    }
    for event in track.events() {
        let message = match event.kind {
            EventKind::NoteOn => MidiMessage::NoteOn {
                key: u7::new(event.pitch & 0x7f),
                vel: u7::new(event.velocity & 0x7f),
            },
            EventKind::NoteOff => MidiMessage::NoteOff {
                key: u7::new(event.pitch & 0x7f),
                vel: u7::new(0),
            },
        };
        abs.push(AbsEvent {
            time: event.time,
            rank: 1,
            kind: TrackEventKind::Midi { channel, message },
        });
    }
    abs.sort_by_key(|e| (e.time, e.rank));

    let mut last_tick: u32 = 0;
    for event in abs {
        out.push(TrackEvent {
            delta: u28::new(event.time - last_tick),
            kind: event.kind,
        });
        last_tick = event.time;
    }

    out.push(TrackEvent {
        delta: u28::new(track.duration_ticks.saturating_sub(last_tick)),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    out
}

fn meta_kind(meta: &MetaEvent) -> TrackEventKind<'static> {
    match *meta {
        MetaEvent::Tempo { bpm, .. } => {
            let microseconds = (60_000_000.0 / bpm) as u32;
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(microseconds)))
        }
        MetaEvent::TimeSignature { signature, .. } => {
            let log2_denom = signature.denominator.denominator().trailing_zeros() as u8;
            TrackEventKind::Meta(MetaMessage::TimeSignature(
                signature.numerator as u8,
                log2_denom,
                24,
                8,
            ))
        }
    }
}

impl Song {
    /// Render to SMF and write to a file.
    pub fn write_midi(&self, path: impl AsRef<Path>) -> Result<()> {
        let smf = to_smf(self);
        let mut buf = Vec::new();
        smf.write_std(&mut buf)?;
        std::fs::write(path, &buf)?;
        Ok(())
    }
}
