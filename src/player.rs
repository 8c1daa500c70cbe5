// Real-time playback scheduling.
//
// Each track plays on its own thread: events go out in ascending tick
// order, each one held until its wall-clock due time measured from a
// reference instant captured at start. Ticks convert to seconds under
// the tempo meta in effect at the event's tick, so per-measure tempo
// changes land where they were written. The only blocking operation is
// the sleep-until-deadline before each dispatch.
//
// Tracks and their event lists are immutable once built, so concurrent
// playback shares them freely; the sink is the one shared collaborator
// and must tolerate sends from several tracks at once. Ordering is
// guaranteed within a track, never across tracks.

use crate::error::{Error, Result};
use crate::sequencer::{Song, Track};
use crate::time::{EventKind, TICKS_PER_BEAT};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Where scheduled events are delivered. Implementations are provided by
/// the environment (a hardware port, a synth, a test collector) and must
/// accept concurrent sends from multiple track threads.
pub trait MidiSink: Send + Sync {
    fn note_on(&self, pitch: u8, velocity: u8, channel: u8);
    fn note_off(&self, pitch: u8, channel: u8);
}

/// Lifecycle of one scheduled track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Done,
}

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_DONE: u8 = 2;

/// Handle to one playing track: query its state or block until done.
pub struct PlaybackHandle {
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl PlaybackHandle {
    pub fn state(&self) -> PlaybackState {
        match self.state.load(Ordering::Acquire) {
            STATE_IDLE => PlaybackState::Idle,
            STATE_RUNNING => PlaybackState::Running,
            _ => PlaybackState::Done,
        }
    }

    /// Block until the track finishes.
    pub fn wait(self) {
        let _ = self.handle.join();
    }
}

impl Track {
    /// Start playing on a dedicated thread; returns immediately with a
    /// handle. Events are dispatched in ascending tick order at wall-clock
    /// offsets derived from the tempo in effect at each tick.
    pub fn play(&self, sink: Arc<dyn MidiSink>) -> PlaybackHandle {
        let state = Arc::new(AtomicU8::new(STATE_IDLE));
        let thread_state = Arc::clone(&state);
        let track = self.clone();

        let handle = thread::spawn(move || {
            thread_state.store(STATE_RUNNING, Ordering::Release);
            debug!(track = %track.name, events = track.events().len(), "playback started");

            let start = Instant::now();
            for event in track.events() {
                let bpm = track.tempo_at(event.time);
                let due = Duration::from_secs_f64(
                    event.time as f64 / TICKS_PER_BEAT as f64 * 60.0 / bpm,
                );
                loop {
                    let elapsed = start.elapsed();
                    if elapsed >= due {
                        break;
                    }
                    thread::sleep(due - elapsed);
                }

                match event.kind {
                    EventKind::NoteOn => sink.note_on(event.pitch, event.velocity, track.channel),
                    EventKind::NoteOff => sink.note_off(event.pitch, track.channel),
                }
            }

            debug!(track = %track.name, "playback finished");
            thread_state.store(STATE_DONE, Ordering::Release);
        });

        PlaybackHandle { state, handle }
    }

    /// Play and block until the last event has been dispatched.
    pub fn play_blocking(&self, sink: Arc<dyn MidiSink>) {
        self.play(sink).wait();
    }
}

/// Handle to a whole playing song.
pub struct SongHandle {
    handles: Vec<PlaybackHandle>,
}

impl SongHandle {
    /// Block until every track has finished.
    pub fn wait(self) {
        for handle in self.handles {
            handle.wait();
        }
    }

    pub fn is_done(&self) -> bool {
        self.handles.iter().all(|h| h.state() == PlaybackState::Done)
    }
}

impl Song {
    /// Start every track on its own thread. Fails fast on an empty song
    /// rather than silently playing nothing.
    pub fn play(&self, sink: Arc<dyn MidiSink>) -> Result<SongHandle> {
        if self.tracks.is_empty() {
            return Err(Error::EmptySong);
        }
        let handles = self
            .tracks
            .iter()
            .map(|track| track.play(Arc::clone(&sink)))
            .collect();
        Ok(SongHandle { handles })
    }

    /// Play and block until every track has finished.
    pub fn play_blocking(&self, sink: Arc<dyn MidiSink>) -> Result<()> {
        self.play(sink)?.wait();
        Ok(())
    }

    /// Play the whole song `n` times back to back, blocking throughout.
    pub fn play_looped(&self, sink: Arc<dyn MidiSink>, n: usize) -> Result<()> {
        for _ in 0..n {
            self.play_blocking(Arc::clone(&sink))?;
        }
        Ok(())
    }
}

/// A sink that prints events to stdout — playback without hardware,
/// used by the demo binary.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl MidiSink for ConsoleSink {
    fn note_on(&self, pitch: u8, velocity: u8, channel: u8) {
        println!("note_on  ch={channel:<2} pitch={pitch:<3} vel={velocity}");
    }

    fn note_off(&self, pitch: u8, channel: u8) {
        println!("note_off ch={channel:<2} pitch={pitch:<3}");
    }
}
