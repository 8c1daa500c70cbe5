// Stock percussion patterns as one-measure builders.
//
// Each builder takes the pitches struck on every hit (usually one drum,
// sometimes a layered pair), a velocity, and a tempo, and returns a 4/4
// measure on a sixteenth-note grid. Short gates keep percussive hits
// from overlapping when the measure is humanized afterward.

use crate::error::Result;
use crate::time::{Measure, TimeSignature};

/// Sixteenth slots per 4/4 measure.
const SLOTS: usize = 16;

/// Gate width for percussion hits, as a fraction of one slot.
const GATE: f64 = 0.1;

/// Build a measure from hit flags on the sixteenth grid: `true` slots
/// strike every pitch in `click` together.
pub fn pattern_measure(hits: &[bool; SLOTS], click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let pattern: Vec<Option<Vec<u8>>> = hits
        .iter()
        .map(|&hit| hit.then(|| click.to_vec()))
        .collect();
    Measure::from_pattern(&pattern, TimeSignature::default(), tempo, velocity, GATE)
}

/// A hit on every quarter-note beat.
pub fn four_on_the_floor(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let mut hits = [false; SLOTS];
    for slot in (0..SLOTS).step_by(4) {
        hits[slot] = true;
    }
    pattern_measure(&hits, click, velocity, tempo)
}

/// A hit on every eighth note.
pub fn straight_8ths(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let mut hits = [false; SLOTS];
    for slot in (0..SLOTS).step_by(2) {
        hits[slot] = true;
    }
    pattern_measure(&hits, click, velocity, tempo)
}

/// A hit on every sixteenth note.
pub fn straight_16ths(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    pattern_measure(&[true; SLOTS], click, velocity, tempo)
}

/// 3-2 son clave.
pub fn son_clave(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let mut hits = [false; SLOTS];
    for slot in [0, 3, 6, 10, 12] {
        hits[slot] = true;
    }
    pattern_measure(&hits, click, velocity, tempo)
}

/// 3-2 rumba clave: son clave with the third stroke pushed a sixteenth.
pub fn rumba_clave(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let mut hits = [false; SLOTS];
    for slot in [0, 3, 7, 10, 12] {
        hits[slot] = true;
    }
    pattern_measure(&hits, click, velocity, tempo)
}

/// Brush sweep: each beat plus its push a sixteenth before, played soft.
pub fn brushes(click: &[u8], velocity: u8, tempo: f64) -> Result<Measure> {
    let mut hits = [false; SLOTS];
    for slot in [0, 3, 4, 7, 8, 11, 12, 15] {
        hits[slot] = true;
    }
    pattern_measure(&hits, click, velocity, tempo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{EventKind, TICKS_PER_BEAT};

    fn note_on_ticks(measure: &Measure) -> Vec<u32> {
        measure
            .events
            .iter()
            .filter(|e| e.kind == EventKind::NoteOn)
            .map(|e| e.time)
            .collect()
    }

    #[test]
    fn four_on_the_floor_lands_on_beats() {
        let m = four_on_the_floor(&[36], 100, 120.0).unwrap();
        assert_eq!(
            note_on_ticks(&m),
            vec![0, TICKS_PER_BEAT, 2 * TICKS_PER_BEAT, 3 * TICKS_PER_BEAT]
        );
    }

    #[test]
    fn straight_grids() {
        assert_eq!(straight_8ths(&[42], 100, 120.0).unwrap().events.len(), 16);
        assert_eq!(straight_16ths(&[42], 100, 120.0).unwrap().events.len(), 32);
        // Sixteenth slots are 120 ticks apart.
        let m = straight_16ths(&[42], 100, 120.0).unwrap();
        assert_eq!(note_on_ticks(&m)[1], 120);
    }

    #[test]
    fn claves_have_five_strokes() {
        let son = son_clave(&[75], 100, 120.0).unwrap();
        assert_eq!(note_on_ticks(&son), vec![0, 360, 720, 1200, 1440]);
        let rumba = rumba_clave(&[75], 100, 120.0).unwrap();
        assert_eq!(note_on_ticks(&rumba), vec![0, 360, 840, 1200, 1440]);
    }

    #[test]
    fn brushes_push_every_beat() {
        let m = brushes(&[38], 40, 90.0).unwrap();
        assert_eq!(
            note_on_ticks(&m),
            vec![0, 360, 480, 840, 960, 1320, 1440, 1800]
        );
    }

    #[test]
    fn layered_click_strikes_together() {
        let m = four_on_the_floor(&[36, 42], 100, 120.0).unwrap();
        let ons = note_on_ticks(&m);
        assert_eq!(ons.len(), 8);
        assert_eq!(ons[0], ons[1]);
    }

    #[test]
    fn gates_are_short() {
        let m = four_on_the_floor(&[36], 100, 120.0).unwrap();
        let on = m.events[0];
        let off = m.events[1];
        assert_eq!(off.kind, EventKind::NoteOff);
        assert_eq!(off.time - on.time, 12);
    }
}
