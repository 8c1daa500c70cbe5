// Humanization: pure Measure -> Measure transforms that perturb timing
// and velocity to take the machine edge off generated parts.
//
// Every transform preserves event count and note-on/note-off pairing
// (except `dropout`, which removes whole pairs). Transforms compose by
// `Measure::mutate` chaining; order matters since each one sees the
// times and velocities left by the previous.

use crate::time::{EventKind, Measure, NoteEvent, TICKS_PER_BEAT};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use tracing::warn;

/// Push events later in proportion to their fractional position within
/// their beat: on-beat events stay put, off-grid events swing by up to
/// `amount` of a beat.
pub fn swing(measure: Measure, amount: f64) -> Measure {
    let shift = amount * TICKS_PER_BEAT as f64;
    let events = measure
        .events
        .iter()
        .map(|e| {
            let frac = (e.time % TICKS_PER_BEAT) as f64 / TICKS_PER_BEAT as f64;
            NoteEvent {
                time: (e.time as f64 + frac * shift).max(0.0) as u32,
                ..*e
            }
        })
        .collect();
    Measure { events, ..measure }
}

/// Gaussian timing jitter (sigma = `amount` beats) applied per note-on,
/// with the matched note-off moved by the identical offset so the note's
/// duration survives. A note-on without a matching note-off is a
/// data-quality wart in the input: it is jittered alone and logged, never
/// dropped. Times clamp at zero and the result is re-sorted.
pub fn randomize_time(measure: Measure, amount: f64, rng: &mut impl Rng) -> Measure {
    let Ok(normal) = Normal::new(0.0, amount * TICKS_PER_BEAT as f64) else {
        return measure;
    };

    let pairs = pair_note_offs(&measure.events);
    let mut events = measure.events.clone();
    for i in 0..events.len() {
        if events[i].kind != EventKind::NoteOn {
            continue;
        }
        let offset = normal.sample(rng);
        events[i].time = shifted_time(measure.events[i].time, offset);
        match pairs[i] {
            Some(j) => events[j].time = shifted_time(measure.events[j].time, offset),
            None => warn!(
                pitch = measure.events[i].pitch,
                time = measure.events[i].time,
                "note-on without a matching note-off; jittering it alone"
            ),
        }
    }
    events.sort_by_key(|e| e.time);
    Measure { events, ..measure }
}

/// Gaussian velocity jitter with sigma = `amount` of the full 0-127
/// range, clamped to stay valid.
pub fn randomize_velocity(measure: Measure, amount: f64, rng: &mut impl Rng) -> Measure {
    let Ok(normal) = Normal::new(0.0, amount * 127.0) else {
        return measure;
    };

    let events = measure
        .events
        .iter()
        .map(|e| NoteEvent {
            velocity: (e.velocity as f64 + normal.sample(rng)).clamp(0.0, 127.0) as u8,
            ..*e
        })
        .collect();
    Measure { events, ..measure }
}

/// Periodic velocity attenuation for a metric accent: events on one beat
/// parity duck fully, events on the other duck only as they stray from
/// the beat. `ducking` of 1 silences the attenuated beats entirely.
pub fn pulse(measure: Measure, even: bool, ducking: f64) -> Measure {
    let events = measure
        .events
        .iter()
        .map(|e| {
            let mut beat = e.time / TICKS_PER_BEAT;
            let mut frac = (e.time % TICKS_PER_BEAT) as f64 / TICKS_PER_BEAT as f64;
            // Fold the second half of the beat onto the next beat, so the
            // phase measures distance to the nearest beat.
            if frac > 0.5 {
                frac = 1.0 - frac;
                beat += 1;
            }

            let off_beat = (beat % 2 == 0) == even;
            let factor = if off_beat {
                1.0 - ducking * (frac * PI / 2.0).cos()
            } else {
                1.0 - ducking * (frac * PI / 2.0).sin()
            };
            NoteEvent {
                velocity: (e.velocity as f64 * factor).clamp(0.0, 127.0) as u8,
                ..*e
            }
        })
        .collect();
    Measure { events, ..measure }
}

/// Independently drop each note-on/note-off pair with the given
/// probability.
pub fn dropout(measure: Measure, probability: f64, rng: &mut impl Rng) -> Measure {
    let pairs = pair_note_offs(&measure.events);
    let mut keep = vec![true; measure.events.len()];
    for i in 0..measure.events.len() {
        if measure.events[i].kind != EventKind::NoteOn {
            continue;
        }
        if rng.random_bool(probability.clamp(0.0, 1.0)) {
            keep[i] = false;
            if let Some(j) = pairs[i] {
                keep[j] = false;
            }
        }
    }

    let events = measure
        .events
        .iter()
        .zip(&keep)
        .filter(|&(_, &k)| k)
        .map(|(e, _)| *e)
        .collect();
    Measure { events, ..measure }
}

/// A tick moved by a float offset, clamped at zero.
fn shifted_time(time: u32, offset: f64) -> u32 {
    (time as f64 + offset).max(0.0) as u32
}

/// For each note-on, the index of its matching note-off: same pitch, time
/// at or after the note-on, earliest such event, each note-off claimed at
/// most once. Entries for non-note-ons and unmatched note-ons are `None`.
fn pair_note_offs(events: &[NoteEvent]) -> Vec<Option<usize>> {
    let mut claimed = vec![false; events.len()];
    let mut pairs = vec![None; events.len()];
    for i in 0..events.len() {
        if events[i].kind != EventKind::NoteOn {
            continue;
        }
        let mut best: Option<usize> = None;
        for (j, candidate) in events.iter().enumerate() {
            if claimed[j]
                || candidate.kind != EventKind::NoteOff
                || candidate.pitch != events[i].pitch
                || candidate.time < events[i].time
            {
                continue;
            }
            if best.is_none_or(|b| candidate.time < events[b].time) {
                best = Some(j);
            }
        }
        if let Some(j) = best {
            claimed[j] = true;
            pairs[i] = Some(j);
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhythm;
    use crate::time::TimeSignature;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn note_on_velocities(measure: &Measure) -> Vec<u8> {
        measure
            .events
            .iter()
            .filter(|e| e.kind == EventKind::NoteOn)
            .map(|e| e.velocity)
            .collect()
    }

    #[test]
    fn pulse_four_on_the_floor() {
        let kick = rhythm::four_on_the_floor(&[36], 127, 120.0).unwrap();
        assert_eq!(
            note_on_velocities(&pulse(kick.clone(), true, 1.0)),
            vec![0, 127, 0, 127]
        );
        assert_eq!(
            note_on_velocities(&pulse(kick, false, 1.0)),
            vec![127, 0, 127, 0]
        );
    }

    #[test]
    fn pulse_straight_eighths() {
        let hats = rhythm::straight_8ths(&[42], 127, 120.0).unwrap();
        assert_eq!(
            note_on_velocities(&pulse(hats, true, 1.0)),
            vec![0, 37, 127, 37, 0, 37, 127, 37]
        );
    }

    #[test]
    fn swing_moves_offbeats_only() {
        let m = Measure::new(
            TimeSignature::default(),
            120.0,
            vec![
                NoteEvent::note_on(0, 60, 100),
                NoteEvent::note_on(240, 62, 100),
                NoteEvent::note_on(480, 64, 100),
            ],
        );
        let swung = swing(m, 0.1);
        let times: Vec<u32> = swung.events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0, 264, 480]);
    }

    #[test]
    fn randomize_time_preserves_pairing() {
        // Distinct pitches so output pairing is unambiguous; times start
        // well above zero so the >= 0 clamp never distorts a duration.
        let events: Vec<NoteEvent> = (0..8u32)
            .flat_map(|i| {
                let pitch = 60 + i as u8;
                [
                    NoteEvent::note_on(1000 + i * 240, pitch, 100),
                    NoteEvent::note_off(1000 + i * 240 + 120, pitch),
                ]
            })
            .collect();
        let m = Measure::new(TimeSignature::default(), 120.0, events);

        let original_durations: Vec<(u8, i64)> = {
            let pairs = pair_note_offs(&m.events);
            m.events
                .iter()
                .enumerate()
                .filter(|(_, e)| e.kind == EventKind::NoteOn)
                .map(|(i, e)| {
                    let off = &m.events[pairs[i].unwrap()];
                    (e.pitch, off.time as i64 - e.time as i64)
                })
                .collect()
        };

        let mut rng = StdRng::seed_from_u64(7);
        let jittered = randomize_time(m, 0.02, &mut rng);
        assert_eq!(jittered.events.len(), 16);

        let pairs = pair_note_offs(&jittered.events);
        for (i, e) in jittered.events.iter().enumerate() {
            if e.kind != EventKind::NoteOn {
                continue;
            }
            let off = &jittered.events[pairs[i].expect("pairing survives jitter")];
            let duration = off.time as i64 - e.time as i64;
            let original = original_durations
                .iter()
                .find(|(p, _)| *p == e.pitch)
                .unwrap()
                .1;
            // Identical offset on both ends, so duration survives up to
            // integer truncation.
            assert!(
                (duration - original).abs() <= 1,
                "pitch {} duration {} vs {}",
                e.pitch,
                duration,
                original
            );
        }
    }

    #[test]
    fn randomize_time_output_is_sorted() {
        let pattern: Vec<Option<Vec<u8>>> = (0..16).map(|i| Some(vec![40 + i as u8])).collect();
        let m =
            Measure::from_pattern(&pattern, TimeSignature::default(), 120.0, 100, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let jittered = randomize_time(m, 0.1, &mut rng);
        for pair in jittered.events.windows(2) {
            assert!(pair[0].time <= pair[1].time);
        }
    }

    #[test]
    fn randomize_velocity_stays_in_range() {
        let pattern: Vec<Option<Vec<u8>>> = (0..4).map(|_| Some(vec![60])).collect();
        let m =
            Measure::from_pattern(&pattern, TimeSignature::default(), 120.0, 120, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let out = randomize_velocity(m, 0.5, &mut rng);
        assert_eq!(out.events.len(), 8);
        for e in &out.events {
            assert!(e.velocity <= 127);
        }
    }

    #[test]
    fn dropout_extremes() {
        let pattern: Vec<Option<Vec<u8>>> = (0..8).map(|i| Some(vec![50 + i as u8])).collect();
        let m =
            Measure::from_pattern(&pattern, TimeSignature::default(), 120.0, 100, 0.5).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(dropout(m.clone(), 0.0, &mut rng).events.len(), 16);
        assert!(dropout(m, 1.0, &mut rng).events.is_empty());
    }

    #[test]
    fn transforms_chain_through_mutate() {
        let kick = rhythm::four_on_the_floor(&[36], 127, 120.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let out = kick
            .mutate(|m| pulse(m, true, 0.5))
            .mutate(|m| randomize_velocity(m, 0.01, &mut rng))
            .mutate(|m| swing(m, 0.05));
        assert_eq!(out.events.len(), 8);
    }
}
