// Diatonic keys and the chord/voicing algebra.
//
// A `Key` is a root pitch class plus a `Mode` (one of the seven rotations
// of the diatonic step pattern). Everything else is derived: the scale
// notes, their absolute pitches ascending from the root's reference
// octave, chords stacked from scale degrees, inversions, and voicings
// matched against a previous chord.
//
// Degree arithmetic is 1-indexed throughout: degree 1 is the root, degree
// 8 wraps back to the root (an octave up after rectification). Chord
// construction works in three steps — degree lookup, inversion, then
// rectification to a strictly ascending pitch sequence — followed by an
// optional octave-assignment search when matching a target voicing.

use crate::error::{Error, Result};
use crate::note::Note;
use crate::sequencer::Track;
use crate::time::{Measure, NoteLength, TimeSignature};
use serde::{Deserialize, Serialize};

/// The diatonic step pattern, in semitones, starting from Ionian.
const DIATONIC_STEPS: [u8; 7] = [2, 2, 1, 2, 2, 2, 1];

/// The seven rotations of the diatonic step pattern.
///
/// `Mode::MAJOR` and `Mode::MINOR` alias Ionian and Aeolian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Ionian = 1,
    Dorian = 2,
    Phrygian = 3,
    Lydian = 4,
    Mixolydian = 5,
    Aeolian = 6,
    Locrian = 7,
}

impl Mode {
    pub const MAJOR: Mode = Mode::Ionian;
    pub const MINOR: Mode = Mode::Aeolian;

    pub const ALL: [Mode; 7] = [
        Mode::Ionian,
        Mode::Dorian,
        Mode::Phrygian,
        Mode::Lydian,
        Mode::Mixolydian,
        Mode::Aeolian,
        Mode::Locrian,
    ];

    /// 1-indexed scale degree this mode begins on (Ionian = 1).
    pub fn degree(self) -> u8 {
        self as u8
    }

    /// The mode beginning `degrees` scale steps above this one, wrapping.
    /// `Mode::Ionian.offset(1)` is Dorian; `Mode::Ionian.offset(5)` is
    /// Aeolian — the rotation behind relative-key derivation.
    pub fn offset(self, degrees: i32) -> Mode {
        let idx = (self.degree() as i32 - 1 + degrees).rem_euclid(7);
        Mode::ALL[idx as usize]
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        match name.to_ascii_lowercase().as_str() {
            "ionian" | "major" => Some(Mode::Ionian),
            "dorian" => Some(Mode::Dorian),
            "phrygian" => Some(Mode::Phrygian),
            "lydian" => Some(Mode::Lydian),
            "mixolydian" => Some(Mode::Mixolydian),
            "aeolian" | "minor" => Some(Mode::Aeolian),
            "locrian" => Some(Mode::Locrian),
            _ => None,
        }
    }
}

/// Fixed chord shapes as lists of 1-indexed scale degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordForm {
    /// Rootless 3rd + 7th, the comping "shell".
    Shell,
    Triad,
    Seventh,
    Ninth,
    Eleventh,
    Thirteenth,
}

impl ChordForm {
    pub fn degrees(self) -> &'static [i32] {
        match self {
            ChordForm::Shell => &[3, 7],
            ChordForm::Triad => &[1, 3, 5],
            ChordForm::Seventh => &[1, 3, 5, 7],
            ChordForm::Ninth => &[1, 3, 5, 7, 9],
            ChordForm::Eleventh => &[1, 3, 5, 7, 9, 11],
            ChordForm::Thirteenth => &[1, 3, 5, 7, 9, 11, 13],
        }
    }
}

/// Rectify a pitch sequence in place: from left to right, raise each
/// element by octaves until it is strictly above its predecessor.
/// Deterministic and idempotent — an already-ascending sequence is
/// returned unchanged.
pub fn rectify(values: &mut [i16]) {
    for i in 1..values.len() {
        while values[i] <= values[i - 1] {
            values[i] += 12;
        }
    }
}

/// A root pitch class and mode, with the scale and chord algebra
/// derived from them. Plain value type; all methods are pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub root: Note,
    pub mode: Mode,
}

impl Key {
    pub fn new(root: Note, mode: Mode) -> Key {
        Key { root, mode }
    }

    /// The seven scale steps in semitones: the diatonic pattern rotated
    /// so this mode's step comes first.
    pub fn intervals(&self) -> [u8; 7] {
        let rot = (self.mode.degree() - 1) as usize;
        std::array::from_fn(|i| DIATONIC_STEPS[(i + rot) % 7])
    }

    /// The seven scale notes as pitch classes, root first.
    pub fn notes(&self) -> [Note; 7] {
        let intervals = self.intervals();
        let mut acc = 0i32;
        std::array::from_fn(|i| {
            if i > 0 {
                acc += intervals[i - 1] as i32;
            }
            self.root.offset(acc)
        })
    }

    /// Absolute pitches of the scale notes, strictly ascending from the
    /// root's reference-octave value.
    pub fn note_values(&self) -> [u8; 7] {
        let intervals = self.intervals();
        let mut acc = 0u8;
        std::array::from_fn(|i| {
            if i > 0 {
                acc += intervals[i - 1];
            }
            self.root.value() + acc
        })
    }

    /// The scale note at a 1-indexed degree, wrapping modulo 7.
    pub fn note(&self, degree: i32) -> Note {
        self.notes()[(degree - 1).rem_euclid(7) as usize]
    }

    /// Absolute pitch of a degree, before any octave rectification.
    fn degree_value(&self, degree: i32) -> i16 {
        self.note_values()[(degree - 1).rem_euclid(7) as usize] as i16
    }

    /// The key built on a scale degree, with the correspondingly rotated
    /// mode: the ii of C major is D Dorian, the vi is A Aeolian.
    pub fn relative_key(&self, degree: i32) -> Key {
        Key::new(self.note(degree), self.mode.offset(degree - 1))
    }

    /// Build a chord on this key's root: the 1-3-5 triad plus any
    /// extension degrees (7, 9, 11, 13), inverted and rectified, with an
    /// optional octave-assignment match against a previous voicing.
    ///
    /// `inversion` rotates the chord and drops an octave from the rotated
    /// head; it must be in [0, chord size).
    pub fn chord(
        &self,
        extensions: &[i32],
        inversion: usize,
        match_voicing: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut degrees = vec![1, 3, 5];
        degrees.extend_from_slice(extensions);
        if inversion >= degrees.len() {
            return Err(Error::InvalidInversion {
                inversion,
                size: degrees.len(),
            });
        }
        Ok(self.chord_from_degrees(&degrees, inversion, match_voicing))
    }

    /// The root-position triad.
    pub fn triad(&self) -> Vec<u8> {
        self.chord_from_degrees(&[1, 3, 5], 0, None)
    }

    /// A fixed chord form built on a scale degree of this key.
    pub fn form_chord(&self, degree: i32, form: ChordForm) -> Vec<u8> {
        let degrees: Vec<i32> = form.degrees().iter().map(|d| d + degree - 1).collect();
        self.chord_from_degrees(&degrees, 0, None)
    }

    /// Core chord construction. `inversion` is assumed in range.
    fn chord_from_degrees(
        &self,
        degrees: &[i32],
        inversion: usize,
        match_voicing: Option<&[u8]>,
    ) -> Vec<u8> {
        let raw: Vec<i16> = degrees.iter().map(|&d| self.degree_value(d)).collect();

        // Rotate by the inversion and drop the rotated head an octave.
        let mut values: Vec<i16> = if inversion == 0 {
            raw
        } else {
            raw[inversion..]
                .iter()
                .map(|v| v - 12)
                .chain(raw[..inversion].iter().copied())
                .collect()
        };

        rectify(&mut values);

        if let Some(targets) = match_voicing {
            values = match_octaves(&values, targets);
        }

        values
            .into_iter()
            .map(|v| v.clamp(0, 127) as u8)
            .collect()
    }
}

/// Choose an octave shift in {-12, 0, +12} for every chord pitch so the
/// summed distance to the target voicing is minimized.
///
/// Brute force over the full 3^n choice lattice (n <= 7), enumerated
/// lexicographically with the lower octave first; the first assignment
/// reaching the minimum wins ties.
fn match_octaves(values: &[i16], targets: &[u8]) -> Vec<i16> {
    const SHIFTS: [i16; 3] = [-12, 0, 12];
    let n = values.len();
    let combos = 3usize.pow(n as u32);

    let mut best: Option<(i32, Vec<i16>)> = None;
    for combo in 0..combos {
        let mut candidate = Vec::with_capacity(n);
        let mut rem = combo;
        // Most significant digit first keeps the enumeration lexicographic
        // over the per-pitch choice vector.
        for i in (0..n).rev() {
            let digit = (rem / 3usize.pow(i as u32)) % 3;
            rem %= 3usize.pow(i as u32);
            candidate.push(values[n - 1 - i] + SHIFTS[digit]);
        }

        let cost: i32 = candidate
            .iter()
            .flat_map(|&c| targets.iter().map(move |&t| (c as i32 - t as i32).abs()))
            .sum();

        match &best {
            Some((best_cost, _)) if cost >= *best_cost => {}
            _ => best = Some((cost, candidate)),
        }
    }

    match best {
        Some((_, candidate)) => candidate,
        None => values.to_vec(),
    }
}

/// A parsed chord symbol: the resolved key plus the expanded extension
/// degrees and any suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSymbol {
    pub key: Key,
    /// Expanded odd extension degrees, e.g. "9" becomes [7, 9].
    pub extensions: Vec<i32>,
    /// Suspension degree replacing the 3rd (2 or 4), if any.
    pub sus: Option<i32>,
}

impl ChordSymbol {
    /// The chord pitches in root position.
    pub fn pitches(&self) -> Vec<u8> {
        let mut degrees = vec![1, 3, 5];
        if let Some(s) = self.sus {
            degrees[1] = s;
        }
        degrees.extend_from_slice(&self.extensions);
        self.key.chord_from_degrees(&degrees, 0, None)
    }
}

impl Key {
    /// Parse a compact chord symbol.
    ///
    /// Grammar: a context root letter (with optional accidental), then
    /// either an absolute chord-root letter or a roman-numeral degree,
    /// then an optional quality (`maj`/`min`/`M`/`m`), an optional
    /// `sus[2|4]`, and an optional odd numeric extension 7-13.
    ///
    /// A roman numeral resolves through the relative key of the context
    /// major key ("Cii" is D Dorian); an explicit quality overrides the
    /// rotated mode. An absolute root ignores the context beyond spelling
    /// ("CDm7" is a D minor seventh in a C chart).
    pub fn parse(text: &str) -> Result<ChordSymbol> {
        let fail = |reason: &str| Error::ChordParse {
            symbol: text.to_string(),
            reason: reason.to_string(),
        };

        let s = text.trim();
        let (context_root, rest) = take_note(s).ok_or_else(|| fail("expected a root note"))?;

        let (key, rest) = if let Some((chord_root, rest)) = take_note(rest) {
            let (quality, rest) = take_quality(rest);
            (Key::new(chord_root, quality.unwrap_or(Mode::MAJOR)), rest)
        } else if let Some((degree, rest)) = take_roman(rest) {
            let relative = Key::new(context_root, Mode::MAJOR).relative_key(degree);
            let (quality, rest) = take_quality(rest);
            let key = match quality {
                Some(mode) => Key::new(relative.root, mode),
                None => relative,
            };
            (key, rest)
        } else {
            let (quality, rest) = take_quality(rest);
            (Key::new(context_root, quality.unwrap_or(Mode::MAJOR)), rest)
        };

        let (sus, rest) = take_sus(rest);

        let extensions = if rest.is_empty() {
            Vec::new()
        } else {
            let n: i32 = rest
                .parse()
                .map_err(|_| fail("trailing text is not an extension number"))?;
            if n < 7 || n > 13 || n % 2 == 0 {
                return Err(fail("extension must be an odd degree from 7 to 13"));
            }
            (7..=n).step_by(2).collect()
        };

        Ok(ChordSymbol {
            key,
            extensions,
            sus,
        })
    }

    /// Parse a chord symbol straight to its pitches.
    pub fn parse_chord(text: &str) -> Result<Vec<u8>> {
        Ok(Key::parse(text)?.pitches())
    }
}

fn take_note(s: &str) -> Option<(Note, &str)> {
    let first = s.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    // Longest match first so accidentals stay attached to their letter.
    for len in [2, 1] {
        if s.len() >= len {
            if let Some(note) = Note::from_name(&s[..len]) {
                return Some((note, &s[len..]));
            }
        }
    }
    None
}

fn take_roman(s: &str) -> Option<(i32, &str)> {
    const NUMERALS: [(&str, i32); 7] = [
        ("vii", 7),
        ("iii", 3),
        ("iv", 4),
        ("vi", 6),
        ("ii", 2),
        ("v", 5),
        ("i", 1),
    ];
    for (numeral, degree) in NUMERALS {
        if s.len() >= numeral.len() && s[..numeral.len()].eq_ignore_ascii_case(numeral) {
            return Some((degree, &s[numeral.len()..]));
        }
    }
    None
}

fn take_quality(s: &str) -> (Option<Mode>, &str) {
    if let Some(rest) = s.strip_prefix("maj") {
        (Some(Mode::MAJOR), rest)
    } else if let Some(rest) = s.strip_prefix("min") {
        (Some(Mode::MINOR), rest)
    } else if let Some(rest) = s.strip_prefix('M') {
        (Some(Mode::MAJOR), rest)
    } else if let Some(rest) = s.strip_prefix('m') {
        (Some(Mode::MINOR), rest)
    } else {
        (None, s)
    }
}

fn take_sus(s: &str) -> (Option<i32>, &str) {
    match s.strip_prefix("sus") {
        Some(rest) => {
            if let Some(r) = rest.strip_prefix('2') {
                (Some(2), r)
            } else if let Some(r) = rest.strip_prefix('4') {
                (Some(4), r)
            } else {
                (Some(4), rest)
            }
        }
        None => (None, s),
    }
}

impl Key {
    /// An ascending one-octave scale run as a single-measure track:
    /// the seven scale notes plus the root an octave up, one per beat.
    pub fn to_track(&self, velocity: u8, gate: f64, tempo: f64) -> Result<Track> {
        let mut pattern: Vec<Option<Vec<u8>>> = self
            .note_values()
            .iter()
            .map(|&v| Some(vec![v]))
            .collect();
        pattern.push(Some(vec![self.root.value() + 12]));

        let measure = Measure::from_pattern(
            &pattern,
            TimeSignature::new(8, NoteLength::Quarter),
            tempo,
            velocity,
            gate,
        )?;
        let name = format!("{} {:?} scale", self.root, self.mode);
        Ok(Track::from_measures(&[measure], 0, None, &name, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_major_notes() {
        let key = Key::new(Note::C, Mode::MAJOR);
        assert_eq!(
            key.notes(),
            [Note::C, Note::D, Note::E, Note::F, Note::G, Note::A, Note::B]
        );
    }

    #[test]
    fn c_aeolian_notes() {
        let key = Key::new(Note::C, Mode::Aeolian);
        assert_eq!(
            key.notes(),
            [
                Note::C,
                Note::D,
                Note::DSharp,
                Note::F,
                Note::G,
                Note::GSharp,
                Note::ASharp
            ]
        );
    }

    #[test]
    fn scale_invariants_all_keys() {
        for root in Note::ALL {
            for mode in Mode::ALL {
                let key = Key::new(root, mode);
                assert_eq!(key.notes()[0], root);
                let values = key.note_values();
                for pair in values.windows(2) {
                    assert!(pair[0] < pair[1], "{root} {mode:?}: {values:?}");
                }
            }
        }
    }

    #[test]
    fn c_major_triad() {
        assert_eq!(Key::new(Note::C, Mode::MAJOR).triad(), vec![60, 64, 67]);
    }

    #[test]
    fn mixolydian_dominant_seventh() {
        let chord = Key::new(Note::C, Mode::Mixolydian).chord(&[7], 0, None).unwrap();
        assert_eq!(chord, vec![60, 64, 67, 70]); // C E G Bb
    }

    #[test]
    fn e_minor_ninth() {
        let chord = Key::new(Note::E, Mode::MINOR).chord(&[9], 0, None).unwrap();
        // E G B F#, the ninth rectified an octave up.
        assert_eq!(chord, vec![64, 67, 71, 78]);
    }

    #[test]
    fn e_minor_ninth_first_inversion() {
        let chord = Key::new(Note::E, Mode::MINOR).chord(&[9], 1, None).unwrap();
        assert_eq!(chord, vec![55, 59, 66, 76]);
    }

    #[test]
    fn inversion_out_of_range() {
        let result = Key::new(Note::C, Mode::MAJOR).chord(&[], 3, None);
        assert!(matches!(
            result,
            Err(Error::InvalidInversion { inversion: 3, size: 3 })
        ));
    }

    #[test]
    fn inversion_preserves_pitch_class_set() {
        let key = Key::new(Note::E, Mode::MINOR);
        let root_position = key.chord(&[9], 0, None).unwrap();
        let mut expected: Vec<u8> = root_position.iter().map(|p| p % 12).collect();
        expected.sort_unstable();

        for inversion in 1..4 {
            let inverted = key.chord(&[9], inversion, None).unwrap();
            let mut classes: Vec<u8> = inverted.iter().map(|p| p % 12).collect();
            classes.sort_unstable();
            assert_eq!(classes, expected, "inversion {inversion}");
        }
    }

    #[test]
    fn rectify_is_idempotent() {
        let mut values = vec![64i16, 67, 71, 66];
        rectify(&mut values);
        let once = values.clone();
        rectify(&mut values);
        assert_eq!(values, once);
    }

    #[test]
    fn relative_keys() {
        let c = Key::new(Note::C, Mode::MAJOR);
        assert_eq!(c.relative_key(6), Key::new(Note::A, Mode::Aeolian));
        assert_eq!(c.relative_key(2), Key::new(Note::D, Mode::Dorian));
        assert_eq!(c.relative_key(1), c);
    }

    #[test]
    fn voicing_match_zero_distance() {
        let key = Key::new(Note::C, Mode::MAJOR);
        let prev = key.triad();
        assert_eq!(key.chord(&[], 0, Some(&prev)).unwrap(), prev);
    }

    #[test]
    fn voicing_match_pulls_seventh_down() {
        let key = Key::new(Note::C, Mode::MAJOR);
        let prev = key.triad();
        let mut expected = prev.clone();
        expected.push(59); // B dropped an octave toward the triad
        assert_eq!(key.chord(&[7], 0, Some(&prev)).unwrap(), expected);
    }

    #[test]
    fn shell_form() {
        let key = Key::new(Note::C, Mode::MAJOR);
        assert_eq!(key.form_chord(1, ChordForm::Shell), vec![64, 71]); // E B
        assert_eq!(key.form_chord(1, ChordForm::Triad), key.triad());
    }

    #[test]
    fn parse_absolute_and_roman() {
        let maj7 = Key::parse("Cmaj7").unwrap();
        assert_eq!(maj7.key, Key::new(Note::C, Mode::MAJOR));
        assert_eq!(maj7.extensions, vec![7]);

        let two = Key::parse("Cii").unwrap();
        assert_eq!(two.key, Key::new(Note::D, Mode::Dorian));

        let five = Key::parse("CV7").unwrap();
        assert_eq!(five.key, Key::new(Note::G, Mode::Mixolydian));
        assert_eq!(five.extensions, vec![7]);

        let dm7 = Key::parse("CDm7").unwrap();
        assert_eq!(dm7.key, Key::new(Note::D, Mode::MINOR));
        assert_eq!(dm7.extensions, vec![7]);

        let m9 = Key::parse("Cm9").unwrap();
        assert_eq!(m9.key, Key::new(Note::C, Mode::MINOR));
        assert_eq!(m9.extensions, vec![7, 9]);
    }

    #[test]
    fn parse_sus() {
        let sus = Key::parse("Csus4").unwrap();
        assert_eq!(sus.sus, Some(4));
        // The 3rd is replaced by the 4th.
        assert_eq!(sus.pitches(), vec![60, 65, 67]);

        let sus2 = Key::parse("Csus2").unwrap();
        assert_eq!(sus2.pitches(), vec![60, 62, 67]);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(Key::parse("xyz"), Err(Error::ChordParse { .. })));
        assert!(matches!(Key::parse("C5"), Err(Error::ChordParse { .. })));
        assert!(matches!(Key::parse("Cmaj8"), Err(Error::ChordParse { .. })));
        assert!(matches!(Key::parse(""), Err(Error::ChordParse { .. })));
    }

    #[test]
    fn scale_track_runs_one_octave() {
        let track = Key::new(Note::C, Mode::MAJOR).to_track(90, 1.0, 120.0).unwrap();
        assert_eq!(track.duration_ticks, 8 * 480);
        let ons: Vec<u8> = track
            .events()
            .iter()
            .filter(|e| e.kind == crate::time::EventKind::NoteOn)
            .map(|e| e.pitch)
            .collect();
        assert_eq!(ons, vec![60, 62, 64, 65, 67, 69, 71, 72]);
    }

    #[test]
    fn parse_chord_pitches() {
        // ii of C: D Dorian seventh chord.
        let pitches = Key::parse_chord("Cii7").unwrap();
        assert_eq!(pitches, vec![62, 65, 69, 72]); // D F A C
    }
}
