// The 12-tone pitch-class identity model.
//
// A `Note` is one of the twelve equal-tempered note names, octave-free.
// Absolute MIDI pitches are derived by placing a note in an octave, with
// octave 3 anchored at the conventional middle values (C3 = 60). Offsets
// wrap modulo 12, so `Note::B.offset(2)` is `Note::CSharp` — the identity
// is the pitch class, never a specific register.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the 12 equal-tempered pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Note {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl Note {
    pub const ALL: [Note; 12] = [
        Note::C,
        Note::CSharp,
        Note::D,
        Note::DSharp,
        Note::E,
        Note::F,
        Note::FSharp,
        Note::G,
        Note::GSharp,
        Note::A,
        Note::ASharp,
        Note::B,
    ];

    /// Pitch class in [0, 11], with C = 0.
    pub fn pitch_class(self) -> u8 {
        self as u8
    }

    /// Absolute MIDI pitch in the reference octave (octave 3, C = 60).
    pub fn value(self) -> u8 {
        60 + self.pitch_class()
    }

    /// Absolute MIDI pitch in the given octave. Octave 3 is the reference
    /// octave, so `Note::C.value_for_octave(3) == 60`. Valid results fit
    /// in the 0-127 MIDI range for octaves 0 through 8 (top of 8 excepted).
    pub fn value_for_octave(self, octave: u8) -> u8 {
        self.pitch_class() + 12 * (octave + 2)
    }

    /// The note for a pitch class (or any MIDI pitch, octave discarded).
    pub fn from_pitch_class(pc: u8) -> Note {
        Note::ALL[(pc % 12) as usize]
    }

    /// Shift by a semitone offset, wrapping modulo 12. Negative offsets
    /// move down. This replaces the arithmetic-operator idiom: the result
    /// is the nearest equivalent class name, not a register change.
    pub fn offset(self, semitones: i32) -> Note {
        let pc = (self.pitch_class() as i32 + semitones).rem_euclid(12);
        Note::ALL[pc as usize]
    }

    /// Parse a note name: a letter A-G plus an optional `#` or `b`.
    pub fn from_name(name: &str) -> Option<Note> {
        let mut chars = name.chars();
        let letter = chars.next()?;
        let natural = match letter {
            'C' => Note::C,
            'D' => Note::D,
            'E' => Note::E,
            'F' => Note::F,
            'G' => Note::G,
            'A' => Note::A,
            'B' => Note::B,
            _ => return None,
        };
        match chars.next() {
            None => Some(natural),
            Some('#') if chars.next().is_none() => Some(natural.offset(1)),
            Some('b') if chars.next().is_none() => Some(natural.offset(-1)),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Note::C => "C",
            Note::CSharp => "C#",
            Note::D => "D",
            Note::DSharp => "D#",
            Note::E => "E",
            Note::F => "F",
            Note::FSharp => "F#",
            Note::G => "G",
            Note::GSharp => "G#",
            Note::A => "A",
            Note::ASharp => "A#",
            Note::B => "B",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_octave_values() {
        assert_eq!(Note::C.value(), 60);
        assert_eq!(Note::A.value(), 69);
        assert_eq!(Note::B.value(), 71);
    }

    #[test]
    fn octave_placement() {
        assert_eq!(Note::C.value_for_octave(3), 60);
        assert_eq!(Note::C.value_for_octave(1), 36);
        assert_eq!(Note::A.value_for_octave(5), 93);
    }

    #[test]
    fn offset_wraps() {
        assert_eq!(Note::B.offset(1), Note::C);
        assert_eq!(Note::C.offset(-1), Note::B);
        assert_eq!(Note::C.offset(14), Note::D);
        assert_eq!(Note::E.offset(-16), Note::C);
    }

    #[test]
    fn offset_round_trip() {
        for note in Note::ALL {
            assert_eq!(note.offset(7).offset(-7), note);
        }
    }

    #[test]
    fn names_parse_back() {
        for note in Note::ALL {
            assert_eq!(Note::from_name(note.name()), Some(note));
        }
        assert_eq!(Note::from_name("Db"), Some(Note::CSharp));
        assert_eq!(Note::from_name("Bb"), Some(Note::ASharp));
        assert_eq!(Note::from_name("H"), None);
        assert_eq!(Note::from_name("C##"), None);
    }
}
