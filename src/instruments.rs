// Instrument name to program/pitch lookup.
//
// Two built-in maps cover the common cases: General MIDI program numbers
// for melodic instruments, and channel-10 percussion keys. Custom maps
// load from JSON files shaped `{"Name": number, ...}`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A name -> number lookup. For melodic maps the number is a General MIDI
/// program; for percussion maps it is the pitch to strike on channel 9.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMap(BTreeMap<String, u8>);

impl InstrumentMap {
    /// Load a map from a JSON file.
    pub fn load(path: &Path) -> Result<InstrumentMap> {
        let data = std::fs::read_to_string(path)?;
        let map: InstrumentMap = serde_json::from_str(&data)?;
        Ok(map)
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// General MIDI program numbers for a working subset of the melodic
    /// instruments.
    pub fn general_midi() -> InstrumentMap {
        let entries: [(&str, u8); 16] = [
            ("Acoustic Grand Piano", 0),
            ("Electric Piano", 4),
            ("Harpsichord", 6),
            ("Vibraphone", 11),
            ("Church Organ", 19),
            ("Acoustic Guitar", 24),
            ("Electric Guitar Clean", 27),
            ("Acoustic Bass", 32),
            ("Electric Bass Finger", 33),
            ("Violin", 40),
            ("Cello", 42),
            ("String Ensemble", 48),
            ("Choir Aahs", 52),
            ("Trumpet", 56),
            ("Tenor Sax", 66),
            ("Flute", 73),
        ];
        InstrumentMap(
            entries
                .iter()
                .map(|&(name, program)| (name.to_string(), program))
                .collect(),
        )
    }

    /// Channel-10 percussion keys for a standard kit.
    pub fn percussion() -> InstrumentMap {
        let entries: [(&str, u8); 12] = [
            ("Kick Drum", 36),
            ("Snare Cross Stick", 37),
            ("Snare", 38),
            ("Hand Clap", 39),
            ("Floor Tom", 43),
            ("Hi-Hat Closed", 42),
            ("Hi-Hat Pedal", 44),
            ("Hi-Hat Open", 46),
            ("Crash Cymbal", 49),
            ("Ride Cymbal", 51),
            ("Ride Bell", 53),
            ("Claves", 75),
        ];
        InstrumentMap(
            entries
                .iter()
                .map(|&(name, pitch)| (name.to_string(), pitch))
                .collect(),
        )
    }
}
