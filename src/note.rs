// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fmt, ops::RangeInclusive};

/// The twelve pitch-class names, starting at C. Accidentals use the Unicode sharp sign.
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Indices into `PITCH_CLASSES` of the natural (whole step) pitch classes.
pub const NATURAL_INDICES: [usize; 7] = [0, 2, 4, 5, 7, 9, 11];

/// The valid range of octaves.
pub const OCTAVE_RANGE: RangeInclusive<i32> = -1..=9;

/// The valid range of MIDI ids.
pub const MIDI_RANGE: RangeInclusive<i32> = 0..=127;

/// A pitch: its pitch-class name, octave, frequency and MIDI id.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// The MIDI note number.
    id: i32,
    /// The pitch-class name, e.g. "A" or "C♯".
    name: String,
    /// The frequency in Hz.
    frequency: f32,
    /// The octave, e.g. 4 for A4.
    octave: i32,
}

impl Note {
    /// Creates a new note. No validation is performed; see `is_valid`.
    pub fn new(name: &str, frequency: f32, octave: i32, id: i32) -> Note {
        Note {
            id,
            name: name.to_string(),
            frequency,
            octave,
        }
    }

    /// The MIDI note number.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// The pitch-class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// The octave.
    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Returns true if the frequency is positive and both the octave and the MIDI id
    /// are within their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.frequency > 0.0 && OCTAVE_RANGE.contains(&self.octave) && MIDI_RANGE.contains(&self.id)
    }
}

/// A4, 440 Hz.
impl Default for Note {
    fn default() -> Self {
        Note::new("A", 440.0, 4, 69)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} - {:.2} Hz", self.name, self.octave, self.frequency)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_a4() {
        let note = Note::default();
        assert_eq!(note.name(), "A");
        assert_eq!(note.octave(), 4);
        assert_eq!(note.id(), 69);
        assert_eq!(note.frequency(), 440.0);
        assert!(note.is_valid());
    }

    #[test]
    fn test_validity() {
        assert!(Note::new("C", 8.18, -1, 0).is_valid());
        assert!(Note::new("G", 12543.85, 9, 127).is_valid());

        // Octave out of range.
        assert!(!Note::new("C", 16.35, -2, 0).is_valid());
        assert!(!Note::new("C", 16744.04, 10, 132).is_valid());

        // MIDI id out of range even though the octave is fine.
        assert!(!Note::new("G♯", 13289.75, 9, 128).is_valid());

        // Non-positive frequency.
        assert!(!Note::new("A", 0.0, 4, 69).is_valid());
        assert!(!Note::new("A", -440.0, 4, 69).is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(Note::new("C", 261.6256, 4, 60).to_string(), "C4 - 261.63 Hz");
        assert_eq!(Note::default().to_string(), "A4 - 440.00 Hz");
    }

    #[test]
    fn test_pitch_class_table() {
        assert_eq!(PITCH_CLASSES.len(), 12);
        let naturals: Vec<&str> = NATURAL_INDICES.iter().map(|i| PITCH_CLASSES[*i]).collect();
        assert_eq!(naturals, vec!["C", "D", "E", "F", "G", "A", "B"]);
        assert!(naturals.iter().all(|name| !name.contains('♯')));
    }
}
