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

//! Equal-tempered tuning and note generation.
//!
//! Notes are identified by their MIDI number, derived from an octave and a pitch-class
//! index as `(octave + 1) * 12 + index`. Frequencies follow A4 = 440 Hz.

use std::ops::RangeInclusive;

use crate::note::{Note, NATURAL_INDICES, PITCH_CLASSES};

/// The reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// The MIDI number of A4.
pub const A4_MIDI: i32 = 69;

/// Errors produced when building a note from a name and an octave.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NoteError {
    #[error("unknown pitch class '{0}'")]
    UnknownPitchClass(String),
    #[error("{name}{octave} (MIDI {id}) is outside the playable range")]
    OutOfRange { name: String, octave: i32, id: i32 },
}

/// Converts a MIDI note number into a frequency in Hz. Defined for every integer.
pub fn frequency_from_midi(id: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((id - A4_MIDI) as f32 / 12.0)
}

/// Converts an octave and a pitch-class index (0-11) into a MIDI note number.
pub fn midi_from_octave_and_index(octave: i32, index: usize) -> i32 {
    (octave + 1) * 12 + index as i32
}

/// Returns the index of the given pitch-class name, if it is known.
pub fn pitch_class_index(name: &str) -> Option<usize> {
    PITCH_CLASSES.iter().position(|candidate| *candidate == name)
}

fn selected_indices(include_accidentals: bool) -> Vec<usize> {
    if include_accidentals {
        (0..PITCH_CLASSES.len()).collect()
    } else {
        NATURAL_INDICES.to_vec()
    }
}

fn build_note(octave: i32, index: usize) -> Note {
    let id = midi_from_octave_and_index(octave, index);
    Note::new(PITCH_CLASSES[index], frequency_from_midi(id), octave, id)
}

/// Generates every valid note in the octave range, octave by octave and in ascending
/// pitch-class order within each octave. Notes outside the valid MIDI or octave range are
/// left out.
pub fn enumerate_notes(octaves: RangeInclusive<i32>, include_accidentals: bool) -> Vec<Note> {
    let indices = selected_indices(include_accidentals);

    octaves
        .flat_map(|octave| indices.iter().map(move |index| build_note(octave, *index)))
        .filter(Note::is_valid)
        .collect()
}

/// Returns the pitch-class names that make up a choice set.
pub fn pitch_class_names(include_accidentals: bool) -> Vec<&'static str> {
    selected_indices(include_accidentals)
        .into_iter()
        .map(|index| PITCH_CLASSES[index])
        .collect()
}

/// The natural pitch-class names.
pub fn natural_names() -> Vec<&'static str> {
    pitch_class_names(false)
}

/// The accidental pitch-class names. Empty when accidentals are excluded.
pub fn accidental_names(include_accidentals: bool) -> Vec<&'static str> {
    if !include_accidentals {
        return Vec::new();
    }

    let naturals = natural_names();
    pitch_class_names(true)
        .into_iter()
        .filter(|name| !naturals.contains(name))
        .collect()
}

/// Normalizes typed input into a pitch-class name: the letter is upper-cased and `#` is
/// accepted for `♯`, so "c#" becomes "C♯". The result is not validated.
pub fn normalize_pitch_class(input: &str) -> String {
    let mut chars = input.trim().chars();
    match chars.next() {
        Some(letter) => letter
            .to_uppercase()
            .chain(chars.map(|c| if c == '#' { '♯' } else { c }))
            .collect(),
        None => String::new(),
    }
}

/// Builds the note with the given pitch-class name in the given octave.
pub fn note_from_name_and_octave(name: &str, octave: i32) -> Result<Note, NoteError> {
    let index =
        pitch_class_index(name).ok_or_else(|| NoteError::UnknownPitchClass(name.to_string()))?;

    let note = build_note(octave, index);
    if !note.is_valid() {
        return Err(NoteError::OutOfRange {
            name: name.to_string(),
            octave,
            id: note.id(),
        });
    }

    Ok(note)
}
