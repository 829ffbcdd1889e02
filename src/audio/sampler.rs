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

//! SoundFont instrument playback.
//!
//! An instrument is loaded from a `.sf2` file and rendered through a `rustysynth`
//! synthesizer. Notes are triggered on channel 0, which defaults to bank 0, program 0.

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use tracing::info;

use super::AudioError;

/// The MIDI channel notes are triggered on.
const CHANNEL: i32 = 0;

/// The velocity notes are triggered with.
const VELOCITY: i32 = 64;

/// A loaded SoundFont instrument playing at most one key at a time.
pub struct Instrument {
    synthesizer: Synthesizer,
    /// The MIDI key sounded on the next note on.
    key: i32,
    /// Scratch buffers for the synthesizer's stereo output.
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Instrument {
    /// Loads an instrument from a SoundFont file.
    pub fn load(path: &Path, sample_rate: u32) -> Result<Instrument, AudioError> {
        let instrument_error = |reason: String| AudioError::Instrument {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = BufReader::new(File::open(path)?);
        let sound_font =
            Arc::new(SoundFont::new(&mut reader).map_err(|e| instrument_error(e.to_string()))?);
        let settings = SynthesizerSettings::new(sample_rate as i32);
        let synthesizer =
            Synthesizer::new(&sound_font, &settings).map_err(|e| instrument_error(e.to_string()))?;

        info!(path = ?path, sample_rate, "Loaded instrument");

        Ok(Instrument {
            synthesizer,
            key: 0,
            left: Vec::new(),
            right: Vec::new(),
        })
    }

    /// Sets the key to sound on the next note on.
    pub fn set_key(&mut self, key: i32) {
        self.key = key;
    }

    /// Triggers the current key.
    pub fn note_on(&mut self) {
        self.synthesizer.note_on(CHANNEL, self.key, VELOCITY);
    }

    /// Releases every sounding key.
    pub fn note_off(&mut self) {
        self.synthesizer.note_off_all(false);
    }

    /// Renders into an interleaved buffer. Mono outputs receive the average of both sides.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        let frames = data.len() / channels.max(1);
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
        self.synthesizer.render(&mut self.left, &mut self.right);
        interleave(&self.left, &self.right, data, channels);
    }
}

/// Writes stereo frames into an interleaved buffer. Channels past the second are silent,
/// as is any trailing partial frame.
fn interleave(left: &[f32], right: &[f32], data: &mut [f32], channels: usize) {
    let channels = channels.max(1);
    let mut frames = data.chunks_exact_mut(channels);
    for (frame, (l, r)) in (&mut frames).zip(left.iter().zip(right.iter())) {
        match frame.len() {
            1 => frame[0] = (l + r) * 0.5,
            _ => {
                frame[0] = *l;
                frame[1] = *r;
                frame[2..].fill(0.0);
            }
        }
    }
    frames.into_remainder().fill(0.0);
}
