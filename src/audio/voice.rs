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

//! The sound source shared between an engine and its output stream callback.

use crate::note::Note;

use super::{sampler::Instrument, sine::Oscillator};

enum Source {
    Sine(Oscillator),
    Sampler(Box<Instrument>),
}

/// A single gated sound source. While the gate is closed the sine source renders silence.
/// The sampler keeps rendering so that released keys ring out.
pub struct Voice {
    source: Source,
    playing: bool,
}

impl Voice {
    /// A sine voice tuned to the note.
    pub fn sine(note: &Note, sample_rate: u32) -> Voice {
        Voice {
            source: Source::Sine(Oscillator::new(note.frequency(), sample_rate)),
            playing: false,
        }
    }

    /// A sampler voice keyed to the note.
    pub fn sampler(mut instrument: Instrument, note: &Note) -> Voice {
        instrument.set_key(note.id());
        Voice {
            source: Source::Sampler(Box::new(instrument)),
            playing: false,
        }
    }

    /// Returns true if the gate is open.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_note(&mut self, note: &Note) {
        match &mut self.source {
            Source::Sine(oscillator) => oscillator.set_frequency(note.frequency()),
            Source::Sampler(instrument) => instrument.set_key(note.id()),
        }
    }

    /// Opens the gate. Restarting a playing sampler retriggers the key.
    pub fn start(&mut self) {
        if let Source::Sampler(instrument) = &mut self.source {
            instrument.note_off();
            instrument.note_on();
        }
        self.playing = true;
    }

    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        if let Source::Sampler(instrument) = &mut self.source {
            instrument.note_off();
        }
        self.playing = false;
    }

    /// Renders the next block of interleaved output.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        match &mut self.source {
            Source::Sine(oscillator) if self.playing => oscillator.fill(data, channels),
            Source::Sine(_) => data.fill(0.0),
            Source::Sampler(instrument) => instrument.fill(data, channels),
        }
    }
}
