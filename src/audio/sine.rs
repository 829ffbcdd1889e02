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
use std::f32::consts::TAU;

/// Default output level of the oscillator.
const DEFAULT_AMPLITUDE: f32 = 0.5;

/// A phase-accumulating sine oscillator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Phase advance per sample, in radians.
    phase_inc: f32,
    /// Current phase in [0, TAU).
    phase: f32,
    amplitude: f32,
    sample_rate: u32,
}

impl Oscillator {
    /// Creates an oscillator at the given frequency.
    pub fn new(frequency: f32, sample_rate: u32) -> Oscillator {
        let mut oscillator = Oscillator {
            phase_inc: 0.0,
            phase: 0.0,
            amplitude: DEFAULT_AMPLITUDE,
            sample_rate,
        };
        oscillator.set_frequency(frequency);
        oscillator
    }

    /// Retunes the oscillator without resetting its phase, so the waveform stays continuous.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.phase_inc = TAU * frequency / self.sample_rate as f32;
    }

    /// Produces the next sample.
    pub fn next_sample(&mut self) -> f32 {
        let sample = self.phase.sin() * self.amplitude;
        self.phase += self.phase_inc;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        sample
    }

    /// Fills an interleaved buffer, writing the same sample to every channel of a frame.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            frame.fill(self.next_sample());
        }
    }
}
