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
use std::fmt;

use serde::Deserialize;

/// How a note is turned into sound.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// A generated sine tone.
    #[default]
    Sine,
    /// A note triggered on a SoundFont instrument.
    Sampler,
}

/// The configuration an engine is built for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisMode {
    Sine,
    Sampler { instrument: String },
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisMode::Sine => write!(f, "sine"),
            SynthesisMode::Sampler { instrument } => write!(f, "sampler ({})", instrument),
        }
    }
}

/// The user's playback preferences, passed by value into every play call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// The playback mode.
    mode: PlaybackMode,
    /// The selected instrument file. Only used in sampler mode.
    instrument: String,
}

impl PlaybackSettings {
    /// Creates new playback settings.
    pub fn new(mode: PlaybackMode, instrument: &str) -> PlaybackSettings {
        PlaybackSettings {
            mode,
            instrument: instrument.to_string(),
        }
    }

    /// Settings for a plain sine tone.
    pub fn sine() -> PlaybackSettings {
        PlaybackSettings::new(PlaybackMode::Sine, "")
    }

    /// Settings for the given SoundFont instrument.
    pub fn sampler(instrument: &str) -> PlaybackSettings {
        PlaybackSettings::new(PlaybackMode::Sampler, instrument)
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// The synthesis mode an engine must be built for to honor these settings. The
    /// instrument only matters in sampler mode.
    pub fn synthesis(&self) -> SynthesisMode {
        match self.mode {
            PlaybackMode::Sine => SynthesisMode::Sine,
            PlaybackMode::Sampler => SynthesisMode::Sampler {
                instrument: self.instrument.clone(),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_synthesis_ignores_instrument_for_sine() {
        let a = PlaybackSettings::new(PlaybackMode::Sine, "Piano.sf2");
        let b = PlaybackSettings::new(PlaybackMode::Sine, "Organ.sf2");
        assert_ne!(a, b);
        assert_eq!(a.synthesis(), b.synthesis());
        assert_eq!(a.synthesis(), SynthesisMode::Sine);
    }

    #[test]
    fn test_synthesis_keeps_instrument_for_sampler() {
        let a = PlaybackSettings::sampler("Piano.sf2");
        let b = PlaybackSettings::sampler("Organ.sf2");
        assert_ne!(a.synthesis(), b.synthesis());
        assert_eq!(
            a.synthesis(),
            SynthesisMode::Sampler {
                instrument: "Piano.sf2".to_string()
            }
        );
        assert_eq!(a.synthesis().to_string(), "sampler (Piano.sf2)");
    }
}
