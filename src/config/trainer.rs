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
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::{
    playback::PlaybackMode,
    player::DEFAULT_NOTE_DURATION,
    settings::{DEFAULT_HIGH_OCTAVE, DEFAULT_INSTRUMENT, DEFAULT_LOW_OCTAVE},
};

use super::error::ConfigError;

const DEFAULT_AUDIO_DEVICE: &str = "default";
const DEFAULT_INSTRUMENTS_DIR: &str = ".";

/// A YAML representation of the trainer configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Trainer {
    /// The audio output device.
    audio_device: Option<String>,

    /// The directory SoundFont instruments are loaded from.
    instruments: Option<String>,

    /// How long each note sounds.
    note_duration: Option<String>,

    /// Whether sharps are part of the quiz.
    include_accidentals: Option<bool>,

    low_octave: Option<i32>,
    high_octave: Option<i32>,

    /// Sine or sampler playback.
    mode: Option<PlaybackMode>,

    /// The SoundFont used in sampler mode.
    instrument: Option<String>,
}

impl Trainer {
    /// Creates a new trainer configuration that plays through the given device and loads
    /// instruments from the given directory.
    pub fn new(audio_device: &str, instruments: &Path) -> Trainer {
        Trainer {
            audio_device: Some(audio_device.to_string()),
            instruments: Some(instruments.to_string_lossy().to_string()),
            note_duration: None,
            include_accidentals: None,
            low_octave: None,
            high_octave: None,
            mode: None,
            instrument: None,
        }
    }

    /// Parse a trainer configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Trainer, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Trainer>()?)
    }

    /// Returns the audio device (default: the host's default output device).
    pub fn audio_device(&self) -> &str {
        self.audio_device.as_deref().unwrap_or(DEFAULT_AUDIO_DEVICE)
    }

    /// Returns the instrument directory (default: the working directory).
    pub fn instruments(&self) -> PathBuf {
        PathBuf::from(
            self.instruments
                .as_deref()
                .unwrap_or(DEFAULT_INSTRUMENTS_DIR),
        )
    }

    /// Returns how long each note sounds (default: 1s).
    pub fn note_duration(&self) -> Result<Duration, ConfigError> {
        match &self.note_duration {
            Some(note_duration) => Ok(DurationString::from_string(note_duration.clone())
                .map_err(|e| ConfigError::Duration {
                    field: "note_duration",
                    value: note_duration.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_NOTE_DURATION),
        }
    }

    pub fn include_accidentals(&self) -> bool {
        self.include_accidentals.unwrap_or(false)
    }

    pub fn low_octave(&self) -> i32 {
        self.low_octave.unwrap_or(DEFAULT_LOW_OCTAVE)
    }

    pub fn high_octave(&self) -> i32 {
        self.high_octave.unwrap_or(DEFAULT_HIGH_OCTAVE)
    }

    /// Returns the playback mode (default: sine).
    pub fn mode(&self) -> PlaybackMode {
        self.mode.unwrap_or_default()
    }

    pub fn instrument(&self) -> String {
        self.instrument
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTRUMENT.to_string())
    }
}
