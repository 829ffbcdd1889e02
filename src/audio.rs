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
use std::{fmt, io, path::PathBuf, sync::Arc};

use crate::{catalog::InstrumentCatalog, config, note::Note, playback::SynthesisMode};

pub mod cpal;
pub mod mock;
pub mod sampler;
pub mod sine;
pub mod voice;

/// Errors raised while creating or driving an audio engine.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no output device found with name {0}")]
    DeviceNotFound(String),
    #[error("no default output device is available")]
    NoDefaultDevice,
    #[error("unsupported sample format {0}")]
    UnsupportedFormat(String),
    #[error("unable to load instrument {path}: {reason}")]
    Instrument { path: PathBuf, reason: String },
    #[error("instrument {0} not found")]
    InstrumentNotFound(String),
    #[error("the audio thread exited before the stream was ready")]
    EngineThread,
    #[error("audio device error: {0}")]
    Device(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A sound-producing engine configured for one synthesis mode.
pub trait Engine: fmt::Display + Send {
    /// Changes the note the engine plays on its next start.
    fn set_note(&mut self, note: &Note);

    /// Starts sounding the current note.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Silences the engine. Stopping a silent engine does nothing.
    fn stop(&mut self);
}

/// Reports that an engine could not honor the requested instrument and fell back to a
/// sine tone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Degradation {
    /// The instrument that was requested.
    pub instrument: String,
    /// Why the instrument could not be used.
    pub reason: String,
}

/// The result of creating an engine.
pub struct CreatedEngine {
    pub engine: Box<dyn Engine>,
    pub degraded: Option<Degradation>,
}

/// Builds engines for a note and a synthesis mode.
pub trait EngineFactory: Send + Sync {
    fn create(&self, note: &Note, mode: &SynthesisMode) -> Result<CreatedEngine, AudioError>;
}

/// Lists the output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, AudioError> {
    cpal::list_devices()
}

/// Gets an engine factory for the configured device. Device names starting with "mock"
/// produce a mock factory that makes no sound.
pub fn get_factory(config: &config::Trainer) -> Result<Arc<dyn EngineFactory>, AudioError> {
    let device = config.audio_device();
    let catalog = InstrumentCatalog::new(&config.instruments());
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Factory::new(device, catalog)));
    }

    Ok(Arc::new(cpal::Factory::get(device, catalog)?))
}
