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
use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{catalog::InstrumentCatalog, note::Note, playback::SynthesisMode};

use super::{AudioError, CreatedEngine, Degradation, Engine as AudioEngine, EngineFactory};

/// What a mock engine has been asked to do.
#[derive(Debug, Default)]
struct Activity {
    notes: Vec<i32>,
    starts: usize,
    stops: usize,
    playing: bool,
}

/// A view of a mock engine that outlives the engine itself.
#[derive(Clone)]
pub struct Recording {
    mode: SynthesisMode,
    degraded: bool,
    activity: Arc<Mutex<Activity>>,
}

impl Recording {
    /// The synthesis mode the engine was created for.
    pub fn mode(&self) -> &SynthesisMode {
        &self.mode
    }

    /// Returns true if the engine fell back to a sine tone.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    /// The MIDI ids the engine has been given, starting with the one it was created with.
    pub fn notes(&self) -> Vec<i32> {
        self.activity.lock().notes.clone()
    }

    pub fn starts(&self) -> usize {
        self.activity.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.activity.lock().stops
    }

    /// Returns true if the engine is currently sounding.
    pub fn is_playing(&self) -> bool {
        self.activity.lock().playing
    }
}

/// A mock engine factory. Engines make no sound but record everything they are asked to do.
#[derive(Clone)]
pub struct Factory {
    name: String,
    /// Where sampler instruments are looked up.
    catalog: InstrumentCatalog,
    /// Instruments that resolve even though they are not in the catalog.
    known_instruments: Arc<Mutex<Vec<String>>>,
    /// Fails the next engine creation when set.
    fail_next: Arc<Mutex<bool>>,
    recordings: Arc<Mutex<Vec<Recording>>>,
}

impl Factory {
    /// Creates a new mock factory.
    pub fn new(name: &str, catalog: InstrumentCatalog) -> Factory {
        Factory {
            name: name.to_string(),
            catalog,
            known_instruments: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
            recordings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes the given instruments resolvable without touching the file system.
    pub fn with_instruments(self, instruments: &[&str]) -> Factory {
        self.known_instruments
            .lock()
            .extend(instruments.iter().map(|instrument| instrument.to_string()));
        self
    }

    /// Makes the next engine creation fail.
    pub fn fail_next_create(&self) {
        *self.fail_next.lock() = true;
    }

    /// Every engine created so far, oldest first.
    pub fn recordings(&self) -> Vec<Recording> {
        self.recordings.lock().clone()
    }

    /// The number of engines created so far.
    pub fn created(&self) -> usize {
        self.recordings.lock().len()
    }

    fn resolves(&self, instrument: &str) -> bool {
        self.known_instruments
            .lock()
            .iter()
            .any(|known| known == instrument)
            || self.catalog.resolve(instrument).is_some()
    }
}

impl EngineFactory for Factory {
    fn create(&self, note: &Note, mode: &SynthesisMode) -> Result<CreatedEngine, AudioError> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(AudioError::Device(format!("{} refused to start", self.name)));
        }

        let degraded = match mode {
            SynthesisMode::Sampler { instrument } if !self.resolves(instrument) => {
                warn!(instrument, "Instrument unavailable, falling back to a sine tone.");
                Some(Degradation {
                    instrument: instrument.clone(),
                    reason: AudioError::InstrumentNotFound(instrument.clone()).to_string(),
                })
            }
            _ => None,
        };

        let recording = Recording {
            mode: mode.clone(),
            degraded: degraded.is_some(),
            activity: Arc::new(Mutex::new(Activity {
                notes: vec![note.id()],
                ..Default::default()
            })),
        };
        self.recordings.lock().push(recording.clone());
        info!(device = self.name, mode = %mode, note = %note, "Created mock engine.");

        Ok(CreatedEngine {
            engine: Box::new(Engine {
                name: self.name.clone(),
                recording,
            }),
            degraded,
        })
    }
}

/// A mock engine.
pub struct Engine {
    name: String,
    recording: Recording,
}

impl AudioEngine for Engine {
    fn set_note(&mut self, note: &Note) {
        self.recording.activity.lock().notes.push(note.id());
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let mut activity = self.recording.activity.lock();
        activity.starts += 1;
        activity.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut activity = self.recording.activity.lock();
        activity.stops += 1;
        activity.playing = false;
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock, {})", self.name, self.recording.mode)
    }
}
