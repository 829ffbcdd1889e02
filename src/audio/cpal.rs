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
use std::{fmt, sync::Arc, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, warn, Level};

use crate::{catalog::InstrumentCatalog, note::Note, playback::SynthesisMode};

use super::{
    sampler::Instrument, voice::Voice, AudioError, CreatedEngine, Degradation,
    Engine as AudioEngine, EngineFactory,
};

/// The device name that selects the host's default output device.
pub const DEFAULT_DEVICE: &str = "default";

fn device_error<E: fmt::Display>(e: E) -> AudioError {
    AudioError::Device(e.to_string())
}

/// Lists the output devices of every available host.
pub fn list_devices() -> Result<Vec<String>, AudioError> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)
            .map_err(device_error)
            .and_then(|host| host.output_devices().map_err(device_error))
        {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            if let Ok(name) = device.name() {
                devices.push(format!("{} ({})", name, host_id.name()));
            }
        }
    }

    devices.sort();
    Ok(devices)
}

/// Builds engines that play through a cpal output device.
pub struct Factory {
    /// The name of the device.
    name: String,
    /// The underlying cpal device.
    device: cpal::Device,
    /// Where sampler instruments are looked up.
    catalog: InstrumentCatalog,
}

impl Factory {
    /// Gets a factory for the named device, or for the default output device if the name
    /// is "default".
    pub fn get(name: &str, catalog: InstrumentCatalog) -> Result<Factory, AudioError> {
        let device = if name == DEFAULT_DEVICE {
            cpal::default_host()
                .default_output_device()
                .ok_or(AudioError::NoDefaultDevice)?
        } else {
            Factory::find_device(name)?
        };

        let name = device.name().map_err(device_error)?;
        info!(device = name, "Using audio output device.");
        Ok(Factory {
            name,
            device,
            catalog,
        })
    }

    fn find_device(name: &str) -> Result<cpal::Device, AudioError> {
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(_) => continue,
            };
            let Ok(devices) = host.output_devices() else {
                continue;
            };
            for device in devices {
                if device.name().is_ok_and(|device_name| device_name.trim() == name) {
                    return Ok(device);
                }
            }
        }

        Err(AudioError::DeviceNotFound(name.to_string()))
    }

    fn load_instrument(&self, instrument: &str, sample_rate: u32) -> Result<Instrument, AudioError> {
        let path = self
            .catalog
            .resolve(instrument)
            .ok_or_else(|| AudioError::InstrumentNotFound(instrument.to_string()))?;
        Instrument::load(&path, sample_rate)
    }
}

impl EngineFactory for Factory {
    fn create(&self, note: &Note, mode: &SynthesisMode) -> Result<CreatedEngine, AudioError> {
        let span = span!(Level::INFO, "create engine (cpal)");
        let _enter = span.enter();

        let config = self.device.default_output_config().map_err(device_error)?;
        let sample_rate = config.sample_rate().0;

        let (voice, degraded) = match mode {
            SynthesisMode::Sine => (Voice::sine(note, sample_rate), None),
            SynthesisMode::Sampler { instrument } => {
                match self.load_instrument(instrument, sample_rate) {
                    Ok(loaded) => (Voice::sampler(loaded, note), None),
                    Err(e) => {
                        warn!(
                            instrument,
                            err = e.to_string(),
                            "Instrument unavailable, falling back to a sine tone."
                        );
                        (
                            Voice::sine(note, sample_rate),
                            Some(Degradation {
                                instrument: instrument.clone(),
                                reason: e.to_string(),
                            }),
                        )
                    }
                }
            }
        };

        let engine = Engine::spawn(
            format!("{} ({})", self.name, mode),
            self.device.clone(),
            config,
            voice,
        )?;

        Ok(CreatedEngine {
            engine: Box::new(engine),
            degraded,
        })
    }
}

/// An engine backed by a cpal output stream. cpal streams can't be moved between threads,
/// so the stream lives on its own thread for as long as the engine exists.
pub struct Engine {
    label: String,
    voice: Arc<Mutex<Voice>>,
    shutdown_tx: crossbeam_channel::Sender<()>,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl Engine {
    fn spawn(
        label: String,
        device: cpal::Device,
        config: cpal::SupportedStreamConfig,
        voice: Voice,
    ) -> Result<Engine, AudioError> {
        let voice = Arc::new(Mutex::new(voice));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let stream_thread = {
            let voice = voice.clone();
            thread::spawn(move || {
                let stream = match build_stream(&device, &config, voice) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(device_error(e)));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Hold the stream open until the engine is dropped.
                let _ = shutdown_rx.recv();
            })
        };

        ready_rx.recv().map_err(|_| AudioError::EngineThread)??;

        Ok(Engine {
            label,
            voice,
            shutdown_tx,
            stream_thread: Some(stream_thread),
        })
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    voice: Arc<Mutex<Voice>>,
) -> Result<cpal::Stream, AudioError> {
    let stream_config = config.config();
    match config.sample_format() {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, &stream_config, voice),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, &stream_config, voice),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, &stream_config, voice),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, &stream_config, voice),
        other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice: Arc<Mutex<Voice>>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                voice.lock().render(&mut scratch, channels);
                for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(*src);
                }
            },
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
        .map_err(device_error)
}

impl AudioEngine for Engine {
    fn set_note(&mut self, note: &Note) {
        self.voice.lock().set_note(note);
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.voice.lock().start();
        Ok(())
    }

    fn stop(&mut self) {
        self.voice.lock().stop();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(stream_thread) = self.stream_thread.take() {
            if stream_thread.join().is_err() {
                error!(engine = self.label, "Audio stream thread panicked");
            }
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
