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
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::catalog::InstrumentCatalog;
use crate::game::{GameError, GameSession};
use crate::note::OCTAVE_RANGE;
use crate::playback::PlaybackMode;
use crate::settings::QuizSettings;

pub mod keyboard;

/// Controller events that drive the quiz.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Starts a new round with a random note and plays it.
    NewRound,

    /// Plays the current round's note again.
    Replay,

    /// Guesses the pitch class of the current note.
    Guess(String),

    /// Plays a pitch class in the current octave without guessing it.
    Hear(String),

    /// Silences playback. If nothing is playing, does nothing.
    Stop,

    /// Adds sharps to or removes them from the note pool.
    Accidentals(bool),

    /// Sets the lowest octave of the note pool.
    LowOctave(i32),

    /// Sets the highest octave of the note pool.
    HighOctave(i32),

    /// Switches between sine tones and the sampler.
    Mode(PlaybackMode),

    /// Picks the sampler instrument.
    Instrument(String),

    /// Rescans the instrument directory.
    Instruments,

    /// Ends the quiz.
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("octave {0} is outside of {min} to {max}", min = OCTAVE_RANGE.start(), max = OCTAVE_RANGE.end())]
    Octave(i32),
    #[error("no instrument named {0}")]
    Instrument(String),
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Runs a quiz from driver events.
pub struct Controller {
    handle: JoinHandle<()>,
    settings: watch::Receiver<QuizSettings>,
}

impl Controller {
    /// Creates a new controller with the given driver. Notes sound for the given duration
    /// and instruments are picked from the catalog.
    pub fn new(
        game: GameSession,
        settings: QuizSettings,
        catalog: InstrumentCatalog,
        note_duration: Duration,
        driver: Arc<dyn Driver>,
    ) -> Controller {
        let (settings_tx, settings_rx) = watch::channel(settings);
        Controller {
            handle: tokio::spawn(async move {
                Controller::trigger_events(game, settings_tx, catalog, note_duration, driver).await
            }),
            settings: settings_rx,
        }
    }

    /// Subscribes to the quiz settings. The receiver sees every change the driver makes.
    pub fn settings(&self) -> watch::Receiver<QuizSettings> {
        self.settings.clone()
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers game actions by watching the driver and getting events from it. Failed
    /// actions are logged and the quiz carries on.
    async fn trigger_events(
        game: GameSession,
        settings: watch::Sender<QuizSettings>,
        catalog: InstrumentCatalog,
        note_duration: Duration,
        driver: Arc<dyn Driver>,
    ) {
        let span = span!(Level::INFO, "controller");

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        {
            let _enter = span.enter();
            let settings = settings.borrow();
            info!(
                notes = settings.notes().len(),
                low_octave = settings.low_octave(),
                high_octave = settings.high_octave(),
                mode = ?settings.mode(),
                "Controller started."
            );
        }

        while let Some(event) = events_rx.recv().await {
            let _enter = span.enter();
            info!(event = format!("{:?}", event), "Received event.");

            if event == Event::Quit {
                break;
            }
            if let Err(e) =
                Controller::handle_event(&game, &settings, &catalog, note_duration, event)
            {
                error!("Error playing the quiz: {}", e);
            }
        }

        // Close the channel so a driver blocked on sending gives up.
        drop(events_rx);
        game.player().stop();

        {
            let _enter = span.enter();
            info!("Controller closing.");
        }
        match join_handle.await {
            Ok(Err(e)) => error!("Event monitor failed: {}", e),
            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
            Ok(Ok(())) => {}
        }
    }

    fn handle_event(
        game: &GameSession,
        settings: &watch::Sender<QuizSettings>,
        catalog: &InstrumentCatalog,
        note_duration: Duration,
        event: Event,
    ) -> Result<(), ControllerError> {
        match event {
            Event::NewRound => {
                let settings = settings.borrow();
                game.play_random(settings.notes(), &settings.playback(), note_duration)?;
            }
            Event::Replay => {
                let playback = settings.borrow().playback();
                game.replay(&playback, note_duration)?;
            }
            Event::Guess(name) => {
                game.check_guess(&name);
            }
            Event::Hear(name) => {
                let playback = settings.borrow().playback();
                game.play_guess(&name, &playback, note_duration)?;
            }
            Event::Stop => game.player().stop(),
            Event::Accidentals(include) => {
                settings.send_modify(|settings| settings.set_include_accidentals(include))
            }
            Event::LowOctave(octave) => {
                Controller::check_octave(octave)?;
                settings.send_modify(|settings| settings.set_low_octave(octave));
            }
            Event::HighOctave(octave) => {
                Controller::check_octave(octave)?;
                settings.send_modify(|settings| settings.set_high_octave(octave));
            }
            Event::Mode(mode) => settings.send_modify(|settings| settings.set_mode(mode)),
            Event::Instrument(name) => {
                let instrument = catalog
                    .resolve(&name)
                    .and_then(|path| {
                        path.file_name()
                            .and_then(|file_name| file_name.to_str())
                            .map(str::to_string)
                    })
                    .ok_or(ControllerError::Instrument(name))?;
                settings.send_modify(|settings| settings.set_instrument(&instrument));
            }
            Event::Instruments => {
                settings.send_modify(|settings| settings.refresh_instruments(catalog))
            }
            Event::Quit => {}
        }
        Ok(())
    }

    fn check_octave(octave: i32) -> Result<(), ControllerError> {
        if OCTAVE_RANGE.contains(&octave) {
            Ok(())
        } else {
            Err(ControllerError::Octave(octave))
        }
    }
}
