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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tokio::sync::{broadcast, watch};

use eartrain::audio;
use eartrain::catalog::InstrumentCatalog;
use eartrain::config::{self, Trainer};
use eartrain::controller::{keyboard, Controller};
use eartrain::game::{GameSession, GameState, GuessResult};
use eartrain::playback::PlaybackSettings;
use eartrain::player::{PlaybackEvent, PlaybackSession};
use eartrain::settings::{self, QuizSettings, DEFAULT_LOW_OCTAVE};
use eartrain::tuning;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An ear trainer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the notes in an octave range.
    Notes {
        /// The lowest octave.
        #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_LOW_OCTAVE)]
        low: i32,
        /// The highest octave. Defaults to octave 6, or the lowest octave if that is higher.
        #[arg(long, allow_negative_numbers = true)]
        high: Option<i32>,
        /// Include sharps.
        #[arg(short, long)]
        accidentals: bool,
    },
    /// Lists the SoundFont instruments in the given directory.
    Instruments {
        /// The instrument directory.
        path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays a single note.
    Play {
        /// The pitch class, e.g. A or C#.
        name: String,
        /// The octave.
        #[arg(allow_negative_numbers = true)]
        octave: i32,
        /// The device name to play through.
        #[arg(short, long, default_value = "default")]
        device: String,
        /// Play through this SoundFont instead of a sine tone.
        #[arg(short, long)]
        instrument: Option<String>,
        /// The directory instruments are loaded from.
        #[arg(long, default_value = ".")]
        instruments: String,
        /// How long the note sounds.
        #[arg(long, default_value = "1s")]
        duration: String,
    },
    /// Starts a guess-the-note quiz.
    Quiz {
        /// The path to the trainer config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Notes {
            low,
            high,
            accidentals,
        } => {
            let octaves = settings::octave_range(low, high);
            let notes = tuning::enumerate_notes(octaves.clone(), accidentals);

            if notes.is_empty() {
                println!(
                    "No notes in octaves {} to {}.",
                    octaves.start(),
                    octaves.end()
                );
                return Ok(());
            }

            println!("Notes (count: {}):", notes.len());
            for note in notes {
                println!("- {} (MIDI {})", note, note.id());
            }
        }
        Commands::Instruments { path } => {
            let instruments = InstrumentCatalog::new(Path::new(&path)).list()?;

            if instruments.is_empty() {
                println!("No instruments found in {}.", path);
                return Ok(());
            }

            println!("Instruments:");
            for instrument in instruments {
                println!("- {}", instrument);
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            name,
            octave,
            device,
            instrument,
            instruments,
            duration,
        } => {
            let note =
                tuning::note_from_name_and_octave(&tuning::normalize_pitch_class(&name), octave)?;
            let duration: Duration = DurationString::from_string(duration)?.into();
            let settings = match instrument {
                Some(instrument) => PlaybackSettings::sampler(&instrument),
                None => PlaybackSettings::sine(),
            };

            let config = Trainer::new(&device, Path::new(&instruments));
            let session = PlaybackSession::new(audio::get_factory(&config)?);
            let mut events = session.subscribe();

            println!("Playing {}", note);
            session.play(&note, &settings, duration)?;
            while let Ok(event) = events.recv().await {
                match event {
                    PlaybackEvent::Degraded(degradation) => println!(
                        "{} is unavailable ({}), playing a sine tone instead.",
                        degradation.instrument, degradation.reason
                    ),
                    PlaybackEvent::Stopped => break,
                    _ => {}
                }
            }
        }
        Commands::Quiz { config_path } => {
            let config = config::load(Path::new(&config_path))?;
            let note_duration = config.note_duration()?;

            let catalog = InstrumentCatalog::new(&config.instruments());
            let mut settings = QuizSettings::from_config(&config);
            settings.refresh_instruments(&catalog);

            let game = GameSession::new(PlaybackSession::new(audio::get_factory(&config)?));
            let rounds = game.subscribe();
            tokio::spawn(report_degradation(game.player().subscribe()));

            println!("Type \"new\" to hear a note, or \"help\" for settings.");
            let mut controller = Controller::new(
                game,
                settings,
                catalog,
                note_duration,
                Arc::new(keyboard::Driver::new()),
            );
            tokio::spawn(report_rounds(rounds, controller.settings()));
            tokio::spawn(report_settings(controller.settings()));
            controller.join().await?;
        }
    }

    Ok(())
}

/// Prints each new round and the outcome of each guess.
async fn report_rounds(
    mut state: watch::Receiver<GameState>,
    settings: watch::Receiver<QuizSettings>,
) {
    while state.changed().await.is_ok() {
        let current = state.borrow_and_update().clone();
        match current.guess_result {
            GuessResult::Unanswered => {
                let choices = settings.borrow().choices().join(", ");
                println!("\nWhich note was that? ({})", choices)
            }
            GuessResult::Correct => println!("\nCorrect! It was {}.", current.current_note),
            GuessResult::Incorrect => println!("\nNot quite, try again."),
        }
    }
}

/// Prints the quiz settings when the quiz starts and whenever they change.
async fn report_settings(mut settings: watch::Receiver<QuizSettings>) {
    loop {
        {
            let current = settings.borrow_and_update();
            println!(
                "\nOctaves {} to {} ({} notes), playing {}.",
                current.low_octave(),
                current.high_octave(),
                current.notes().len(),
                current.playback().synthesis(),
            );
            println!("Naturals: {}", current.natural_names().join(", "));
            let accidentals = current.accidental_names();
            if !accidentals.is_empty() {
                println!("Sharps: {}", accidentals.join(", "));
            }
            let instruments = current.available_instruments();
            if instruments.is_empty() {
                println!("No instruments available.");
            } else {
                println!("Instruments: {}", instruments.join(", "));
            }
        }
        if settings.changed().await.is_err() {
            return;
        }
    }
}

/// Tells the player when their instrument couldn't be used.
async fn report_degradation(mut events: broadcast::Receiver<PlaybackEvent>) {
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::Degraded(degradation)) => println!(
                "\n{} is unavailable ({}), playing a sine tone instead.",
                degradation.instrument, degradation.reason
            ),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
