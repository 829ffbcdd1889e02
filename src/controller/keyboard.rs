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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use crate::{playback::PlaybackMode, tuning};

use super::Event;

const NEW: &str = "new";
const REPLAY: &str = "replay";
const GUESS: &str = "guess";
const HEAR: &str = "hear";
const STOP: &str = "stop";
const QUIT: &str = "quit";
const ACCIDENTALS: &str = "accidentals";
const LOW: &str = "low";
const HIGH: &str = "high";
const MODE: &str = "mode";
const INSTRUMENT: &str = "instrument";
const INSTRUMENTS: &str = "instruments";
const HELP: &str = "help";

/// A controller that runs the quiz from the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and dispatches one command. Returns false once there is nothing more to read.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {} <note>, {} <note>, {}, {}, {}): ",
            NEW, REPLAY, GUESS, HEAR, STOP, QUIT, HELP,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            // End of input.
            events_tx
                .blocking_send(Event::Quit)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            return Ok(false);
        }

        let input = input.trim();
        let (command, argument) = match input.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (input, ""),
        };

        let event = match (command.to_lowercase().as_str(), argument) {
            (NEW, _) => Some(Event::NewRound),
            (REPLAY, _) => Some(Event::Replay),
            (STOP, _) => Some(Event::Stop),
            (QUIT, _) => Some(Event::Quit),
            (INSTRUMENTS, _) => Some(Event::Instruments),
            (GUESS, name) if !name.is_empty() => {
                Some(Event::Guess(tuning::normalize_pitch_class(name)))
            }
            (HEAR, name) if !name.is_empty() => {
                Some(Event::Hear(tuning::normalize_pitch_class(name)))
            }
            (INSTRUMENT, name) if !name.is_empty() => Some(Event::Instrument(name.to_string())),
            (ACCIDENTALS, setting) => match setting.to_lowercase().as_str() {
                "on" => Some(Event::Accidentals(true)),
                "off" => Some(Event::Accidentals(false)),
                _ => None,
            },
            (LOW, octave) => octave.parse().ok().map(Event::LowOctave),
            (HIGH, octave) => octave.parse().ok().map(Event::HighOctave),
            (MODE, mode) => match mode.to_lowercase().as_str() {
                "sine" => Some(Event::Mode(PlaybackMode::Sine)),
                "sampler" => Some(Event::Mode(PlaybackMode::Sampler)),
                _ => None,
            },
            (HELP, _) => {
                writeln!(
                    writer,
                    "Settings: {} on|off, {} <octave>, {} <octave>, {} sine|sampler, {} <name>, {}",
                    ACCIDENTALS, LOW, HIGH, MODE, INSTRUMENT, INSTRUMENTS,
                )?;
                return Ok(true);
            }
            (GUESS | HEAR | INSTRUMENT, _) => {
                warn!(input = input, "Missing argument");
                return Ok(true);
            }
            _ => {
                warn!(input = input, "Unrecognized input");
                return Ok(true);
            }
        };
        let Some(event) = event else {
            warn!(input = input, "Invalid argument");
            return Ok(true);
        };

        let quit = event == Event::Quit;
        events_tx
            .blocking_send(event)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(!quit)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
