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
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::watch;
use tracing::{debug, info, span, Level, Span};

use crate::{
    note::Note,
    playback::PlaybackSettings,
    player::{PlaybackError, PlaybackSession},
    tuning::{self, NoteError},
};

/// The outcome of the latest guess in a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuessResult {
    /// No guess has been made this round.
    #[default]
    Unanswered,
    Correct,
    Incorrect,
}

/// What observers see of a game.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameState {
    /// The note the player is trying to identify.
    pub current_note: Note,
    pub guess_result: GuessResult,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("there are no notes to choose from")]
    EmptyPool,
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// A guess-the-note game. Each round a note is picked and played, and the player tries
/// to name its pitch class. Octaves are not part of the answer.
pub struct GameSession {
    player: PlaybackSession,
    state: watch::Sender<GameState>,
    span: Span,
}

impl GameSession {
    /// Creates a new game that plays through the given session. The first round targets A4
    /// until a note is picked.
    pub fn new(player: PlaybackSession) -> GameSession {
        let (state, _) = watch::channel(GameState::default());
        GameSession {
            player,
            state,
            span: span!(Level::INFO, "game"),
        }
    }

    /// Subscribes to state changes. Every round and every guess publishes a new state.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.state.subscribe()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> GameState {
        self.state.borrow().clone()
    }

    /// The session notes are played through.
    pub fn player(&self) -> &PlaybackSession {
        &self.player
    }

    /// Starts a new round around the note. Nothing is played.
    pub fn start_round(&self, note: Note) {
        let _enter = self.span.enter();
        debug!(note = %note, "Starting round.");
        self.state.send_replace(GameState {
            current_note: note,
            guess_result: GuessResult::Unanswered,
        });
    }

    /// Picks a random note from the candidates, starts a round around it and plays it.
    /// If playback fails the round has still started.
    pub fn play_random(
        &self,
        candidates: &[Note],
        settings: &PlaybackSettings,
        duration: Duration,
    ) -> Result<Note, GameError> {
        let note = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(GameError::EmptyPool)?;

        self.start_round(note.clone());
        self.player.play(&note, settings, duration)?;
        Ok(note)
    }

    /// Plays the current round's note again.
    pub fn replay(&self, settings: &PlaybackSettings, duration: Duration) -> Result<(), GameError> {
        let note = self.state.borrow().current_note.clone();
        self.player.play(&note, settings, duration)?;
        Ok(())
    }

    /// Plays the named pitch class in the current round's octave, so the player can hear a
    /// guess before making it. The round is not affected.
    pub fn play_guess(
        &self,
        name: &str,
        settings: &PlaybackSettings,
        duration: Duration,
    ) -> Result<Note, GameError> {
        let octave = self.state.borrow().current_note.octave();
        let note = tuning::note_from_name_and_octave(name, octave)?;
        self.player.play(&note, settings, duration)?;
        Ok(note)
    }

    /// Checks a guess against the current note's pitch class. Guessing again in the same
    /// round replaces the earlier result.
    pub fn check_guess(&self, name: &str) -> GuessResult {
        let _enter = self.span.enter();

        let mut result = GuessResult::Unanswered;
        self.state.send_modify(|state| {
            state.guess_result = if state.current_note.name() == name {
                GuessResult::Correct
            } else {
                GuessResult::Incorrect
            };
            result = state.guess_result;
        });

        info!(guess = name, result = ?result, "Checked guess.");
        result
    }
}

#[cfg(test)]
mod test {
    use std::{path::Path, sync::Arc, time::Duration};

    use crate::{
        audio::mock,
        catalog::InstrumentCatalog,
        note::Note,
        playback::PlaybackSettings,
        player::PlaybackSession,
        tuning,
    };

    use super::{GameError, GameSession, GameState, GuessResult};

    const SECOND: Duration = Duration::from_secs(1);

    fn game() -> (GameSession, mock::Factory) {
        let factory = mock::Factory::new(
            "mock-device",
            InstrumentCatalog::new(Path::new("/nonexistent")),
        );
        let game = GameSession::new(PlaybackSession::new(Arc::new(factory.clone())));
        (game, factory)
    }

    fn note(name: &str, octave: i32) -> Note {
        tuning::note_from_name_and_octave(name, octave).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state() {
        let (game, _) = game();
        assert_eq!(game.state(), GameState::default());
        assert_eq!(game.state().current_note, Note::default());
        assert_eq!(game.state().guess_result, GuessResult::Unanswered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guesses_ignore_octave() {
        let (game, _) = game();
        game.start_round(note("E", 5));

        assert_eq!(game.check_guess("E"), GuessResult::Correct);
        assert_eq!(game.state().guess_result, GuessResult::Correct);

        // Guessing again replaces the result.
        assert_eq!(game.check_guess("F"), GuessResult::Incorrect);
        assert_eq!(game.state().guess_result, GuessResult::Incorrect);

        assert_eq!(game.check_guess("E"), GuessResult::Correct);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_round_resets_result() {
        let (game, _) = game();
        game.start_round(note("C", 4));
        game.check_guess("D");

        game.start_round(note("D", 4));
        assert_eq!(
            game.state(),
            GameState {
                current_note: note("D", 4),
                guess_result: GuessResult::Unanswered,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_observers_see_changes() {
        let (game, _) = game();
        let mut state = game.subscribe();

        game.start_round(note("G", 3));
        assert!(state.has_changed().unwrap());
        assert_eq!(state.borrow_and_update().current_note, note("G", 3));

        game.check_guess("G");
        assert!(state.has_changed().unwrap());
        assert_eq!(state.borrow_and_update().guess_result, GuessResult::Correct);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_random_picks_from_candidates() {
        let (game, factory) = game();
        let candidates = tuning::enumerate_notes(4..=4, false);

        for _ in 0..10 {
            let picked = game
                .play_random(&candidates, &PlaybackSettings::sine(), SECOND)
                .unwrap();
            assert!(candidates.contains(&picked));
            assert_eq!(game.state().current_note, picked);
            assert_eq!(game.state().guess_result, GuessResult::Unanswered);
        }

        // One engine served every round.
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.recordings()[0].starts(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_random_with_single_candidate() {
        let (game, factory) = game();
        let candidates = vec![note("B", 2)];

        let picked = game
            .play_random(&candidates, &PlaybackSettings::sine(), SECOND)
            .unwrap();
        assert_eq!(picked, note("B", 2));
        assert_eq!(factory.recordings()[0].notes(), vec![note("B", 2).id()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_random_empty_pool() {
        let (game, factory) = game();
        let before = game.state();

        let result = game.play_random(&[], &PlaybackSettings::sine(), SECOND);
        assert!(matches!(result, Err(GameError::EmptyPool)));
        assert_eq!(game.state(), before);
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_plays_current_note() {
        let (game, factory) = game();
        game.start_round(note("F♯", 3));

        game.replay(&PlaybackSettings::sine(), SECOND).unwrap();
        game.replay(&PlaybackSettings::sine(), SECOND).unwrap();

        let recording = &factory.recordings()[0];
        assert_eq!(recording.notes(), vec![note("F♯", 3).id(), note("F♯", 3).id()]);
        assert_eq!(recording.starts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_guess_uses_round_octave() {
        let (game, factory) = game();
        game.start_round(note("C", 5));

        let heard = game
            .play_guess("A", &PlaybackSettings::sine(), SECOND)
            .unwrap();
        assert_eq!(heard.octave(), 5);
        assert_eq!(heard.id(), 81);
        assert_eq!(factory.recordings()[0].notes(), vec![81]);

        // Hearing a guess doesn't answer the round.
        assert_eq!(game.state().guess_result, GuessResult::Unanswered);
        assert_eq!(game.state().current_note, note("C", 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_guess_rejects_unknown_name() {
        let (game, factory) = game();

        let result = game.play_guess("H", &PlaybackSettings::sine(), SECOND);
        assert!(matches!(result, Err(GameError::Note(_))));
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_failure_is_reported() {
        let (game, factory) = game();
        factory.fail_next_create();

        let result = game.play_random(&[note("D", 4)], &PlaybackSettings::sine(), SECOND);
        assert!(matches!(result, Err(GameError::Playback(_))));
        // The round started anyway.
        assert_eq!(game.state().current_note, note("D", 4));
    }
}
