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
use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, span, warn, Level, Span};

use crate::{
    audio::{AudioError, Degradation, Engine, EngineFactory},
    note::Note,
    playback::{PlaybackSettings, SynthesisMode},
};

/// How long a note sounds unless told otherwise.
pub const DEFAULT_NOTE_DURATION: Duration = Duration::from_secs(1);

/// Capacity of the playback event channel.
const EVENT_CAPACITY: usize = 32;

/// Things that happen to the session's engine.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    /// A new engine was built for the mode.
    EngineCreated { mode: SynthesisMode },
    /// The existing engine was retuned instead of rebuilt.
    EngineReused { mode: SynthesisMode },
    /// The requested instrument was unavailable and a sine tone is playing instead.
    Degraded(Degradation),
    /// The engine was silenced, either explicitly or when its note ran out.
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("unable to create {mode} engine: {source}")]
    Create {
        mode: SynthesisMode,
        #[source]
        source: AudioError,
    },
    #[error("unable to start engine {engine}: {source}")]
    Start {
        engine: String,
        #[source]
        source: AudioError,
    },
}

struct ActiveEngine {
    engine: Box<dyn Engine>,
    /// The settings the engine was built for.
    settings: PlaybackSettings,
}

#[derive(Default)]
struct SessionState {
    active: Option<ActiveEngine>,
    /// The timer that will stop the current note.
    pending_stop: Option<JoinHandle<()>>,
    /// Incremented whenever a pending stop is superseded. A timer only fires if the
    /// generation it was scheduled under is still current.
    generation: u64,
}

impl SessionState {
    fn cancel_pending_stop(&mut self) {
        self.generation += 1;
        if let Some(pending_stop) = self.pending_stop.take() {
            pending_stop.abort();
        }
    }
}

/// Plays notes through at most one engine at a time. The engine is kept while the
/// playback mode and instrument stay the same and rebuilt when either changes.
///
/// Notes are stopped by a timer task, so a session must be used from within a tokio runtime.
pub struct PlaybackSession {
    factory: Arc<dyn EngineFactory>,
    /// Held for the whole of a play so that engine changes happen one at a time.
    play_lock: Mutex<()>,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<PlaybackEvent>,
    span: Span,
}

impl PlaybackSession {
    /// Creates a new session that builds its engines with the given factory.
    pub fn new(factory: Arc<dyn EngineFactory>) -> PlaybackSession {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        PlaybackSession {
            factory,
            play_lock: Mutex::new(()),
            state: Arc::new(Mutex::new(SessionState::default())),
            events,
            span: span!(Level::INFO, "playback"),
        }
    }

    /// Subscribes to playback events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Returns true if the session currently holds an engine.
    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Plays the note and stops it after the duration. Any stop still pending from an
    /// earlier call is cancelled, so only the latest note's timer can silence the engine.
    ///
    /// Engines are built without holding the session state, so `stop` and pending timers
    /// never wait on a slow device. A `stop` that arrives while an engine is being built
    /// wins: the engine is kept but not started.
    pub fn play(
        &self,
        note: &Note,
        settings: &PlaybackSettings,
        duration: Duration,
    ) -> Result<(), PlaybackError> {
        let _enter = self.span.enter();
        let _playing = self.play_lock.lock();

        let mode = settings.synthesis();
        let (previous, generation) = {
            let mut state = self.state.lock();
            state.cancel_pending_stop();
            match state.active.take() {
                Some(mut active) if active.settings == *settings => {
                    debug!(engine = %active.engine, note = %note, "Reusing engine.");
                    active.engine.set_note(note);
                    self.emit(PlaybackEvent::EngineReused { mode });
                    return self.start(&mut state, active, note, duration);
                }
                previous => (previous, state.generation),
            }
        };

        if let Some(mut previous) = previous {
            info!(
                engine = %previous.engine,
                mode = %mode,
                "Playback settings changed, replacing engine."
            );
            previous.engine.stop();
        }

        let created = self.factory.create(note, &mode).map_err(|source| {
            error!(mode = %mode, err = %source, "Unable to create engine.");
            PlaybackError::Create {
                mode: mode.clone(),
                source,
            }
        })?;

        if let Some(degradation) = created.degraded {
            warn!(
                instrument = degradation.instrument,
                reason = degradation.reason,
                "Playing a sine tone in place of the instrument."
            );
            self.emit(PlaybackEvent::Degraded(degradation));
        }
        self.emit(PlaybackEvent::EngineCreated { mode });

        let active = ActiveEngine {
            engine: created.engine,
            settings: settings.clone(),
        };

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(engine = %active.engine, "Stopped while the engine was created.");
            state.active = Some(active);
            return Ok(());
        }
        self.start(&mut state, active, note, duration)
    }

    fn start(
        &self,
        state: &mut SessionState,
        mut active: ActiveEngine,
        note: &Note,
        duration: Duration,
    ) -> Result<(), PlaybackError> {
        if let Err(source) = active.engine.start() {
            error!(engine = %active.engine, err = %source, "Unable to start engine.");
            return Err(PlaybackError::Start {
                engine: active.engine.to_string(),
                source,
            });
        }

        info!(
            note = %note,
            duration = format!("{:?}", duration),
            "Playing note."
        );
        state.active = Some(active);
        self.schedule_stop(state, duration);
        Ok(())
    }

    /// Stops the current note, if any, and cancels its pending stop.
    pub fn stop(&self) {
        let _enter = self.span.enter();

        let mut state = self.state.lock();
        state.cancel_pending_stop();
        if let Some(active) = state.active.as_mut() {
            active.engine.stop();
            info!(engine = %active.engine, "Stopped playback.");
            self.emit(PlaybackEvent::Stopped);
        }
    }

    fn schedule_stop(&self, state: &mut SessionState, duration: Duration) {
        let generation = state.generation;
        let shared = self.state.clone();
        let events = self.events.clone();

        state.pending_stop = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let mut state = shared.lock();
            if state.generation != generation {
                return;
            }
            state.pending_stop = None;
            if let Some(active) = state.active.as_mut() {
                active.engine.stop();
                debug!(engine = %active.engine, "Note finished.");
                let _ = events.send(PlaybackEvent::Stopped);
            }
        }));
    }

    fn emit(&self, event: PlaybackEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.cancel_pending_stop();
        if let Some(mut active) = state.active.take() {
            active.engine.stop();
        }
    }
}

#[cfg(test)]
mod test {
    use std::{path::Path, sync::Arc, time::Duration};

    use tokio::sync::broadcast::error::TryRecvError;

    use crate::{
        audio::{mock, AudioError, CreatedEngine, EngineFactory},
        catalog::InstrumentCatalog,
        note::Note,
        playback::{PlaybackMode, PlaybackSettings, SynthesisMode},
        tuning,
    };

    use super::{PlaybackError, PlaybackEvent, PlaybackSession};

    const SECOND: Duration = Duration::from_secs(1);

    fn mock_factory() -> mock::Factory {
        mock::Factory::new(
            "mock-device",
            InstrumentCatalog::new(Path::new("/nonexistent")),
        )
        .with_instruments(&["Piano.sf2", "Organ.sf2"])
    }

    fn session(factory: &mock::Factory) -> PlaybackSession {
        PlaybackSession::new(Arc::new(factory.clone()))
    }

    /// Lets spawned timer tasks run after the clock moves.
    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_settings_reuse_engine() {
        let factory = mock_factory();
        let session = session(&factory);
        let c4 = tuning::note_from_name_and_octave("C", 4).unwrap();

        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        session.play(&c4, &PlaybackSettings::sine(), SECOND).unwrap();

        assert_eq!(factory.created(), 1);
        let recording = &factory.recordings()[0];
        assert_eq!(recording.notes(), vec![69, 60]);
        assert_eq!(recording.starts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instrument_change_recreates_engine() {
        let factory = mock_factory();
        let session = session(&factory);
        let note = Note::default();

        session.play(&note, &PlaybackSettings::sampler("Piano.sf2"), SECOND).unwrap();
        session.play(&note, &PlaybackSettings::sampler("Piano.sf2"), SECOND).unwrap();
        assert_eq!(factory.created(), 1);

        session.play(&note, &PlaybackSettings::sampler("Organ.sf2"), SECOND).unwrap();
        assert_eq!(factory.created(), 2);

        let recordings = factory.recordings();
        assert_eq!(
            recordings[1].mode(),
            &SynthesisMode::Sampler {
                instrument: "Organ.sf2".to_string()
            }
        );
        // The replaced engine was stopped before the new one started.
        assert!(!recordings[0].is_playing());
        assert!(recordings[1].is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sine_instrument_change_recreates_engine() {
        let factory = mock_factory();
        let session = session(&factory);
        let note = Note::default();

        let piano = PlaybackSettings::new(PlaybackMode::Sine, "Piano.sf2");
        let organ = PlaybackSettings::new(PlaybackMode::Sine, "Organ.sf2");
        session.play(&note, &piano, SECOND).unwrap();
        session.play(&note, &organ, SECOND).unwrap();

        assert_eq!(factory.created(), 2);
        assert!(factory
            .recordings()
            .iter()
            .all(|recording| recording.mode() == &SynthesisMode::Sine));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_recreates_engine() {
        let factory = mock_factory();
        let session = session(&factory);
        let note = Note::default();

        session.play(&note, &PlaybackSettings::sine(), SECOND).unwrap();
        session.play(&note, &PlaybackSettings::sampler("Piano.sf2"), SECOND).unwrap();
        session.play(&note, &PlaybackSettings::sine(), SECOND).unwrap();

        assert_eq!(factory.created(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_note_stops_after_duration() {
        let factory = mock_factory();
        let session = session(&factory);
        let mut events = session.subscribe();

        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        let recording = factory.recordings()[0].clone();

        advance(Duration::from_millis(500)).await;
        assert!(recording.is_playing());

        advance(Duration::from_millis(600)).await;
        assert!(!recording.is_playing());
        assert_eq!(recording.stops(), 1);

        assert_eq!(
            events.try_recv(),
            Ok(PlaybackEvent::EngineCreated {
                mode: SynthesisMode::Sine
            })
        );
        assert_eq!(events.try_recv(), Ok(PlaybackEvent::Stopped));

        // The engine is kept for the next note.
        assert!(session.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_cancels_earlier_stop() {
        let factory = mock_factory();
        let session = session(&factory);
        let note = Note::default();

        session.play(&note, &PlaybackSettings::sine(), SECOND).unwrap();
        advance(Duration::from_millis(800)).await;
        session.play(&note, &PlaybackSettings::sine(), SECOND).unwrap();

        let recording = factory.recordings()[0].clone();

        // The first note's timer would have fired here.
        advance(Duration::from_millis(400)).await;
        assert!(recording.is_playing());
        assert_eq!(recording.stops(), 0);

        advance(Duration::from_millis(700)).await;
        assert!(!recording.is_playing());
        assert_eq!(recording.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_immediate_and_idempotent() {
        let factory = mock_factory();
        let session = session(&factory);

        // Nothing to stop yet.
        session.stop();
        assert!(!session.is_active());

        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        let recording = factory.recordings()[0].clone();

        session.stop();
        assert!(!recording.is_playing());
        session.stop();
        assert!(!recording.is_playing());

        // The cancelled timer never fires.
        let stops = recording.stops();
        advance(Duration::from_secs(2)).await;
        assert_eq!(recording.stops(), stops);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_instrument_degrades() {
        let factory = mock_factory();
        let session = session(&factory);
        let mut events = session.subscribe();

        session
            .play(
                &Note::default(),
                &PlaybackSettings::sampler("Missing.sf2"),
                SECOND,
            )
            .unwrap();

        match events.try_recv() {
            Ok(PlaybackEvent::Degraded(degradation)) => {
                assert_eq!(degradation.instrument, "Missing.sf2");
            }
            other => panic!("expected a degradation event, got {:?}", other),
        }
        assert!(matches!(
            events.try_recv(),
            Ok(PlaybackEvent::EngineCreated { .. })
        ));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        let recording = &factory.recordings()[0];
        assert!(recording.degraded());
        assert!(recording.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_is_reported() {
        let factory = mock_factory();
        let session = session(&factory);

        factory.fail_next_create();
        let result = session.play(&Note::default(), &PlaybackSettings::sine(), SECOND);
        assert!(matches!(result, Err(PlaybackError::Create { .. })));
        assert!(!session.is_active());

        // The session recovers on the next call.
        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        assert!(session.is_active());
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_engine() {
        let factory = mock_factory();
        let session = session(&factory);

        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        let recording = factory.recordings()[0].clone();
        drop(session);

        assert!(!recording.is_playing());
    }

    /// Holds every engine creation until the test lets it through.
    struct GatedFactory {
        inner: mock::Factory,
        entered: crossbeam_channel::Sender<()>,
        release: crossbeam_channel::Receiver<()>,
    }

    impl EngineFactory for GatedFactory {
        fn create(&self, note: &Note, mode: &SynthesisMode) -> Result<CreatedEngine, AudioError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            self.inner.create(note, mode)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_engine_creation_does_not_block_stop() {
        let factory = mock_factory();
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded(1);
        let session = Arc::new(PlaybackSession::new(Arc::new(GatedFactory {
            inner: factory.clone(),
            entered: entered_tx,
            release: release_rx,
        })));

        let playing = {
            let session = session.clone();
            tokio::task::spawn_blocking(move || {
                session.play(&Note::default(), &PlaybackSettings::sine(), SECOND)
            })
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The session stays usable while the engine is being built.
        assert!(!session.is_active());
        session.stop();

        release_tx.send(()).unwrap();
        playing.await.unwrap().unwrap();

        // The stop arrived first, so the new engine is kept but silent.
        assert!(session.is_active());
        let recording = factory.recordings()[0].clone();
        assert_eq!(recording.starts(), 0);
        assert!(!recording.is_playing());

        // The next note reuses it.
        session.play(&Note::default(), &PlaybackSettings::sine(), SECOND).unwrap();
        assert_eq!(factory.created(), 1);
        assert!(recording.is_playing());
    }
}
