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
use std::ops::RangeInclusive;

use tracing::{error, info};

use crate::{
    catalog::InstrumentCatalog,
    config,
    note::Note,
    playback::{PlaybackMode, PlaybackSettings},
    tuning,
};

/// The default lowest octave notes are drawn from.
pub const DEFAULT_LOW_OCTAVE: i32 = 3;

/// The default highest octave notes are drawn from.
pub const DEFAULT_HIGH_OCTAVE: i32 = 6;

/// The default SoundFont instrument.
pub const DEFAULT_INSTRUMENT: &str = "HappyMellow.sf2";

/// The octaves from low to high. Without a high octave the range runs to the default
/// highest octave, or is just the low octave if that is higher. A high octave below the
/// low one gives an empty range.
pub fn octave_range(low: i32, high: Option<i32>) -> RangeInclusive<i32> {
    low..=high.unwrap_or(DEFAULT_HIGH_OCTAVE.max(low))
}

/// The player's quiz preferences and the note pool they produce. The pool is rebuilt
/// whenever the octave range or the accidental setting changes.
#[derive(Clone, Debug)]
pub struct QuizSettings {
    include_accidentals: bool,
    low_octave: i32,
    high_octave: i32,
    mode: PlaybackMode,
    instrument: String,
    available_instruments: Vec<String>,
    notes: Vec<Note>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        QuizSettings::new(
            false,
            DEFAULT_LOW_OCTAVE,
            DEFAULT_HIGH_OCTAVE,
            PlaybackMode::default(),
            DEFAULT_INSTRUMENT,
        )
    }
}

impl QuizSettings {
    /// Creates new quiz settings. The high octave is raised to the low octave if needed.
    pub fn new(
        include_accidentals: bool,
        low_octave: i32,
        high_octave: i32,
        mode: PlaybackMode,
        instrument: &str,
    ) -> QuizSettings {
        let mut settings = QuizSettings {
            include_accidentals,
            low_octave,
            high_octave: high_octave.max(low_octave),
            mode,
            instrument: instrument.to_string(),
            available_instruments: Vec::new(),
            notes: Vec::new(),
        };
        settings.regenerate();
        settings
    }

    /// Creates quiz settings from the trainer configuration.
    pub fn from_config(config: &config::Trainer) -> QuizSettings {
        QuizSettings::new(
            config.include_accidentals(),
            config.low_octave(),
            config.high_octave(),
            config.mode(),
            &config.instrument(),
        )
    }

    pub fn include_accidentals(&self) -> bool {
        self.include_accidentals
    }

    pub fn low_octave(&self) -> i32 {
        self.low_octave
    }

    pub fn high_octave(&self) -> i32 {
        self.high_octave
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// The instruments found by the last refresh.
    pub fn available_instruments(&self) -> &[String] {
        &self.available_instruments
    }

    /// The notes a round can be drawn from.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// The pitch classes the player chooses between.
    pub fn choices(&self) -> Vec<&'static str> {
        tuning::pitch_class_names(self.include_accidentals)
    }

    pub fn natural_names(&self) -> Vec<&'static str> {
        tuning::natural_names()
    }

    pub fn accidental_names(&self) -> Vec<&'static str> {
        tuning::accidental_names(self.include_accidentals)
    }

    /// The playback settings these preferences describe.
    pub fn playback(&self) -> PlaybackSettings {
        PlaybackSettings::new(self.mode, &self.instrument)
    }

    /// Sets the lowest octave, raising the highest octave to match if it would fall below.
    pub fn set_low_octave(&mut self, octave: i32) {
        self.low_octave = octave;
        if octave > self.high_octave {
            self.high_octave = octave;
        }
        self.regenerate();
    }

    /// Sets the highest octave, lowering the lowest octave to match if it would rise above.
    pub fn set_high_octave(&mut self, octave: i32) {
        self.high_octave = octave;
        if octave < self.low_octave {
            self.low_octave = octave;
        }
        self.regenerate();
    }

    pub fn set_include_accidentals(&mut self, include_accidentals: bool) {
        self.include_accidentals = include_accidentals;
        self.regenerate();
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn set_instrument(&mut self, instrument: &str) {
        self.instrument = instrument.to_string();
    }

    /// Reloads the available instruments from the catalog. A catalog that can't be read
    /// leaves no instruments available.
    pub fn refresh_instruments(&mut self, catalog: &InstrumentCatalog) {
        self.available_instruments = match catalog.list() {
            Ok(instruments) => instruments,
            Err(e) => {
                error!(
                    dir = ?catalog.dir(),
                    err = e.to_string(),
                    "Unable to list instruments"
                );
                Vec::new()
            }
        };
        info!(
            instruments = self.available_instruments.len(),
            "Refreshed instruments."
        );
    }

    fn regenerate(&mut self) {
        self.notes = tuning::enumerate_notes(
            self.low_octave..=self.high_octave,
            self.include_accidentals,
        );
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::{catalog::InstrumentCatalog, playback::PlaybackMode, tuning};

    use super::{octave_range, QuizSettings};

    #[test]
    fn test_defaults() {
        let settings = QuizSettings::default();
        assert!(!settings.include_accidentals());
        assert_eq!(settings.low_octave(), 3);
        assert_eq!(settings.high_octave(), 6);
        assert_eq!(settings.mode(), PlaybackMode::Sine);
        assert_eq!(settings.instrument(), "HappyMellow.sf2");
        // Seven naturals in each of four octaves.
        assert_eq!(settings.notes().len(), 28);
        assert_eq!(settings.choices(), vec!["C", "D", "E", "F", "G", "A", "B"]);
        assert!(settings.accidental_names().is_empty());
    }

    #[test]
    fn test_low_octave_raises_high() {
        let mut settings = QuizSettings::default();
        settings.set_low_octave(7);
        assert_eq!(settings.low_octave(), 7);
        assert_eq!(settings.high_octave(), 7);
        assert!(settings.notes().iter().all(|note| note.octave() == 7));

        settings.set_low_octave(5);
        assert_eq!(settings.low_octave(), 5);
        assert_eq!(settings.high_octave(), 7);
        assert_eq!(settings.notes().len(), 21);
    }

    #[test]
    fn test_high_octave_lowers_low() {
        let mut settings = QuizSettings::default();
        settings.set_high_octave(2);
        assert_eq!(settings.low_octave(), 2);
        assert_eq!(settings.high_octave(), 2);
        assert_eq!(settings.notes().len(), 7);
    }

    #[test]
    fn test_accidentals_regenerate_notes() {
        let mut settings = QuizSettings::default();
        settings.set_include_accidentals(true);
        assert_eq!(settings.notes().len(), 48);
        assert_eq!(settings.choices().len(), 12);
        assert_eq!(
            settings.accidental_names(),
            vec!["C♯", "D♯", "F♯", "G♯", "A♯"]
        );

        settings.set_include_accidentals(false);
        assert_eq!(settings.notes().len(), 28);
    }

    #[test]
    fn test_high_octaves_drop_invalid_notes() {
        let mut settings = QuizSettings::default();
        settings.set_include_accidentals(true);
        settings.set_high_octave(9);
        settings.set_low_octave(9);
        // G9 (127) is the last valid note.
        let names: Vec<&str> = settings.notes().iter().map(|note| note.name()).collect();
        assert_eq!(
            names,
            vec!["C", "C♯", "D", "D♯", "E", "F", "F♯", "G"]
        );
    }

    #[test]
    fn test_octave_range() {
        assert_eq!(octave_range(3, Some(5)), 3..=5);
        assert_eq!(octave_range(3, None), 3..=6);
        // A low octave above the default keeps its own octave.
        assert_eq!(octave_range(8, None), 8..=8);
        assert!(octave_range(7, Some(5)).is_empty());

        let notes = tuning::enumerate_notes(octave_range(8, None), false);
        assert_eq!(notes.len(), 7);
        assert!(notes.iter().all(|note| note.octave() == 8));
        assert!(tuning::enumerate_notes(octave_range(7, Some(5)), false).is_empty());
    }

    #[test]
    fn test_playback_follows_mode() {
        let mut settings = QuizSettings::default();
        settings.set_mode(PlaybackMode::Sampler);
        settings.set_instrument("Piano.sf2");

        let playback = settings.playback();
        assert_eq!(playback.mode(), PlaybackMode::Sampler);
        assert_eq!(playback.instrument(), "Piano.sf2");
    }

    #[test]
    fn test_refresh_instruments() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Piano.sf2"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let mut settings = QuizSettings::default();
        settings.refresh_instruments(&InstrumentCatalog::new(dir.path()));
        assert_eq!(settings.available_instruments(), ["Piano.sf2".to_string()]);

        settings.refresh_instruments(&InstrumentCatalog::new(&dir.path().join("missing")));
        assert!(settings.available_instruments().is_empty());
    }
}
