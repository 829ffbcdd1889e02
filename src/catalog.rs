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
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

/// The file extension of SoundFont instruments.
pub const INSTRUMENT_EXTENSION: &str = "sf2";

/// A directory of SoundFont instruments.
#[derive(Clone, Debug)]
pub struct InstrumentCatalog {
    dir: PathBuf,
}

impl InstrumentCatalog {
    /// Creates a catalog over the given directory.
    pub fn new(dir: &Path) -> InstrumentCatalog {
        InstrumentCatalog {
            dir: dir.to_path_buf(),
        }
    }

    /// The directory scanned by this catalog.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists the instrument file names in the directory, sorted.
    pub fn list(&self) -> Result<Vec<String>, io::Error> {
        let mut instruments = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_instrument(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                instruments.push(name.to_string());
            }
        }

        instruments.sort();
        debug!(
            dir = ?self.dir,
            count = instruments.len(),
            "Scanned instrument directory"
        );
        Ok(instruments)
    }

    /// Resolves an instrument name, with or without the extension, to an existing file.
    pub fn resolve(&self, instrument: &str) -> Option<PathBuf> {
        if instrument.is_empty() {
            return None;
        }

        let mut path = self.dir.join(instrument);
        if !is_instrument(&path) {
            path = self
                .dir
                .join(format!("{}.{}", instrument, INSTRUMENT_EXTENSION));
        }

        path.is_file().then_some(path)
    }
}

fn is_instrument(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(INSTRUMENT_EXTENSION))
}
