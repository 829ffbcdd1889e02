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

//! Ear training: equal-tempered notes, sine and SoundFont playback, and a
//! guess-the-note game.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod game;
pub mod note;
pub mod playback;
pub mod player;
pub mod settings;
pub mod tuning;
