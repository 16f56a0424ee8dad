// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

const LOG_FILE: &str = "vinyl-scrobbler.log";

/// Initialises the global logger.
///
/// Log records are appended to a file in `dir`. `RUST_LOG` overrides
/// `default_level` when set. If the file cannot be opened, records go to
/// stderr instead.
///
/// Returns the log file path, if one is in use.
pub(crate) fn init_logging(dir: &Path, default_level: &str) -> Option<PathBuf> {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp_secs();

    let path = dir.join(LOG_FILE);
    let log_path = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            Some(path)
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    };

    if builder.try_init().is_err() {
        eprintln!("Logger already initialised");
    }

    log_path
}
