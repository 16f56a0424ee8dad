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

//! Application configuration.
//!
//! This module manages the application configuration file. The file lives in
//! the platform configuration directory chosen by `confy`, and that directory
//! also holds the log file and the credential database.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::provider::Secret;

const CONFIG_NAME: &str = "vinyl-scrobbler";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) lastfm_api_key: String,
    pub(crate) lastfm_api_secret: String,
    /// Optional, used with `lastfm_password_hash` to sign in at startup.
    pub(crate) lastfm_username: String,
    /// md5 of the Last.fm password, never the password itself.
    pub(crate) lastfm_password_hash: String,

    pub(crate) discogs_token: String,
    /// Sent to Discogs in the user agent, as their API guidelines ask.
    pub(crate) discogs_username: String,

    pub(crate) show_notifications: bool,
    pub(crate) log_level: String,
    pub(crate) search_page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lastfm_api_key: String::new(),
            lastfm_api_secret: String::new(),
            lastfm_username: String::new(),
            lastfm_password_hash: String::new(),
            discogs_token: String::new(),
            discogs_username: String::new(),
            show_notifications: true,
            log_level: "info".to_string(),
            search_page_size: 10,
        }
    }
}

impl AppConfig {
    /// Names of required settings that have not been filled in.
    pub(crate) fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("lastfm_api_key", &self.lastfm_api_key),
            ("lastfm_api_secret", &self.lastfm_api_secret),
            ("discogs_token", &self.discogs_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Credentials for signing in automatically, if both are configured.
    pub(crate) fn stored_credentials(&self) -> Option<(String, Secret)> {
        let username = self.lastfm_username.trim();
        let hash = self.lastfm_password_hash.trim();

        if username.is_empty() || hash.is_empty() {
            return None;
        }

        Some((username.to_string(), Secret::Md5(hash.to_string())))
    }
}

pub(crate) fn config_file_path() -> Result<PathBuf> {
    confy::get_configuration_file_path(CONFIG_NAME, None)
        .context("Failed to determine configuration file path")
}

/// The directory holding the configuration file, created if needed.
pub(crate) fn config_dir() -> Result<PathBuf> {
    let path = config_file_path()?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("Configuration path {} has no parent", path.display()))?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    Ok(dir)
}

/// Loads the configuration at `path`, writing a default file if there is none.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig> {
    confy::load_path(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

pub(crate) fn save_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    confy::store_path(path, cfg)
        .with_context(|| format!("Failed to save configuration to {}", path.display()))
}
