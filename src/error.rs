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

//! Domain error kinds.
//!
//! Catalog and sign-in failures are surfaced to the user, while failures from
//! now-playing and scrobble submissions are only ever logged. Both kinds share
//! the single [`ScrobblerError`] type so that providers can be swapped without
//! changing how callers classify failures.

use thiserror::Error;

use crate::model::ReleaseId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(crate) enum ScrobblerError {
    /// A bad release identifier, an unknown release or an empty search.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure, unexpected response or remote service error.
    #[error("network error: {0}")]
    Network(String),

    /// Bad credentials, rejected or expired session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The catalog returned a release without a single playable track.
    #[error("release {0} has no playable tracks")]
    InvalidRelease(ReleaseId),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Store(String),
}

pub(crate) type Result<T> = std::result::Result<T, ScrobblerError>;

impl From<ureq::Error> for ScrobblerError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(404, response) => {
                ScrobblerError::NotFound(format!("{} returned 404", response.get_url()))
            }
            ureq::Error::Status(code @ (401 | 403), response) => {
                ScrobblerError::Auth(format!("{} returned {}", response.get_url(), code))
            }
            ureq::Error::Status(code, response) => {
                ScrobblerError::Network(format!("{} returned {}", response.get_url(), code))
            }
            ureq::Error::Transport(transport) => ScrobblerError::Network(transport.to_string()),
        }
    }
}

impl From<std::io::Error> for ScrobblerError {
    fn from(err: std::io::Error) -> Self {
        ScrobblerError::Network(format!("failed to read response: {}", err))
    }
}

impl From<serde_json::Error> for ScrobblerError {
    fn from(err: serde_json::Error) -> Self {
        ScrobblerError::Network(format!("malformed response: {}", err))
    }
}

impl From<rusqlite::Error> for ScrobblerError {
    fn from(err: rusqlite::Error) -> Self {
        ScrobblerError::Store(err.to_string())
    }
}
