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

//! External service capabilities.
//!
//! The application talks to two remote services: a release catalog that
//! supplies track listings, and a scrobbling service that accepts play
//! events. Both are modelled as traits so that the playback core can be
//! driven by fakes in tests and by the HTTP clients in [`discogs`] and
//! [`lastfm`] at runtime.
//!
//! Every method here may block on the network, so they are only ever called
//! from the task worker thread, never from the event loop.

pub(crate) mod discogs;
pub(crate) mod http;
pub(crate) mod lastfm;

use std::fmt;

use crate::{
    error::Result,
    model::{DurationSource, Release, ReleaseId, SearchPage, Track},
};

/// Resolves user input to catalog releases.
pub(crate) trait CatalogProvider: Send + Sync {
    /// Extracts a release identifier from a bare ID or a catalog URL.
    fn resolve_identifier(&self, input: &str) -> Result<ReleaseId> {
        ReleaseId::parse(input)
    }

    /// Fetches a release and its track list.
    ///
    /// Fails with `NotFound`, `Network`, or `InvalidRelease` when the release
    /// has no tracks.
    fn load_release(&self, id: ReleaseId) -> Result<Release>;

    /// Free text release search, `page` is 1-based.
    fn search(&self, query: &str, page: u32) -> Result<SearchPage>;
}

/// Accepts authentication and play events.
pub(crate) trait ScrobbleProvider: Send + Sync {
    fn authenticate(&self, username: &str, secret: &Secret) -> Result<SessionToken>;

    /// Installs a session used by subsequent submissions.
    fn set_session(&self, token: SessionToken);

    fn clear_session(&self);

    /// Best-effort "now playing" notification.
    fn send_now_playing(&self, track: &Track) -> Result<()>;

    /// Best-effort scrobble; `started_at` is the unix time the track started.
    fn scrobble(&self, track: &Track, started_at: i64) -> Result<()>;

    /// Looks up album artwork, if the service has any.
    fn album_artwork(&self, _artist: &str, _album: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Looks up a track duration in seconds, if the service knows it.
    fn track_duration(&self, _artist: &str, _title: &str) -> Result<Option<u32>> {
        Ok(None)
    }
}

/// An opaque session token issued by the scrobble provider.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SessionToken(String);

impl SessionToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// A sign-in secret, either the password itself or its md5 hex digest.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Secret {
    Password(String),
    Md5(String),
}

impl Secret {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Secret::Password(s) | Secret::Md5(s) => s.trim().is_empty(),
        }
    }

    /// The md5 hex digest of the password.
    pub(crate) fn md5_hex(&self) -> String {
        match self {
            Secret::Password(password) => md5_hex(password),
            Secret::Md5(hash) => hash.trim().to_ascii_lowercase(),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::Password(_) => f.write_str("Secret::Password(..)"),
            Secret::Md5(_) => f.write_str("Secret::Md5(..)"),
        }
    }
}

pub(crate) fn md5_hex(text: &str) -> String {
    format!("{:x}", md5::compute(text.as_bytes()))
}

/// Replaces default durations with ones looked up from the scrobble provider.
///
/// Lookup failures are logged and leave the default in place, a missing
/// duration is never a reason to fail loading a release.
pub(crate) fn fill_missing_durations(
    mut release: Release,
    scrobbler: &dyn ScrobbleProvider,
) -> Release {
    if release
        .tracks
        .iter()
        .all(|t| t.duration_source != DurationSource::Default)
    {
        return release;
    }

    release.tracks = std::mem::take(&mut release.tracks)
        .into_iter()
        .map(|track| {
            if track.duration_source != DurationSource::Default {
                return track;
            }

            match scrobbler.track_duration(&track.artist, &track.title) {
                Ok(Some(seconds)) if seconds > 0 => {
                    log::info!(
                        "Using looked up duration {}s for {} - {}",
                        seconds,
                        track.artist,
                        track.title
                    );
                    track.with_duration(seconds, DurationSource::Lookup)
                }
                Ok(_) => {
                    log::warn!("Using default duration for track {}", track.position);
                    track
                }
                Err(e) => {
                    log::warn!(
                        "Duration lookup failed for track {}, using default: {}",
                        track.position,
                        e
                    );
                    track
                }
            }
        })
        .collect();

    release
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory provider doubles shared by the unit tests.

    use std::sync::Mutex;

    use super::*;
    use crate::error::ScrobblerError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Authenticate(String),
        SetSession(String),
        ClearSession,
        NowPlaying(String),
        Scrobble(String, i64),
    }

    #[derive(Default)]
    pub(crate) struct FakeScrobbler {
        pub(crate) calls: Mutex<Vec<Call>>,
        pub(crate) reject_auth: bool,
        pub(crate) durations: Vec<(String, u32)>,
    }

    impl FakeScrobbler {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ScrobbleProvider for FakeScrobbler {
        fn authenticate(&self, username: &str, _secret: &Secret) -> Result<SessionToken> {
            self.record(Call::Authenticate(username.to_string()));
            if self.reject_auth {
                Err(ScrobblerError::Auth("Invalid username or password".to_string()))
            } else {
                Ok(SessionToken::new(format!("key-{}", username)))
            }
        }

        fn set_session(&self, token: SessionToken) {
            self.record(Call::SetSession(token.as_str().to_string()));
        }

        fn clear_session(&self) {
            self.record(Call::ClearSession);
        }

        fn send_now_playing(&self, track: &Track) -> Result<()> {
            self.record(Call::NowPlaying(track.title.clone()));
            Ok(())
        }

        fn scrobble(&self, track: &Track, started_at: i64) -> Result<()> {
            self.record(Call::Scrobble(track.title.clone(), started_at));
            Ok(())
        }

        fn track_duration(&self, _artist: &str, title: &str) -> Result<Option<u32>> {
            match self.durations.iter().find(|(t, _)| t == title) {
                Some((_, seconds)) => Ok(Some(*seconds)),
                None => Err(ScrobblerError::NotFound(title.to_string())),
            }
        }
    }
}
