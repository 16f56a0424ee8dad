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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the application: catalog
//! [`Release`]s and the ordered [`Track`]s they own, together with the
//! identifiers and search results used to find them.
//!
//! Raw catalog data is normalised here, at the model boundary, so the rest of
//! the application only ever deals with integer durations and cleaned artist
//! names.

pub(crate) mod duration;

use std::fmt;

use crate::error::{Result, ScrobblerError};

pub(crate) use duration::{DEFAULT_TRACK_SECONDS, DurationSource, parse_duration};

/// A catalog release identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ReleaseId(pub(crate) u64);

impl ReleaseId {
    /// Extracts a release identifier from user input.
    ///
    /// Accepts a bare numeric identifier (stray non-digit characters are
    /// ignored) or a catalog URL such as
    /// `https://www.discogs.com/release/8844291-Artist-Title`, in which case
    /// the identifier is the leading number of the last path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScrobblerError::NotFound`] if no identifier can be extracted.
    pub(crate) fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let candidate = if input.contains("discogs.com") {
            let path = input.split(['?', '#']).next().unwrap_or_default();
            let segment = path
                .split('/')
                .filter(|s| !s.is_empty())
                .next_back()
                .unwrap_or_default();
            segment.split('-').next().unwrap_or_default()
        } else {
            input
        };

        let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();

        digits
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(ReleaseId)
            .ok_or_else(|| ScrobblerError::NotFound(format!("no release identifier in '{}'", input)))
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One track of a release.
///
/// Tracks are built once from catalog data and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Track {
    /// Catalog position, e.g. "A1" or "3".
    pub(crate) position: String,
    pub(crate) title: String,
    /// Always at least one second.
    pub(crate) duration_seconds: u32,
    pub(crate) duration_source: DurationSource,
    /// May differ from the release artist on compilations.
    pub(crate) artist: String,
    pub(crate) album: String,
}

impl Track {
    pub(crate) fn new(
        position: impl Into<String>,
        title: impl Into<String>,
        duration_seconds: u32,
        duration_source: DurationSource,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            position: position.into(),
            title: title.into(),
            duration_seconds: duration_seconds.max(1),
            duration_source,
            artist: artist.into(),
            album: album.into(),
        }
    }

    /// Builds a track from a raw catalog duration string, falling back to
    /// [`DEFAULT_TRACK_SECONDS`] when the catalog has no usable duration.
    pub(crate) fn from_catalog(
        position: impl Into<String>,
        title: impl Into<String>,
        raw_duration: &str,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        let (seconds, source) = match parse_duration(raw_duration) {
            Some(seconds) => (seconds, DurationSource::Catalog),
            None => (DEFAULT_TRACK_SECONDS, DurationSource::Default),
        };

        Self::new(position, title, seconds, source, artist, album)
    }

    /// Returns a copy of this track with a different duration.
    pub(crate) fn with_duration(self, duration_seconds: u32, source: DurationSource) -> Self {
        Self {
            duration_seconds: duration_seconds.max(1),
            duration_source: source,
            ..self
        }
    }

    /// Human readable duration, e.g. "3:30".
    pub(crate) fn duration(&self) -> String {
        duration::format_duration(self.duration_seconds)
    }
}

/// An album or record and its ordered track list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Release {
    pub(crate) id: ReleaseId,
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) year: Option<u32>,
    pub(crate) artwork_reference: Option<String>,
    /// Catalog order, index 0 is the first track.
    pub(crate) tracks: Vec<Track>,
}

impl Release {
    /// Creates a release, rejecting an empty track list.
    ///
    /// # Errors
    ///
    /// Returns [`ScrobblerError::InvalidRelease`] if `tracks` is empty.
    pub(crate) fn new(
        id: ReleaseId,
        title: impl Into<String>,
        artist: impl Into<String>,
        year: Option<u32>,
        artwork_reference: Option<String>,
        tracks: Vec<Track>,
    ) -> Result<Self> {
        if tracks.is_empty() {
            return Err(ScrobblerError::InvalidRelease(id));
        }

        Ok(Self {
            id,
            title: title.into(),
            artist: artist.into(),
            year,
            artwork_reference,
            tracks,
        })
    }

    /// Finds the index of the track at a catalog position, ignoring case.
    pub(crate) fn track_index(&self, position: &str) -> Option<usize> {
        let position = position.trim();
        self.tracks
            .iter()
            .position(|t| t.position.eq_ignore_ascii_case(position))
    }

    pub(crate) fn total_seconds(&self) -> u64 {
        self.tracks.iter().map(|t| u64::from(t.duration_seconds)).sum()
    }
}

/// A single catalog search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReleaseSummary {
    pub(crate) id: ReleaseId,
    /// Usually "Artist - Title".
    pub(crate) title: String,
    pub(crate) year: Option<u32>,
    pub(crate) format: Vec<String>,
    pub(crate) thumb: Option<String>,
}

/// One page of catalog search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SearchPage {
    pub(crate) query: String,
    pub(crate) results: Vec<ReleaseSummary>,
    /// 1-based.
    pub(crate) page: u32,
    pub(crate) total_pages: u32,
}

impl SearchPage {
    pub(crate) fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Removes the numeric disambiguation suffix the catalog appends to artist
/// names, so "Artist (2)" becomes "Artist".
pub(crate) fn clean_artist_name(name: &str) -> String {
    let trimmed = name.trim();

    if let Some(stripped) = trimmed.strip_suffix(')') {
        if let Some(open) = stripped.rfind('(') {
            let inner = &stripped[open + 1..];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                return stripped[..open].trim_end().to_string();
            }
        }
    }

    trimmed.to_string()
}
