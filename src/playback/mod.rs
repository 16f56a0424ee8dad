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

//! Vinyl playback simulation and scrobble timing.
//!
//! Nothing is actually played: the [`PlaybackController`] walks a release's
//! track list in real time, driven by a one second [`TICK_INTERVAL`], and
//! decides when a track has been playing long enough to report. The
//! controller never talks to the network itself; it hands due submissions to
//! a [`ScrobbleDispatch`] and asks a [`SessionGate`] whether scrobbling is
//! currently allowed.
//!
//! Observers follow state changes through [`PlaybackController::subscribe`].

mod controller;

use std::{sync::mpsc::Sender, time::Duration};

pub(crate) use controller::PlaybackController;

use crate::{
    model::{Release, ReleaseId, Track},
    tasks::AppTask,
};

/// Interval between countdown ticks.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A track counts as played after half its duration, but never needs more
/// than this many seconds.
pub(crate) const MAX_SCROBBLE_THRESHOLD_SECONDS: u32 = 240;

/// Elapsed seconds after which a track of `duration_seconds` is scrobbled.
pub(crate) fn scrobble_threshold(duration_seconds: u32) -> u32 {
    (duration_seconds / 2).min(MAX_SCROBBLE_THRESHOLD_SECONDS)
}

/// Answers whether scrobbles may currently be submitted.
pub(crate) trait SessionGate {
    fn current_session_valid(&self) -> bool;
}

impl SessionGate for bool {
    fn current_session_valid(&self) -> bool {
        *self
    }
}

/// Fire-and-forget delivery of play events to the scrobble provider.
///
/// Implementations must not block: the tick loop carries on regardless of
/// whether, or when, a submission succeeds.
pub(crate) trait ScrobbleDispatch {
    fn now_playing(&self, track: &Track);
    fn scrobble(&self, track: &Track, started_at: i64);
}

impl ScrobbleDispatch for Sender<AppTask> {
    fn now_playing(&self, track: &Track) {
        if self.send(AppTask::SubmitNowPlaying(track.clone())).is_err() {
            log::error!("Task worker gone, dropping now playing for {}", track.title);
        }
    }

    fn scrobble(&self, track: &Track, started_at: i64) {
        if self.send(AppTask::Scrobble(track.clone(), started_at)).is_err() {
            log::error!("Task worker gone, dropping scrobble for {}", track.title);
        }
    }
}

/// State changes published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaybackEvent {
    ReleaseLoaded(ReleaseId),
    ReleaseUnloaded,
    TrackChanged { index: usize },
    PlayStateChanged { is_playing: bool },
    Progress { elapsed: u32, duration: u32 },
    AlbumFinished,
}

/// Everything the controller knows about the simulated turntable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PlaybackState {
    pub(crate) current_release: Option<Release>,
    /// Within `0..tracks.len()` whenever a release is loaded.
    pub(crate) current_track_index: usize,
    pub(crate) is_playing: bool,
    /// Never exceeds the current track's duration.
    pub(crate) elapsed_seconds: u32,
    pub(crate) has_submitted_now_playing: bool,
    pub(crate) has_scrobbled: bool,
    /// Unix time the current track started playing.
    pub(crate) track_started_at: Option<i64>,
}

impl PlaybackState {
    pub(crate) fn current_track(&self) -> Option<&Track> {
        self.current_release
            .as_ref()
            .and_then(|r| r.tracks.get(self.current_track_index))
    }

    /// Zero when no release is loaded.
    pub(crate) fn track_duration_seconds(&self) -> u32 {
        self.current_track().map_or(0, |t| t.duration_seconds)
    }

    pub(crate) fn remaining_seconds(&self) -> u32 {
        self.track_duration_seconds()
            .saturating_sub(self.elapsed_seconds)
    }

    pub(crate) fn track_count(&self) -> usize {
        self.current_release.as_ref().map_or(0, |r| r.tracks.len())
    }

    pub(crate) fn is_last_track(&self) -> bool {
        self.current_track_index + 1 >= self.track_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_half_capped_at_four_minutes() {
        assert_eq!(scrobble_threshold(10), 5);
        assert_eq!(scrobble_threshold(400), 200);
        assert_eq!(scrobble_threshold(481), 240);
        assert_eq!(scrobble_threshold(1200), 240);
        assert_eq!(scrobble_threshold(1), 0);
    }

    #[test]
    fn empty_state_has_no_track() {
        let state = PlaybackState::default();
        assert_eq!(state.current_track(), None);
        assert_eq!(state.track_duration_seconds(), 0);
        assert_eq!(state.remaining_seconds(), 0);
    }
}
