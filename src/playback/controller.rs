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

use std::sync::mpsc::{self, Receiver, Sender};

use crate::{
    error::{Result, ScrobblerError},
    model::{Release, ReleaseId},
    playback::{PlaybackEvent, PlaybackState, ScrobbleDispatch, SessionGate, scrobble_threshold},
};

/// The single authority over the current track, how far through it playback
/// is, and which remote events are due.
///
/// All methods are expected to be called from one thread, the application
/// event loop. Nothing here blocks: remote calls are handed to the
/// [`ScrobbleDispatch`] and forgotten.
pub(crate) struct PlaybackController {
    state: PlaybackState,
    /// The most recently requested release, if its load has not completed.
    pending_load: Option<ReleaseId>,
    dispatch: Box<dyn ScrobbleDispatch>,
    subscribers: Vec<Sender<PlaybackEvent>>,
    clock: fn() -> i64,
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl PlaybackController {
    pub(crate) fn new(dispatch: Box<dyn ScrobbleDispatch>) -> Self {
        Self::with_clock(dispatch, unix_now)
    }

    pub(crate) fn with_clock(dispatch: Box<dyn ScrobbleDispatch>, clock: fn() -> i64) -> Self {
        Self {
            state: PlaybackState::default(),
            pending_load: None,
            dispatch,
            subscribers: vec![],
            clock,
        }
    }

    pub(crate) fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Registers a new observer of state changes.
    ///
    /// Subscribers whose receiver has been dropped are forgotten on the next
    /// published event.
    pub(crate) fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: PlaybackEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn publish_progress(&mut self) {
        let event = PlaybackEvent::Progress {
            elapsed: self.state.elapsed_seconds,
            duration: self.state.track_duration_seconds(),
        };
        self.publish(event);
    }

    /// Records that `id` has been requested from the catalog.
    ///
    /// Any earlier request still outstanding is superseded and its result
    /// will be discarded by [`Self::complete_load`].
    pub(crate) fn begin_load(&mut self, id: ReleaseId) {
        if let Some(previous) = self.pending_load.replace(id) {
            if previous != id {
                log::info!("Load of release {} superseded by {}", previous, id);
            }
        }
    }

    pub(crate) fn pending_load(&self) -> Option<ReleaseId> {
        self.pending_load
    }

    /// Stops waiting for an outstanding catalog lookup.
    pub(crate) fn cancel_load(&mut self) -> Option<ReleaseId> {
        let cancelled = self.pending_load.take();
        if let Some(id) = cancelled {
            log::info!("Cancelled load of release {}", id);
        }
        cancelled
    }

    /// Applies the result of a catalog lookup started with [`Self::begin_load`].
    ///
    /// Returns `Ok(true)` if the release is now loaded and `Ok(false)` if the
    /// result was stale and ignored. Errors leave the current playback state
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns the catalog error, or [`ScrobblerError::InvalidRelease`] for a
    /// release without tracks.
    pub(crate) fn complete_load(&mut self, id: ReleaseId, result: Result<Release>) -> Result<bool> {
        if self.pending_load != Some(id) {
            log::info!("Discarding stale result for release {}", id);
            return Ok(false);
        }
        self.pending_load = None;

        let release = result?;
        if release.tracks.is_empty() {
            return Err(ScrobblerError::InvalidRelease(id));
        }

        self.load_release(release);
        Ok(true)
    }

    /// Replaces the current release and rewinds to its first track, paused.
    ///
    /// A release without tracks is ignored.
    pub(crate) fn load_release(&mut self, release: Release) {
        if release.tracks.is_empty() {
            log::warn!("Ignoring release {} without tracks", release.id);
            return;
        }

        let was_playing = self.state.is_playing;
        let id = release.id;
        log::info!("Loaded album: {} with {} tracks", release.title, release.tracks.len());

        self.state = PlaybackState {
            current_release: Some(release),
            ..PlaybackState::default()
        };

        if was_playing {
            self.publish(PlaybackEvent::PlayStateChanged { is_playing: false });
        }
        self.publish(PlaybackEvent::ReleaseLoaded(id));
        self.publish(PlaybackEvent::TrackChanged { index: 0 });
        self.publish_progress();
    }

    /// Closes the current release, abandoning any pending load.
    pub(crate) fn unload(&mut self) {
        self.cancel_load();

        if self.state.current_release.is_some() {
            self.state = PlaybackState::default();
            self.publish(PlaybackEvent::ReleaseUnloaded);
        }
    }

    /// Starts or resumes the countdown.
    ///
    /// Playing a release that has already finished starts again from its
    /// first track.
    pub(crate) fn play(&mut self) {
        if self.state.current_release.is_none() || self.state.is_playing {
            return;
        }

        let finished = self.state.is_last_track()
            && self.state.elapsed_seconds >= self.state.track_duration_seconds();
        if finished {
            self.change_track(0);
        }

        self.state.is_playing = true;
        if let Some(track) = self.state.current_track() {
            log::info!("Starting playback of track: {}", track.title);
        }
        self.publish(PlaybackEvent::PlayStateChanged { is_playing: true });

        self.submit_now_playing_if_due();
    }

    /// Stops the countdown, keeping the elapsed time.
    pub(crate) fn pause(&mut self) {
        if !self.state.is_playing {
            return;
        }

        self.state.is_playing = false;
        log::info!("Playback paused at {}s", self.state.elapsed_seconds);
        self.publish(PlaybackEvent::PlayStateChanged { is_playing: false });
    }

    pub(crate) fn toggle_play_pause(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Moves to the next track; does nothing on the last track.
    pub(crate) fn next_track(&mut self) -> bool {
        let next = self.state.current_track_index + 1;
        if next >= self.state.track_count() {
            return false;
        }

        self.change_track(next);
        true
    }

    /// Moves to the previous track; does nothing on the first track.
    pub(crate) fn previous_track(&mut self) -> bool {
        if self.state.current_release.is_none() || self.state.current_track_index == 0 {
            return false;
        }

        self.change_track(self.state.current_track_index - 1);
        true
    }

    /// Jumps to the track at `index`, keeping the play state.
    pub(crate) fn select_track(&mut self, index: usize) -> bool {
        if index >= self.state.track_count() {
            return false;
        }

        self.change_track(index);
        true
    }

    /// Jumps to the track at a catalog position such as "B2".
    pub(crate) fn select_position(&mut self, position: &str) -> bool {
        let index = self
            .state
            .current_release
            .as_ref()
            .and_then(|r| r.track_index(position));

        match index {
            Some(index) => self.select_track(index),
            None => {
                log::warn!("Could not find track with position: {}", position);
                false
            }
        }
    }

    /// Advances the countdown by one second.
    ///
    /// While playing, this submits "now playing" once per track, submits a
    /// scrobble once the track has played for [`scrobble_threshold`] seconds
    /// (only if `gate` allows it), and moves on when the track is complete,
    /// stopping after the last track.
    pub(crate) fn tick(&mut self, gate: &dyn SessionGate) {
        if !self.state.is_playing {
            return;
        }
        let Some(track) = self.state.current_track().cloned() else {
            return;
        };

        self.submit_now_playing_if_due();

        let duration = track.duration_seconds;
        let elapsed = (self.state.elapsed_seconds + 1).min(duration);
        self.state.elapsed_seconds = elapsed;
        self.publish_progress();

        let threshold = scrobble_threshold(duration);
        if !self.state.has_scrobbled && elapsed >= threshold {
            if gate.current_session_valid() {
                self.state.has_scrobbled = true;
                let started_at = self
                    .state
                    .track_started_at
                    .unwrap_or_else(|| (self.clock)() - i64::from(elapsed));
                self.dispatch.scrobble(&track, started_at);
            } else if elapsed == threshold {
                log::info!("Not signed in, skipping scrobble of {}", track.title);
            }
        }

        if elapsed >= duration {
            self.finish_track();
        }
    }

    fn finish_track(&mut self) {
        if self.state.is_last_track() {
            self.state.is_playing = false;
            log::info!("End of album reached");
            self.publish(PlaybackEvent::PlayStateChanged { is_playing: false });
            self.publish(PlaybackEvent::AlbumFinished);
        } else {
            self.change_track(self.state.current_track_index + 1);
        }
    }

    /// Makes `index` the current track with a fresh countdown and fresh
    /// submission flags.
    fn change_track(&mut self, index: usize) {
        self.state.current_track_index = index;
        self.state.elapsed_seconds = 0;
        self.state.has_submitted_now_playing = false;
        self.state.has_scrobbled = false;
        self.state.track_started_at = None;

        self.publish(PlaybackEvent::TrackChanged { index });
        self.publish_progress();

        self.submit_now_playing_if_due();
    }

    fn submit_now_playing_if_due(&mut self) {
        if !self.state.is_playing || self.state.has_submitted_now_playing {
            return;
        }
        if self.state.current_track().is_none() {
            return;
        }

        // At most one attempt per track, whatever the outcome.
        self.state.has_submitted_now_playing = true;
        if self.state.track_started_at.is_none() {
            self.state.track_started_at = Some((self.clock)());
        }
        if let Some(track) = self.state.current_track() {
            self.dispatch.now_playing(track);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::model::{DurationSource, Track};

    const NOW: i64 = 1_700_000_000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        NowPlaying(String),
        Scrobble(String, i64),
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Sent>>>);

    impl Recorder {
        fn sent(&self) -> Vec<Sent> {
            self.0.borrow().clone()
        }

        fn scrobbles(&self) -> usize {
            self.sent()
                .iter()
                .filter(|s| matches!(s, Sent::Scrobble(..)))
                .count()
        }

        fn now_playing(&self) -> usize {
            self.sent()
                .iter()
                .filter(|s| matches!(s, Sent::NowPlaying(_)))
                .count()
        }
    }

    impl ScrobbleDispatch for Recorder {
        fn now_playing(&self, track: &Track) {
            self.0.borrow_mut().push(Sent::NowPlaying(track.title.clone()));
        }

        fn scrobble(&self, track: &Track, started_at: i64) {
            self.0
                .borrow_mut()
                .push(Sent::Scrobble(track.title.clone(), started_at));
        }
    }

    fn release(id: u64, durations: &[u32]) -> Release {
        let tracks = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Track::new(
                    format!("A{}", i + 1),
                    format!("Track {}", i + 1),
                    *d,
                    DurationSource::Catalog,
                    "Artist",
                    "Album",
                )
            })
            .collect();

        Release::new(ReleaseId(id), "Album", "Artist", None, None, tracks).unwrap()
    }

    fn controller() -> (PlaybackController, Recorder) {
        let recorder = Recorder::default();
        let controller = PlaybackController::with_clock(Box::new(recorder.clone()), || NOW);
        (controller, recorder)
    }

    fn tick_n(controller: &mut PlaybackController, gate: bool, n: u32) {
        for _ in 0..n {
            controller.tick(&gate);
        }
    }

    #[test]
    fn load_resets_state() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20]));
        c.play();
        c.next_track();
        tick_n(&mut c, true, 3);

        c.load_release(release(2, &[30, 40, 50]));

        let state = c.state();
        assert_eq!(state.current_release.as_ref().map(|r| r.id), Some(ReleaseId(2)));
        assert_eq!(state.current_track_index, 0);
        assert_eq!(state.elapsed_seconds, 0);
        assert!(!state.is_playing);
        assert!(!state.has_submitted_now_playing);
        assert!(!state.has_scrobbled);
        assert_eq!(state.track_duration_seconds(), 30);
    }

    #[test]
    fn empty_release_is_ignored() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10]));

        let empty = Release {
            id: ReleaseId(2),
            title: "Empty".to_string(),
            artist: "Artist".to_string(),
            year: None,
            artwork_reference: None,
            tracks: vec![],
        };
        c.load_release(empty);

        assert_eq!(
            c.state().current_release.as_ref().map(|r| r.id),
            Some(ReleaseId(1))
        );
    }

    #[test]
    fn play_without_release_does_nothing() {
        let (mut c, recorder) = controller();
        c.play();
        c.tick(&true);

        assert!(!c.state().is_playing);
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn next_at_last_track_is_noop() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20]));
        assert!(c.next_track());
        c.play();
        tick_n(&mut c, true, 3);

        assert!(!c.next_track());
        assert_eq!(c.state().current_track_index, 1);
        assert_eq!(c.state().elapsed_seconds, 3);
    }

    #[test]
    fn previous_at_first_track_is_noop() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20]));
        c.play();
        tick_n(&mut c, true, 4);

        assert!(!c.previous_track());
        assert_eq!(c.state().current_track_index, 0);
        assert_eq!(c.state().elapsed_seconds, 4);
    }

    #[test]
    fn navigation_resets_countdown_and_keeps_play_state() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20, 30]));
        c.play();
        tick_n(&mut c, true, 6);
        assert!(c.state().has_scrobbled);

        assert!(c.next_track());
        let state = c.state();
        assert_eq!(state.current_track_index, 1);
        assert_eq!(state.elapsed_seconds, 0);
        assert!(!state.has_scrobbled);
        assert!(state.is_playing);

        c.pause();
        assert!(c.previous_track());
        assert_eq!(c.state().current_track_index, 0);
        assert!(!c.state().is_playing);
        assert!(!c.state().has_submitted_now_playing);
    }

    #[test]
    fn elapsed_never_exceeds_duration() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[3, 2, 4]));
        c.play();

        for _ in 0..20 {
            c.tick(&true);
            let state = c.state();
            assert!(state.elapsed_seconds <= state.track_duration_seconds());
        }
    }

    #[test]
    fn now_playing_fires_once_per_track_across_pause() {
        let (mut c, recorder) = controller();
        c.load_release(release(1, &[100, 100]));

        c.play();
        assert_eq!(recorder.sent(), vec![Sent::NowPlaying("Track 1".to_string())]);

        tick_n(&mut c, false, 5);
        c.pause();
        tick_n(&mut c, false, 5);
        c.play();
        tick_n(&mut c, false, 5);
        assert_eq!(recorder.now_playing(), 1);
        assert_eq!(c.state().elapsed_seconds, 10);

        c.next_track();
        assert_eq!(recorder.now_playing(), 2);
        assert_eq!(
            recorder.sent().last(),
            Some(&Sent::NowPlaying("Track 2".to_string()))
        );
    }

    #[test]
    fn scrobble_thresholds_follow_half_or_cap() {
        let (mut c, recorder) = controller();
        c.load_release(release(123, &[10, 400, 600]));
        c.play();

        tick_n(&mut c, true, 4);
        assert_eq!(recorder.scrobbles(), 0);
        c.tick(&true);
        assert_eq!(recorder.scrobbles(), 1);
        assert_eq!(
            recorder.sent().last(),
            Some(&Sent::Scrobble("Track 1".to_string(), NOW))
        );

        // Finish track 0 and move on to the 400 second track.
        tick_n(&mut c, true, 5);
        assert_eq!(c.state().current_track_index, 1);

        tick_n(&mut c, true, 199);
        assert_eq!(recorder.scrobbles(), 1);
        c.tick(&true);
        assert_eq!(recorder.scrobbles(), 2);

        // The 600 second track is capped at 240.
        assert!(c.next_track());
        tick_n(&mut c, true, 239);
        assert_eq!(recorder.scrobbles(), 2);
        c.tick(&true);
        assert_eq!(recorder.scrobbles(), 3);

        tick_n(&mut c, true, 100);
        assert_eq!(recorder.scrobbles(), 3);
    }

    #[test]
    fn scrobble_requires_session() {
        let (mut c, recorder) = controller();
        c.load_release(release(1, &[20]));
        c.play();

        tick_n(&mut c, false, 12);
        assert_eq!(recorder.scrobbles(), 0);
        assert!(!c.state().has_scrobbled);

        // Signing in later in the same track still scrobbles it.
        c.tick(&true);
        assert_eq!(recorder.scrobbles(), 1);
    }

    #[test]
    fn sign_out_before_threshold_prevents_scrobble() {
        let (mut c, recorder) = controller();
        c.load_release(release(1, &[20]));
        c.play();

        let mut signed_in = true;
        for second in 1..=20 {
            if second == 9 {
                signed_in = false;
            }
            c.tick(&signed_in);
        }

        assert_eq!(recorder.scrobbles(), 0);
    }

    #[test]
    fn auto_advance_walks_album_and_stops() {
        let (mut c, recorder) = controller();
        c.load_release(release(1, &[3, 4, 5]));
        c.play();

        tick_n(&mut c, true, 3);
        assert_eq!(c.state().current_track_index, 1);
        assert_eq!(c.state().elapsed_seconds, 0);
        assert!(c.state().is_playing);

        tick_n(&mut c, true, 4);
        assert_eq!(c.state().current_track_index, 2);
        assert!(c.state().is_playing);

        tick_n(&mut c, true, 4);
        assert!(c.state().is_playing);
        c.tick(&true);
        assert!(!c.state().is_playing);
        assert_eq!(c.state().current_track_index, 2);
        assert_eq!(c.state().elapsed_seconds, 5);

        assert_eq!(recorder.now_playing(), 3);
        assert_eq!(recorder.scrobbles(), 3);

        // Further ticks do nothing once stopped.
        tick_n(&mut c, true, 5);
        assert_eq!(recorder.now_playing(), 3);
    }

    #[test]
    fn play_after_album_finished_starts_over() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[2]));
        c.play();
        tick_n(&mut c, true, 2);
        assert!(!c.state().is_playing);

        c.play();
        assert!(c.state().is_playing);
        assert_eq!(c.state().elapsed_seconds, 0);
        assert!(c.state().has_submitted_now_playing);
    }

    #[test]
    fn toggle_inverts_play_state() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10]));

        c.toggle_play_pause();
        assert!(c.state().is_playing);
        c.toggle_play_pause();
        assert!(!c.state().is_playing);
    }

    #[test]
    fn selects_tracks_by_index_and_position() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20, 30]));

        assert!(c.select_position("a3"));
        assert_eq!(c.state().current_track_index, 2);
        assert!(c.select_track(1));
        assert_eq!(c.state().current_track_index, 1);

        assert!(!c.select_track(3));
        assert!(!c.select_position("Z9"));
        assert_eq!(c.state().current_track_index, 1);
    }

    #[test]
    fn stale_load_is_discarded() {
        let (mut c, _) = controller();

        c.begin_load(ReleaseId(1));
        c.begin_load(ReleaseId(2));

        assert_eq!(c.complete_load(ReleaseId(2), Ok(release(2, &[10]))), Ok(true));
        assert_eq!(c.complete_load(ReleaseId(1), Ok(release(1, &[10]))), Ok(false));

        assert_eq!(
            c.state().current_release.as_ref().map(|r| r.id),
            Some(ReleaseId(2))
        );
        assert_eq!(c.pending_load(), None);
    }

    #[test]
    fn failed_load_keeps_current_release() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10, 20]));
        c.play();
        c.next_track();

        c.begin_load(ReleaseId(9));
        let res = c.complete_load(
            ReleaseId(9),
            Err(ScrobblerError::Network("timed out".to_string())),
        );

        assert_eq!(res, Err(ScrobblerError::Network("timed out".to_string())));
        assert_eq!(
            c.state().current_release.as_ref().map(|r| r.id),
            Some(ReleaseId(1))
        );
        assert_eq!(c.state().current_track_index, 1);
        assert!(c.state().is_playing);
    }

    #[test]
    fn unload_cancels_pending_load() {
        let (mut c, _) = controller();
        c.load_release(release(1, &[10]));
        c.begin_load(ReleaseId(2));

        c.unload();

        assert_eq!(c.state().current_release, None);
        assert_eq!(c.complete_load(ReleaseId(2), Ok(release(2, &[10]))), Ok(false));
        assert_eq!(c.state().current_release, None);
    }

    #[test]
    fn subscribers_observe_changes() {
        let (mut c, _) = controller();
        let rx = c.subscribe();

        c.load_release(release(7, &[2, 2]));
        c.play();
        c.tick(&true);

        let events: Vec<PlaybackEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::ReleaseLoaded(ReleaseId(7)),
                PlaybackEvent::TrackChanged { index: 0 },
                PlaybackEvent::Progress { elapsed: 0, duration: 2 },
                PlaybackEvent::PlayStateChanged { is_playing: true },
                PlaybackEvent::Progress { elapsed: 1, duration: 2 },
            ]
        );

        drop(rx);
        c.tick(&true);
        assert!(c.subscribers.is_empty());
    }
}
