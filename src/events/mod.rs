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

//! Application event handling.
//!
//! Every change to application state happens on the main thread, in
//! [`process_events`]. Other threads (stdin reader, ticker, task worker) only
//! ever send [`AppEvent`]s into the loop, so the playback controller and the
//! session gatekeeper need no locking.
//!
//! After each event the playback controller's own [`PlaybackEvent`]s are
//! drained and turned into user notifications.

mod handlers;
use handlers::*;

use anyhow::Result;

use crate::{
    App,
    error::Result as ProviderResult,
    model::{Release, ReleaseId, SearchPage, Track},
    playback::PlaybackEvent,
    provider::SessionToken,
    session::SignInAttempt,
};

#[derive(Debug)]
pub(crate) enum AppEvent {
    /// A line typed at the prompt.
    Input(String),

    Tick,

    ReleaseLoaded(ReleaseId, ProviderResult<Release>),
    SearchResults(ProviderResult<SearchPage>),
    ArtworkResolved(ReleaseId, Option<String>),

    SignInCompleted(SignInAttempt, ProviderResult<SessionToken>),
    Scrobbled(Track),

    Error(String),

    ExitApplication,
}

/// Runs the main application loop.
///
/// This function loops until an exit event is received or the event channel
/// is closed.
///
/// # Errors
///
/// Returns an error if a task can no longer be handed to the worker thread.
pub(crate) fn process_events(app: &mut App) -> Result<()> {
    while let Ok(event) = app.event_rx.recv() {
        if matches!(event, AppEvent::ExitApplication) {
            break;
        }

        match event {
            AppEvent::Input(line) => handle_input(app, &line)?,
            AppEvent::Tick => handle_tick(app),
            AppEvent::ReleaseLoaded(id, result) => handle_release_loaded(app, id, result)?,
            AppEvent::SearchResults(result) => handle_search_results(app, result),
            AppEvent::ArtworkResolved(id, artwork) => handle_artwork_resolved(app, id, artwork),
            AppEvent::SignInCompleted(attempt, result) => {
                handle_sign_in_completed(app, attempt, result)
            }
            AppEvent::Scrobbled(track) => handle_scrobbled(app, &track),
            AppEvent::Error(message) => eprintln!("Error: {}", message),
            AppEvent::ExitApplication => {}
        }

        drain_playback_events(app);
    }

    Ok(())
}

/// Turns pending controller events into notifications.
///
/// Several events may describe one user-visible change (a new track that
/// starts playing publishes both a track change and a play state change), so
/// at most one "Now Playing" line is printed per drain.
fn drain_playback_events(app: &mut App) {
    let mut announce = false;

    while let Ok(event) = app.playback_rx.try_recv() {
        match event {
            PlaybackEvent::TrackChanged { .. }
            | PlaybackEvent::PlayStateChanged { is_playing: true } => announce = true,
            PlaybackEvent::AlbumFinished => {
                if app.config.show_notifications {
                    println!("End of album reached");
                }
            }
            PlaybackEvent::ReleaseLoaded(_)
            | PlaybackEvent::ReleaseUnloaded
            | PlaybackEvent::PlayStateChanged { is_playing: false }
            | PlaybackEvent::Progress { .. } => {}
        }
    }

    let state = app.controller.state();
    if announce && state.is_playing && app.config.show_notifications {
        if let Some(track) = state.current_track() {
            println!("Now Playing: {} - {} ({})", track.artist, track.title, track.duration());
        }
    }
}
