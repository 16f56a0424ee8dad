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

//! Background task processing.
//!
//! Every call that may block on the network runs here, on a dedicated worker
//! thread, so the event loop and the playback countdown never wait. The
//! worker translates [`AppTask`] requests into provider calls and reports the
//! results back to the application as [`AppEvent`]s.
//!
//! Only actions that may block, or may take more than a trivial amount of time
//! to process, should be implemented as tasks.

mod handlers;

use anyhow::Result;
use std::{
    sync::{
        Arc,
        mpsc::{Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use crate::{
    events::AppEvent,
    model::{ReleaseId, Track},
    provider::{CatalogProvider, ScrobbleProvider, Secret},
    session::SignInAttempt,
};

#[derive(Debug)]
pub(crate) enum AppTask {
    LoadRelease(ReleaseId),
    Search { query: String, page: u32 },
    ResolveArtwork { id: ReleaseId, artist: String, album: String },

    Authenticate {
        attempt: SignInAttempt,
        username: String,
        secret: Secret,
    },

    SubmitNowPlaying(Track),
    /// A played track and the unix time it started.
    Scrobble(Track, i64),
}

/// Spawns a background thread to process application tasks.
///
/// The thread runs until every sender for `task_rx` has been dropped.
///
/// # Arguments
///
/// * `catalog` - Source of release metadata.
/// * `scrobbler` - Destination for play events, also used for lookups.
/// * `task_rx` - The receiving end of the task channel.
/// * `event_tx` - The sending end of the channel for broadcasting results.
pub(crate) fn spawn_task_worker(
    catalog: Arc<dyn CatalogProvider>,
    scrobbler: Arc<dyn ScrobbleProvider>,
    task_rx: Receiver<AppTask>,
    event_tx: Sender<AppEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let ctx = TaskContext {
            catalog: catalog.as_ref(),
            scrobbler: scrobbler.as_ref(),
            event_tx: &event_tx,
        };

        while let Ok(task) = task_rx.recv() {
            if let Err(e) = handle_task(task, &ctx) {
                log::error!("Task failed: {:#}", e);
                let _ = event_tx.send(AppEvent::Error(format!("{:#}", e)));
            }
        }

        log::debug!("Task worker stopped");
    })
}

/// Bundles shared resources required by task handlers.
struct TaskContext<'a> {
    catalog: &'a dyn CatalogProvider,
    scrobbler: &'a dyn ScrobbleProvider,
    event_tx: &'a Sender<AppEvent>,
}

fn handle_task(task: AppTask, ctx: &TaskContext) -> Result<()> {
    match task {
        AppTask::LoadRelease(id) => handlers::load_release(ctx, id),
        AppTask::Search { query, page } => handlers::search(ctx, query, page),
        AppTask::ResolveArtwork { id, artist, album } => {
            handlers::resolve_artwork(ctx, id, &artist, &album)
        }

        AppTask::Authenticate {
            attempt,
            username,
            secret,
        } => handlers::authenticate(ctx, attempt, username, &secret),

        AppTask::SubmitNowPlaying(track) => handlers::submit_now_playing(ctx, &track),
        AppTask::Scrobble(track, started_at) => handlers::scrobble(ctx, track, started_at),
    }
}
