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

use anyhow::Result;

use crate::{
    events::AppEvent,
    model::{ReleaseId, Track},
    provider::{Secret, fill_missing_durations},
    session::SignInAttempt,
    tasks::TaskContext,
};

pub(super) fn load_release(ctx: &TaskContext, id: ReleaseId) -> Result<()> {
    log::info!("Loading release {}", id);

    let result = ctx
        .catalog
        .load_release(id)
        .map(|release| fill_missing_durations(release, ctx.scrobbler));

    ctx.event_tx.send(AppEvent::ReleaseLoaded(id, result))?;

    Ok(())
}

pub(super) fn search(ctx: &TaskContext, query: String, page: u32) -> Result<()> {
    let result = ctx.catalog.search(&query, page);
    ctx.event_tx.send(AppEvent::SearchResults(result))?;

    Ok(())
}

pub(super) fn resolve_artwork(
    ctx: &TaskContext,
    id: ReleaseId,
    artist: &str,
    album: &str,
) -> Result<()> {
    match ctx.scrobbler.album_artwork(artist, album) {
        Ok(artwork) => ctx.event_tx.send(AppEvent::ArtworkResolved(id, artwork))?,
        // Artwork is cosmetic, a failed lookup leaves the release without it.
        Err(e) => log::warn!("Artwork lookup for {} - {} failed: {}", artist, album, e),
    }

    Ok(())
}

pub(super) fn authenticate(
    ctx: &TaskContext,
    attempt: SignInAttempt,
    username: String,
    secret: &Secret,
) -> Result<()> {
    let result = ctx.scrobbler.authenticate(&username, secret);
    if let Err(e) = &result {
        log::warn!("Sign in for {} failed: {}", username, e);
    }

    ctx.event_tx.send(AppEvent::SignInCompleted(attempt, result))?;

    Ok(())
}

pub(super) fn submit_now_playing(ctx: &TaskContext, track: &Track) -> Result<()> {
    match ctx.scrobbler.send_now_playing(track) {
        Ok(()) => log::info!("Now playing: {} - {}", track.artist, track.title),
        Err(e) => log::warn!("Failed to update now playing for {}: {}", track.title, e),
    }

    Ok(())
}

pub(super) fn scrobble(ctx: &TaskContext, track: Track, started_at: i64) -> Result<()> {
    match ctx.scrobbler.scrobble(&track, started_at) {
        Ok(()) => {
            log::info!("Scrobbled: {} - {}", track.artist, track.title);
            ctx.event_tx.send(AppEvent::Scrobbled(track))?;
        }
        Err(e) => log::error!("Failed to scrobble {}: {}", track.title, e),
    }

    Ok(())
}
