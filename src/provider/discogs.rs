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

//! Discogs release catalog client.
//!
//! Only the two endpoints the application needs are used: release lookup by
//! identifier and the release database search. Responses are deserialised
//! into private `Raw*` types that mirror the JSON, and then converted into
//! domain models, which is where durations are parsed and artist names
//! cleaned.

use serde::Deserialize;

use crate::{
    error::{Result, ScrobblerError},
    model::{
        DurationSource, Release, ReleaseId, ReleaseSummary, SearchPage, Track, clean_artist_name,
    },
    provider::{
        CatalogProvider,
        http::{USER_AGENT, create_http_agent},
    },
};

const API_BASE: &str = "https://api.discogs.com";

const UNKNOWN_TRACK: &str = "Unknown Track";

pub(crate) struct DiscogsClient {
    agent: ureq::Agent,
    token: String,
    user_agent: String,
    page_size: u32,
}

impl DiscogsClient {
    pub(crate) fn new(token: impl Into<String>, username: &str, page_size: u32) -> Self {
        Self {
            agent: create_http_agent(),
            token: token.into(),
            user_agent: user_agent(username),
            page_size: page_size.clamp(1, 100),
        }
    }

    fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}{}", API_BASE, path))
            .set("User-Agent", &self.user_agent)
            .set("Authorization", &format!("Discogs token={}", self.token))
            .set("Accept", "application/vnd.discogs.v2.discogs+json")
    }
}

impl CatalogProvider for DiscogsClient {
    fn load_release(&self, id: ReleaseId) -> Result<Release> {
        log::info!("Loading Discogs release {}", id);

        let raw: RawRelease = match self.get(&format!("/releases/{}", id)).call() {
            Ok(response) => response.into_json()?,
            Err(ureq::Error::Status(404, _)) => {
                return Err(ScrobblerError::NotFound(format!("release {}", id)));
            }
            Err(e) => return Err(e.into()),
        };

        let release = release_from_raw(raw)?;
        log::info!(
            "Loaded release: {} with {} tracks",
            release.title,
            release.tracks.len()
        );

        Ok(release)
    }

    fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScrobblerError::NotFound("empty search query".to_string()));
        }

        log::info!("Searching Discogs for '{}' (page {})", query, page);

        let raw: RawSearch = self
            .get("/database/search")
            .query("q", query)
            .query("type", "release")
            .query("page", &page.max(1).to_string())
            .query("per_page", &self.page_size.to_string())
            .call()?
            .into_json()?;

        Ok(search_page_from_raw(query, raw))
    }
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    uri: String,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    #[serde(default)]
    position: String,
    #[serde(rename = "type_", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    artists: Vec<RawArtist>,
    #[serde(default)]
    sub_tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    artists: Vec<RawArtist>,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(default)]
    tracklist: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawPagination {
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct RawSearchResult {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    format: Vec<String>,
    #[serde(default)]
    thumb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearch {
    pagination: RawPagination,
    #[serde(default)]
    results: Vec<RawSearchResult>,
}

fn release_from_raw(raw: RawRelease) -> Result<Release> {
    let id = ReleaseId(raw.id);
    let artist = raw
        .artists
        .first()
        .map(|a| clean_artist_name(&a.name))
        .unwrap_or_default();

    let artwork = raw
        .images
        .iter()
        .find(|i| i.kind == "primary")
        .or_else(|| raw.images.first())
        .map(|i| i.uri.clone())
        .filter(|uri| !uri.is_empty());

    let mut tracks = Vec::with_capacity(raw.tracklist.len());
    for entry in &raw.tracklist {
        collect_tracks(entry, &artist, &raw.title, &mut tracks);
    }

    Release::new(
        id,
        raw.title.clone(),
        artist,
        raw.year.filter(|y| *y > 0),
        artwork,
        tracks,
    )
}

/// Headings are skipped, index tracks contribute their sub-tracks.
fn collect_tracks(entry: &RawTrack, release_artist: &str, album: &str, out: &mut Vec<Track>) {
    match entry.kind.as_str() {
        "heading" => {}
        "index" => {
            for sub_track in &entry.sub_tracks {
                collect_tracks(sub_track, release_artist, album, out);
            }
        }
        _ => {
            let artist = entry
                .artists
                .first()
                .map(|a| clean_artist_name(&a.name))
                .unwrap_or_else(|| release_artist.to_string());

            let title = if entry.title.trim().is_empty() {
                UNKNOWN_TRACK
            } else {
                entry.title.trim()
            };

            let track = Track::from_catalog(&*entry.position, title, &entry.duration, artist, album);
            if track.duration_source != DurationSource::Catalog {
                log::warn!("No usable duration for track {}", track.position);
            }

            out.push(track);
        }
    }
}

fn search_page_from_raw(query: &str, raw: RawSearch) -> SearchPage {
    let results = raw
        .results
        .into_iter()
        .map(|r| ReleaseSummary {
            id: ReleaseId(r.id),
            title: r.title,
            year: r.year.and_then(|y| y.trim().parse().ok()).filter(|y| *y > 0),
            format: r.format,
            thumb: r.thumb.filter(|t| !t.is_empty()),
        })
        .collect();

    SearchPage {
        query: query.to_string(),
        results,
        page: raw.pagination.page,
        total_pages: raw.pagination.pages,
    }
}

/// Identifies the application, and the Discogs account using it when known.
fn user_agent(username: &str) -> String {
    match username.trim() {
        "" => USER_AGENT.to_string(),
        name => format!("{} (+https://www.discogs.com/user/{})", USER_AGENT, name),
    }
}
