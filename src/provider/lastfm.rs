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

//! Last.fm scrobbling client.
//!
//! Write methods (`auth.getMobileSession`, `track.updateNowPlaying`,
//! `track.scrobble`) are signed POSTs, read methods (`album.getInfo`,
//! `track.getInfo`) are plain GETs. All calls request JSON and Last.fm
//! reports failures as `{"error": code, "message": ...}` bodies, sometimes
//! with a 4xx status and sometimes with 200, so both paths end up in
//! [`check_error`].

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{Result, ScrobblerError},
    model::Track,
    provider::{ScrobbleProvider, Secret, SessionToken, http::create_http_agent, md5_hex},
};

const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

/// Image sizes in order of preference.
const ARTWORK_SIZES: [&str; 4] = ["mega", "extralarge", "large", "medium"];

pub(crate) struct LastFmClient {
    agent: ureq::Agent,
    api_key: String,
    api_secret: String,
    session: Mutex<Option<SessionToken>>,
}

impl LastFmClient {
    pub(crate) fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            agent: create_http_agent(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            session: Mutex::new(None),
        }
    }

    fn session_key(&self) -> Result<String> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| token.as_str().to_string())
            .ok_or_else(|| ScrobblerError::Auth("not signed in".to_string()))
    }

    /// Sends a signed write request.
    fn post_signed(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut params: Vec<(&str, String)> = params.to_vec();
        params.push(("method", method.to_string()));
        params.push(("api_key", self.api_key.clone()));

        let signature = sign(&params, &self.api_secret);
        params.push(("api_sig", signature));
        params.push(("format", "json".to_string()));

        let form: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        read_response(self.agent.post(API_ROOT).send_form(&form))
    }

    /// Sends an unsigned read request.
    fn get(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut request = self
            .agent
            .get(API_ROOT)
            .query("method", method)
            .query("api_key", &self.api_key)
            .query("format", "json");

        for (key, value) in params {
            request = request.query(key, value);
        }

        read_response(request.call())
    }
}

impl ScrobbleProvider for LastFmClient {
    fn authenticate(&self, username: &str, secret: &Secret) -> Result<SessionToken> {
        let username = username.trim();
        if username.is_empty() || secret.is_empty() {
            return Err(ScrobblerError::Auth("username and password are required".to_string()));
        }

        let auth_token = md5_hex(&format!("{}{}", username, secret.md5_hex()));
        let value = self.post_signed(
            "auth.getMobileSession",
            &[("username", username.to_string()), ("authToken", auth_token)],
        )?;

        let response: SessionResponse = serde_json::from_value(value)?;
        log::info!("Authenticated with Last.fm as {}", response.session.name);

        Ok(SessionToken::new(response.session.key))
    }

    fn set_session(&self, token: SessionToken) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear_session(&self) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn send_now_playing(&self, track: &Track) -> Result<()> {
        let session_key = self.session_key()?;

        self.post_signed(
            "track.updateNowPlaying",
            &[
                ("artist", track.artist.clone()),
                ("track", track.title.clone()),
                ("album", track.album.clone()),
                ("duration", track.duration_seconds.to_string()),
                ("sk", session_key),
            ],
        )?;

        log::info!("Updated now playing: {} - {}", track.artist, track.title);
        Ok(())
    }

    fn scrobble(&self, track: &Track, started_at: i64) -> Result<()> {
        let session_key = self.session_key()?;

        let value = self.post_signed(
            "track.scrobble",
            &[
                ("artist", track.artist.clone()),
                ("track", track.title.clone()),
                ("album", track.album.clone()),
                ("duration", track.duration_seconds.to_string()),
                ("timestamp", started_at.to_string()),
                ("sk", session_key),
            ],
        )?;

        let ignored = value["scrobbles"]["@attr"]["ignored"]
            .as_u64()
            .or_else(|| value["scrobbles"]["@attr"]["ignored"].as_str()?.parse().ok())
            .unwrap_or(0);
        if ignored > 0 {
            return Err(ScrobblerError::Network(format!(
                "scrobble of {} - {} was ignored",
                track.artist, track.title
            )));
        }

        log::info!("Scrobbled: {} - {}", track.artist, track.title);
        Ok(())
    }

    fn album_artwork(&self, artist: &str, album: &str) -> Result<Option<String>> {
        log::info!("Fetching Last.fm artwork for {} - {}", artist, album);

        let value = self.get("album.getInfo", &[("artist", artist), ("album", album)])?;
        let response: AlbumInfoResponse = serde_json::from_value(value)?;

        Ok(pick_artwork(&response.album.image))
    }

    fn track_duration(&self, artist: &str, title: &str) -> Result<Option<u32>> {
        log::info!("Fetching duration from Last.fm for: {} - {}", artist, title);

        let value = self.get("track.getInfo", &[("artist", artist), ("track", title)])?;
        let millis = &value["track"]["duration"];
        let millis = millis
            .as_u64()
            .or_else(|| millis.as_str().and_then(|s| s.parse().ok()))
            .unwrap_or(0);

        Ok(u32::try_from(millis / 1000).ok().filter(|s| *s > 0))
    }
}

#[derive(Debug, Deserialize)]
struct RawSession {
    name: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: RawSession,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "#text", default)]
    url: String,
    #[serde(default)]
    size: String,
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    #[serde(default)]
    image: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumInfoResponse {
    album: RawAlbum,
}

/// Computes the `api_sig` parameter: the md5 of every parameter sorted by
/// name and concatenated as name + value, followed by the shared secret.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params
        .iter()
        .filter(|(k, _)| *k != "format" && *k != "callback")
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut text = String::new();
    for (key, value) in sorted {
        text.push_str(key);
        text.push_str(value);
    }
    text.push_str(secret);

    md5_hex(&text)
}

fn read_response(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<Value> {
    match result {
        Ok(response) => check_error(response.into_json()?),
        Err(ureq::Error::Status(code, response)) => match response.into_json::<Value>() {
            Ok(body) if body.get("error").is_some() => check_error(body),
            _ => Err(status_error(code)),
        },
        Err(e) => Err(e.into()),
    }
}

fn status_error(code: u16) -> ScrobblerError {
    match code {
        404 => ScrobblerError::NotFound(format!("Last.fm returned {}", code)),
        401 | 403 => ScrobblerError::Auth(format!("Last.fm returned {}", code)),
        _ => ScrobblerError::Network(format!("Last.fm returned {}", code)),
    }
}

fn check_error(value: Value) -> Result<Value> {
    let Some(code) = value.get("error").and_then(Value::as_i64) else {
        return Ok(value);
    };

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    Err(match code {
        // Authentication failed, invalid session, invalid API key, invalid
        // token, unauthorized token, expired token, suspended API key
        4 | 9 | 10 | 13 | 14 | 15 | 26 => ScrobblerError::Auth(message),
        6 => ScrobblerError::NotFound(message),
        _ => ScrobblerError::Network(format!("Last.fm error {}: {}", code, message)),
    })
}

fn pick_artwork(images: &[RawImage]) -> Option<String> {
    ARTWORK_SIZES.iter().find_map(|size| {
        images
            .iter()
            .find(|i| i.size == *size && !i.url.trim().is_empty())
            .map(|i| i.url.clone())
    })
}
