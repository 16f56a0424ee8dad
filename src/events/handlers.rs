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
    App,
    commander::{self, Command, HELP},
    config,
    error::Result as ProviderResult,
    events::AppEvent,
    model::{DurationSource, Release, ReleaseId, SearchPage, Track},
    provider::{Secret, SessionToken},
    session::{AuthState, SignInAttempt},
    tasks::AppTask,
    util::format::{format_progress, format_time},
};

const PROGRESS_WIDTH: usize = 30;

pub(super) fn handle_input(app: &mut App, line: &str) -> Result<()> {
    match commander::parse(line) {
        Ok(Some(command)) => handle_command(app, command),
        Ok(None) => Ok(()),
        Err(e) => {
            println!("{}", e);
            Ok(())
        }
    }
}

/// Carries out a parsed command.
///
/// Anything that needs the network is handed to the task worker; the result
/// comes back later as an [`AppEvent`].
///
/// # Errors
///
/// Returns an error if the task worker or the event loop has gone away.
pub(super) fn handle_command(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Load(target) => match app.catalog.resolve_identifier(&target) {
            Ok(id) => request_release(app, id)?,
            Err(e) => println!("Could not find a release ID in '{}': {}", target, e),
        },

        Command::Search(query) => {
            println!("Searching for '{}'...", query);
            app.task_tx.send(AppTask::Search { query, page: 1 })?;
        }

        Command::Page(page) => match &app.search {
            Some(search) if page <= search.total_pages.max(1) => {
                let query = search.query.clone();
                app.task_tx.send(AppTask::Search { query, page })?;
            }
            Some(search) => println!("There are only {} pages of results", search.total_pages),
            None => println!("Nothing searched for yet"),
        },

        Command::Pick(n) => {
            let picked = app
                .search
                .as_ref()
                .and_then(|s| s.results.get(n - 1))
                .map(|r| r.id);

            match picked {
                Some(id) => request_release(app, id)?,
                None => println!("No search result {}", n),
            }
        }

        Command::Play => {
            if app.controller.state().current_release.is_none() {
                println!("No release loaded, use 'load' or 'search' first");
            } else {
                app.controller.play();
            }
        }
        Command::Pause => app.controller.pause(),
        Command::Toggle => app.controller.toggle_play_pause(),

        Command::Next => {
            if !app.controller.next_track() {
                println!("Already at the last track");
            }
        }
        Command::Previous => {
            if !app.controller.previous_track() {
                println!("Already at the first track");
            }
        }
        Command::Track(target) => select_track(app, &target),

        Command::Tracks => print_tracks(app),
        Command::Status => print_status(app),

        Command::SignIn { username, password } => {
            let secret = Secret::Password(password);
            match app.gatekeeper.begin_sign_in(&username, &secret) {
                Ok(attempt) => {
                    println!("Signing in as {}...", username);
                    app.task_tx.send(AppTask::Authenticate {
                        attempt,
                        username,
                        secret,
                    })?;
                }
                Err(e) => println!("Cannot sign in: {}", e),
            }
        }
        Command::SignOut => {
            if let Err(e) = app.gatekeeper.sign_out() {
                log::warn!("Stored session could not be removed: {}", e);
            }
            println!("Signed out");
        }

        Command::Notifications => {
            app.config.show_notifications = !app.config.show_notifications;
            log::info!("Notifications toggled to: {}", app.config.show_notifications);
            if let Err(e) = config::save_config(&app.config_path, &app.config) {
                log::warn!("{:#}", e);
            }
            println!(
                "Notifications {}",
                if app.config.show_notifications { "on" } else { "off" }
            );
        }

        Command::Close => {
            app.controller.unload();
            app.artwork = None;
        }

        Command::Help => println!("{}", HELP),

        Command::Quit => app.event_tx.send(AppEvent::ExitApplication)?,
    }

    Ok(())
}

fn request_release(app: &mut App, id: ReleaseId) -> Result<()> {
    println!("Loading release {}...", id);
    app.controller.begin_load(id);
    app.task_tx.send(AppTask::LoadRelease(id))?;

    Ok(())
}

/// Selects a track by catalog position, falling back to a 1-based number.
fn select_track(app: &mut App, target: &str) {
    if app.controller.select_position(target) {
        return;
    }

    let selected = target
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .is_some_and(|n| app.controller.select_track(n - 1));

    if !selected {
        println!("No track '{}' on this release", target);
    }
}

pub(super) fn handle_tick(app: &mut App) {
    app.controller.tick(&app.gatekeeper);
}

pub(super) fn handle_release_loaded(
    app: &mut App,
    id: ReleaseId,
    result: ProviderResult<Release>,
) -> Result<()> {
    match app.controller.complete_load(id, result) {
        Ok(true) => {}
        Ok(false) => return Ok(()),
        Err(e) => {
            println!("Failed to load release {}: {}", id, e);
            return Ok(());
        }
    }

    app.artwork = None;
    let Some(release) = app.controller.state().current_release.as_ref() else {
        return Ok(());
    };

    println!(
        "Loaded: {} - {}{} ({} tracks, {})",
        release.artist,
        release.title,
        release.year.map(|y| format!(" [{}]", y)).unwrap_or_default(),
        release.tracks.len(),
        format_time(release.total_seconds())
    );

    match &release.artwork_reference {
        Some(artwork) => app.artwork = Some((id, artwork.clone())),
        None => {
            let task = AppTask::ResolveArtwork {
                id,
                artist: release.artist.clone(),
                album: release.title.clone(),
            };
            app.task_tx.send(task)?;
        }
    }

    Ok(())
}

pub(super) fn handle_search_results(app: &mut App, result: ProviderResult<SearchPage>) {
    match result {
        Ok(page) => {
            print_search_page(&page);
            app.search = Some(page);
        }
        Err(e) => println!("Search failed: {}", e),
    }
}

pub(super) fn handle_artwork_resolved(app: &mut App, id: ReleaseId, artwork: Option<String>) {
    let current = app
        .controller
        .state()
        .current_release
        .as_ref()
        .map(|r| r.id);

    if current != Some(id) {
        log::debug!("Discarding artwork for release {} which is no longer loaded", id);
        return;
    }

    match artwork {
        Some(artwork) => {
            log::info!("Artwork for release {}: {}", id, artwork);
            app.artwork = Some((id, artwork));
        }
        None => log::info!("No artwork found for release {}", id),
    }
}

pub(super) fn handle_sign_in_completed(
    app: &mut App,
    attempt: SignInAttempt,
    result: ProviderResult<SessionToken>,
) {
    match app.gatekeeper.complete_sign_in(attempt, result) {
        Ok(true) => println!(
            "Signed in as {}",
            app.gatekeeper.session().username.unwrap_or_default()
        ),
        Ok(false) => {}
        Err(e) => println!("Sign in failed: {}", e),
    }
}

pub(super) fn handle_scrobbled(app: &mut App, track: &Track) {
    if app.config.show_notifications {
        println!("Scrobbled: {} - {}", track.artist, track.title);
    }
}

fn print_search_page(page: &SearchPage) {
    if page.results.is_empty() {
        println!("No releases found for '{}'", page.query);
        return;
    }

    println!(
        "Results for '{}' (page {} of {}):",
        page.query, page.page, page.total_pages
    );
    for (i, result) in page.results.iter().enumerate() {
        let year = result.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        let format = if result.format.is_empty() {
            String::new()
        } else {
            format!(" [{}]", result.format.join(", "))
        };
        println!("{:>3}. {}{}{}  #{}", i + 1, result.title, year, format, result.id);
        if let Some(thumb) = &result.thumb {
            log::debug!("Thumbnail for release {}: {}", result.id, thumb);
        }
    }

    if page.has_next() {
        println!("Use 'page {}' for more, 'pick <n>' to load", page.page + 1);
    } else {
        println!("Use 'pick <n>' to load");
    }
}

fn print_tracks(app: &App) {
    let state = app.controller.state();
    let Some(release) = &state.current_release else {
        println!("No release loaded");
        return;
    };

    println!("{} - {}", release.artist, release.title);
    for (i, track) in release.tracks.iter().enumerate() {
        let marker = if i == state.current_track_index { '>' } else { ' ' };
        let estimated = if track.duration_source == DurationSource::Default {
            " (estimated)"
        } else {
            ""
        };
        println!(
            "{} {:>4}  {}  {}{}",
            marker,
            track.position,
            track.title,
            track.duration(),
            estimated
        );
    }
}

fn print_status(app: &App) {
    let state = app.controller.state();

    match (&state.current_release, state.current_track()) {
        (Some(release), Some(track)) => {
            println!("Release: {} - {}", release.artist, release.title);
            println!(
                "Track {}/{}: {} {} ({})",
                state.current_track_index + 1,
                release.tracks.len(),
                track.position,
                track.title,
                if state.is_playing { "playing" } else { "paused" }
            );
            println!(
                "{}  -{}",
                format_progress(state.elapsed_seconds, track.duration_seconds, PROGRESS_WIDTH),
                format_time(u64::from(state.remaining_seconds()))
            );
        }
        _ => println!("No release loaded"),
    }

    if let Some(id) = app.controller.pending_load() {
        println!("Loading release {}...", id);
    }
    if let Some((_, artwork)) = &app.artwork {
        println!("Artwork: {}", artwork);
    }

    let session = app.gatekeeper.session();
    if session.is_authenticated {
        println!(
            "Last.fm: signed in as {}",
            session.username.as_deref().unwrap_or("unknown user")
        );
    } else if *app.gatekeeper.state() == AuthState::Authenticating {
        println!("Last.fm: signing in...");
    } else {
        println!("Last.fm: signed out, scrobbling disabled");
    }
    println!(
        "Notifications: {}",
        if app.config.show_notifications { "on" } else { "off" }
    );
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};

    use super::*;
    use crate::{
        config::AppConfig,
        error::ScrobblerError,
        provider::{CatalogProvider, fakes::FakeScrobbler},
        store::fakes::MemoryStore,
    };

    struct NoCatalog;

    impl CatalogProvider for NoCatalog {
        fn load_release(&self, id: ReleaseId) -> ProviderResult<Release> {
            Err(ScrobblerError::NotFound(id.to_string()))
        }

        fn search(&self, query: &str, _page: u32) -> ProviderResult<SearchPage> {
            Err(ScrobblerError::NotFound(query.to_string()))
        }
    }

    fn app() -> (App, mpsc::Receiver<AppTask>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (task_tx, task_rx) = mpsc::channel();
        let app = App::new(
            AppConfig::default(),
            dir.path().join("vinyl-scrobbler.toml"),
            Arc::new(NoCatalog),
            Arc::new(FakeScrobbler::default()),
            Box::new(MemoryStore::default()),
            task_tx,
        );
        (app, task_rx, dir)
    }

    fn release(id: u64, artwork: Option<&str>) -> Release {
        let tracks = vec![
            Track::new("A1", "One", 10, DurationSource::Catalog, "Artist", "Album"),
            Track::new("A2", "Two", 20, DurationSource::Catalog, "Artist", "Album"),
        ];
        Release::new(
            ReleaseId(id),
            "Album",
            "Artist",
            Some(1980),
            artwork.map(str::to_string),
            tracks,
        )
        .unwrap()
    }

    fn load(app: &mut App, tasks: &mpsc::Receiver<AppTask>, id: u64, artwork: Option<&str>) {
        handle_input(app, &format!("load {}", id)).unwrap();
        assert!(matches!(tasks.try_recv(), Ok(AppTask::LoadRelease(_))));
        handle_release_loaded(app, ReleaseId(id), Ok(release(id, artwork))).unwrap();
    }

    #[test]
    fn load_command_queues_catalog_lookup() {
        let (mut app, tasks, _dir) = app();

        handle_input(&mut app, "load https://www.discogs.com/release/8844291-Some-Album").unwrap();

        assert!(matches!(
            tasks.try_recv(),
            Ok(AppTask::LoadRelease(ReleaseId(8844291)))
        ));
        assert_eq!(app.controller.pending_load(), Some(ReleaseId(8844291)));
    }

    #[test]
    fn unreadable_load_target_queues_nothing() {
        let (mut app, tasks, _dir) = app();

        handle_input(&mut app, "load nothing-here").unwrap();

        assert!(tasks.try_recv().is_err());
        assert_eq!(app.controller.pending_load(), None);
    }

    #[test]
    fn loaded_release_without_artwork_requests_it() {
        let (mut app, tasks, _dir) = app();

        load(&mut app, &tasks, 5, None);

        match tasks.try_recv() {
            Ok(AppTask::ResolveArtwork { id, artist, album }) => {
                assert_eq!(id, ReleaseId(5));
                assert_eq!(artist, "Artist");
                assert_eq!(album, "Album");
            }
            other => panic!("unexpected task {:?}", other),
        }

        handle_artwork_resolved(&mut app, ReleaseId(5), Some("https://img/5.jpg".to_string()));
        assert_eq!(app.artwork, Some((ReleaseId(5), "https://img/5.jpg".to_string())));
    }

    #[test]
    fn catalog_artwork_is_used_directly() {
        let (mut app, tasks, _dir) = app();

        load(&mut app, &tasks, 6, Some("https://img/6.jpg"));

        assert!(tasks.try_recv().is_err());
        assert_eq!(app.artwork, Some((ReleaseId(6), "https://img/6.jpg".to_string())));
    }

    #[test]
    fn stale_release_is_ignored() {
        let (mut app, tasks, _dir) = app();

        handle_input(&mut app, "load 1").unwrap();
        handle_input(&mut app, "load 2").unwrap();
        handle_release_loaded(&mut app, ReleaseId(1), Ok(release(1, None))).unwrap();

        assert_eq!(app.controller.state().current_release, None);
        let queued: Vec<AppTask> = tasks.try_iter().collect();
        assert_eq!(queued.len(), 2);
    }

    #[test]
    fn artwork_for_another_release_is_ignored() {
        let (mut app, tasks, _dir) = app();
        load(&mut app, &tasks, 7, None);

        handle_artwork_resolved(&mut app, ReleaseId(8), Some("https://img/8.jpg".to_string()));

        assert_eq!(app.artwork, None);
    }

    #[test]
    fn sign_in_runs_through_the_worker() {
        let (mut app, tasks, _dir) = app();

        handle_input(&mut app, "signin alice secret").unwrap();
        assert_eq!(app.gatekeeper.state(), &AuthState::Authenticating);
        let attempt = match tasks.try_recv() {
            Ok(AppTask::Authenticate {
                attempt,
                username,
                secret,
            }) => {
                assert_eq!(username, "alice");
                assert!(matches!(secret, Secret::Password(p) if p == "secret"));
                attempt
            }
            other => panic!("unexpected task {:?}", other),
        };

        handle_sign_in_completed(&mut app, attempt, Ok(SessionToken::new("key")));
        assert_eq!(app.gatekeeper.state(), &AuthState::SignedIn);
    }

    fn next_attempt(tasks: &mpsc::Receiver<AppTask>) -> SignInAttempt {
        match tasks.try_recv() {
            Ok(AppTask::Authenticate { attempt, .. }) => attempt,
            other => panic!("unexpected task {:?}", other),
        }
    }

    #[test]
    fn sign_in_result_after_sign_out_is_dropped() {
        let (mut app, tasks, _dir) = app();

        handle_input(&mut app, "signin alice secret").unwrap();
        let alice = next_attempt(&tasks);
        handle_input(&mut app, "signout").unwrap();
        handle_input(&mut app, "signin bob hunter2").unwrap();
        let bob = next_attempt(&tasks);

        handle_sign_in_completed(&mut app, alice, Ok(SessionToken::new("key-alice")));
        assert_eq!(app.gatekeeper.state(), &AuthState::Authenticating);
        assert_eq!(app.gatekeeper.session().username.as_deref(), Some("bob"));
        assert!(!app.gatekeeper.session().is_authenticated);

        handle_sign_in_completed(&mut app, bob, Ok(SessionToken::new("key-bob")));
        assert_eq!(app.gatekeeper.state(), &AuthState::SignedIn);
        assert_eq!(app.gatekeeper.session().username.as_deref(), Some("bob"));
    }

    #[test]
    fn ticks_scrobble_only_when_signed_in() {
        let (mut app, tasks, _dir) = app();
        load(&mut app, &tasks, 9, Some("art"));

        handle_input(&mut app, "play").unwrap();
        assert!(matches!(tasks.try_recv(), Ok(AppTask::SubmitNowPlaying(_))));
        for _ in 0..5 {
            handle_tick(&mut app);
        }
        assert!(tasks.try_recv().is_err());

        handle_input(&mut app, "next").unwrap();
        assert!(matches!(tasks.try_recv(), Ok(AppTask::SubmitNowPlaying(_))));
        app.gatekeeper
            .sign_in("alice", &Secret::Password("pw".to_string()))
            .unwrap();
        for _ in 0..10 {
            handle_tick(&mut app);
        }
        match tasks.try_recv() {
            Ok(AppTask::Scrobble(track, _)) => assert_eq!(track.title, "Two"),
            other => panic!("unexpected task {:?}", other),
        }
    }

    #[test]
    fn track_command_accepts_position_or_number() {
        let (mut app, tasks, _dir) = app();
        load(&mut app, &tasks, 3, Some("art"));

        handle_input(&mut app, "track a2").unwrap();
        assert_eq!(app.controller.state().current_track_index, 1);

        handle_input(&mut app, "track 1").unwrap();
        assert_eq!(app.controller.state().current_track_index, 0);

        handle_input(&mut app, "track 9").unwrap();
        assert_eq!(app.controller.state().current_track_index, 0);
    }

    #[test]
    fn pick_loads_search_result() {
        let (mut app, tasks, _dir) = app();
        handle_search_results(
            &mut app,
            Ok(SearchPage {
                query: "animals".to_string(),
                results: vec![crate::model::ReleaseSummary {
                    id: ReleaseId(42),
                    title: "Pink Floyd - Animals".to_string(),
                    year: Some(1977),
                    format: vec!["Vinyl".to_string()],
                    thumb: None,
                }],
                page: 1,
                total_pages: 1,
            }),
        );

        handle_input(&mut app, "pick 2").unwrap();
        assert!(tasks.try_recv().is_err());

        handle_input(&mut app, "pick 1").unwrap();
        assert!(matches!(
            tasks.try_recv(),
            Ok(AppTask::LoadRelease(ReleaseId(42)))
        ));
    }

    #[test]
    fn close_unloads_release() {
        let (mut app, tasks, _dir) = app();
        load(&mut app, &tasks, 4, Some("art"));

        handle_input(&mut app, "close").unwrap();

        assert_eq!(app.controller.state().current_release, None);
        assert_eq!(app.artwork, None);
    }

    #[test]
    fn notifications_toggle_is_saved() {
        let (mut app, _tasks, dir) = app();

        handle_input(&mut app, "notifications").unwrap();

        assert!(!app.config.show_notifications);
        let saved = config::load_config(&dir.path().join("vinyl-scrobbler.toml")).unwrap();
        assert!(!saved.show_notifications);
    }

    #[test]
    fn quit_requests_exit() {
        let (mut app, _tasks, _dir) = app();

        handle_input(&mut app, "quit").unwrap();

        assert!(matches!(app.event_rx.try_recv(), Ok(AppEvent::ExitApplication)));
    }
}
