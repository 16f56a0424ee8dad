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

//! # Vinyl Scrobbler.
//!
//! Scrobbles records played on a turntable to Last.fm.
//!
//! A release is looked up in the Discogs catalog and its track list is then
//! "played" in real time: a countdown runs for each track, "now playing" is
//! sent when a track starts, and a scrobble is submitted once the track has
//! played for long enough.
//!
//! It uses an event-driven architecture where:
//!
//! * The **Main Thread** owns all application state and runs the event loop.
//! * A **Task Worker** performs every network call and reports results back
//!   as events.
//! * An **Input Thread** reads commands from stdin and a **Ticker** drives
//!   the playback countdown once a second.
//!
//! Communication between threads is handled via `std::sync::mpsc` channels.

mod commander;
mod config;
mod error;
mod events;
mod model;
mod playback;
mod provider;
mod session;
mod store;
mod tasks;
mod util;

use anyhow::{Context, Result, bail};
use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread,
};

use crate::{
    config::AppConfig,
    events::{AppEvent, process_events},
    model::{ReleaseId, SearchPage},
    playback::{PlaybackController, PlaybackEvent, TICK_INTERVAL},
    provider::{CatalogProvider, ScrobbleProvider, discogs::DiscogsClient, lastfm::LastFmClient},
    session::Gatekeeper,
    store::{CredentialStore, SqliteCredentialStore},
    tasks::AppTask,
};

const CREDENTIALS_FILE: &str = "credentials.db";

/// Application state.
pub(crate) struct App {
    pub(crate) config: AppConfig,
    pub(crate) config_path: PathBuf,

    pub(crate) event_tx: Sender<AppEvent>,
    pub(crate) event_rx: Receiver<AppEvent>,

    pub(crate) task_tx: Sender<AppTask>,

    pub(crate) catalog: Arc<dyn CatalogProvider>,

    pub(crate) controller: PlaybackController,
    pub(crate) playback_rx: Receiver<PlaybackEvent>,

    pub(crate) gatekeeper: Gatekeeper,

    /// The last page of search results, for `page` and `pick`.
    pub(crate) search: Option<SearchPage>,
    pub(crate) artwork: Option<(ReleaseId, String)>,
}

impl App {
    /// Create a new instance of application state.
    pub(crate) fn new(
        config: AppConfig,
        config_path: PathBuf,
        catalog: Arc<dyn CatalogProvider>,
        scrobbler: Arc<dyn ScrobbleProvider>,
        store: Box<dyn CredentialStore>,
        task_tx: Sender<AppTask>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();

        let mut controller = PlaybackController::new(Box::new(task_tx.clone()));
        let playback_rx = controller.subscribe();

        Self {
            config,
            config_path,
            event_tx,
            event_rx,
            task_tx,
            catalog,
            controller,
            playback_rx,
            gatekeeper: Gatekeeper::new(scrobbler, store),
            search: None,
            artwork: None,
        }
    }

    /// Restores the stored Last.fm session, or signs in with configured
    /// credentials if there is none.
    fn start_session(&mut self) -> Result<()> {
        if self.gatekeeper.restore() {
            return Ok(());
        }

        let Some((username, secret)) = self.config.stored_credentials() else {
            log::info!("No Last.fm credentials configured, scrobbling disabled until sign in");
            return Ok(());
        };

        match self.gatekeeper.begin_sign_in(&username, &secret) {
            Ok(attempt) => self
                .task_tx
                .send(AppTask::Authenticate {
                    attempt,
                    username,
                    secret,
                })
                .context("Failed to start sign in")?,
            Err(e) => log::warn!("Automatic sign in skipped: {}", e),
        }

        Ok(())
    }
}

/// The entry point of the application.
///
/// Loads the configuration, wires the providers and worker threads together,
/// and returns an error if any part of the start up fails.
fn main() -> Result<()> {
    let config_path = config::config_file_path()?;
    let first_run = !config_path.exists();
    let config = config::load_config(&config_path)?;
    let config_dir = config::config_dir()?;

    let log_path = util::logging::init_logging(&config_dir, &config.log_level);
    log::info!("Starting Vinyl Scrobbler {}", env!("CARGO_PKG_VERSION"));

    if first_run {
        log::info!("Created default configuration file");
        println!("Welcome to Vinyl Scrobbler!");
        println!("A configuration file has been created at: {}", config_path.display());
        println!("Please edit this file to add your Last.fm and Discogs credentials.");
        return Ok(());
    }

    let missing = config.missing_fields();
    if !missing.is_empty() {
        log::error!("Missing configuration fields: {:?}", missing);
        bail!(
            "Missing required configuration fields: {}. Please edit the configuration file at: {}",
            missing.join(", "),
            config_path.display()
        );
    }

    let catalog: Arc<dyn CatalogProvider> = Arc::new(DiscogsClient::new(
        config.discogs_token.clone(),
        &config.discogs_username,
        config.search_page_size,
    ));
    let scrobbler: Arc<dyn ScrobbleProvider> = Arc::new(LastFmClient::new(
        config.lastfm_api_key.clone(),
        config.lastfm_api_secret.clone(),
    ));
    let store = SqliteCredentialStore::open(&config_dir.join(CREDENTIALS_FILE))
        .context("Failed to open credential store")?;

    let (task_tx, task_rx) = mpsc::channel();
    let mut app = App::new(
        config,
        config_path,
        catalog.clone(),
        scrobbler.clone(),
        Box::new(store),
        task_tx,
    );

    run(&mut app, catalog, scrobbler, task_rx).context("Application error occurred")?;

    log::info!("Exiting");
    if let Some(path) = log_path {
        println!("Log written to {}", path.display());
    }

    Ok(())
}

/// Starts the application's background workers and enters the main event loop.
///
/// This function spawns several long-running background threads:
/// * A task worker to process [`AppTask`]s.
/// * An input thread reading command lines from stdin.
/// * A tick thread driving the playback countdown.
///
/// # Errors
///
/// Returns an error if the event processing loop encounters an unrecoverable
/// application error.
fn run(
    app: &mut App,
    catalog: Arc<dyn CatalogProvider>,
    scrobbler: Arc<dyn ScrobbleProvider>,
    task_rx: Receiver<AppTask>,
) -> Result<()> {
    tasks::spawn_task_worker(catalog, scrobbler, task_rx, app.event_tx.clone());

    // Lines from stdin become commands; end of input quits.
    let tx_input = app.event_tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx_input.send(AppEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        let _ = tx_input.send(AppEvent::ExitApplication);
    });

    let tx_tick = app.event_tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(TICK_INTERVAL);
            if tx_tick.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    app.start_session()?;

    println!("Vinyl Scrobbler - type 'help' for a list of commands");

    // Application event loop, process events until the user quits
    process_events(app)
}
