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

//! Scrobble service session management.
//!
//! The [`Gatekeeper`] is the only writer of the authentication session. It
//! moves between three states:
//!
//! ```text
//! SignedOut --begin_sign_in--> Authenticating --success--> SignedIn
//!     ^                              |                        |
//!     +-------------failure----------+                        |
//!     +-------------------------sign_out----------------------+
//! ```
//!
//! Sign-in is split into [`Gatekeeper::begin_sign_in`] and
//! [`Gatekeeper::complete_sign_in`] so that the network round trip can run on
//! the task worker while the state itself is only touched from the event
//! loop. Each attempt is identified by a [`SignInAttempt`]; a completion for
//! an attempt that has since been abandoned (signed out, or replaced by a
//! newer attempt) is ignored.

use std::sync::Arc;

use crate::{
    error::{Result, ScrobblerError},
    playback::SessionGate,
    provider::{ScrobbleProvider, Secret, SessionToken},
    store::CredentialStore,
};

const SESSION_KEY: &str = "lastfm.session_key";
const USERNAME_KEY: &str = "lastfm.username";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthState {
    SignedOut,
    Authenticating,
    SignedIn,
}

/// A read-only view of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AuthSession {
    pub(crate) is_authenticated: bool,
    pub(crate) username: Option<String>,
}

/// Identifies one sign-in round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SignInAttempt(u64);

pub(crate) struct Gatekeeper {
    state: AuthState,
    username: Option<String>,
    /// The attempt whose completion will be accepted, while `Authenticating`.
    pending: Option<SignInAttempt>,
    attempts: u64,
    provider: Arc<dyn ScrobbleProvider>,
    store: Box<dyn CredentialStore>,
}

impl Gatekeeper {
    pub(crate) fn new(provider: Arc<dyn ScrobbleProvider>, store: Box<dyn CredentialStore>) -> Self {
        Self {
            state: AuthState::SignedOut,
            username: None,
            pending: None,
            attempts: 0,
            provider,
            store,
        }
    }

    pub(crate) fn state(&self) -> &AuthState {
        &self.state
    }

    pub(crate) fn session(&self) -> AuthSession {
        AuthSession {
            is_authenticated: self.current_session_valid(),
            username: self.username.clone(),
        }
    }

    /// Restores a previously stored session without contacting the service.
    ///
    /// Returns `true` if a session was restored. A store that cannot be read
    /// leaves the gatekeeper signed out.
    pub(crate) fn restore(&mut self) -> bool {
        if self.state != AuthState::SignedOut {
            return self.current_session_valid();
        }

        let stored = self
            .store
            .get(SESSION_KEY)
            .and_then(|key| Ok((key, self.store.get(USERNAME_KEY)?)));

        match stored {
            Ok((Some(key), username)) => {
                self.provider.set_session(SessionToken::new(key));
                self.username = username;
                self.state = AuthState::SignedIn;
                log::info!(
                    "Restored Last.fm session for {}",
                    self.username.as_deref().unwrap_or("unknown user")
                );
                true
            }
            Ok((None, _)) => false,
            Err(e) => {
                log::error!("Failed to read stored session: {}", e);
                self.clear();
                false
            }
        }
    }

    /// Validates credentials and enters the `Authenticating` state.
    ///
    /// The returned attempt must be passed to [`Self::complete_sign_in`].
    ///
    /// # Errors
    ///
    /// Returns [`ScrobblerError::Auth`] if either credential is empty or a
    /// session is already active or being established.
    pub(crate) fn begin_sign_in(&mut self, username: &str, secret: &Secret) -> Result<SignInAttempt> {
        match self.state {
            AuthState::SignedOut => {}
            AuthState::Authenticating => {
                return Err(ScrobblerError::Auth("sign-in already in progress".to_string()));
            }
            AuthState::SignedIn => {
                return Err(ScrobblerError::Auth(
                    "already signed in, sign out first".to_string(),
                ));
            }
        }

        let username = username.trim();
        if username.is_empty() || secret.is_empty() {
            return Err(ScrobblerError::Auth("username and password are required".to_string()));
        }

        self.attempts += 1;
        let attempt = SignInAttempt(self.attempts);

        self.username = Some(username.to_string());
        self.pending = Some(attempt);
        self.state = AuthState::Authenticating;
        log::info!("Signing in to Last.fm as {}", username);

        Ok(attempt)
    }

    /// Applies the outcome of the provider's authentication call.
    ///
    /// Returns `Ok(false)` without touching any state if `attempt` is not the
    /// sign-in currently in progress. On success the token is persisted and
    /// handed to the provider. On failure the store is left untouched and the
    /// error is returned to the sign-in flow.
    pub(crate) fn complete_sign_in(
        &mut self,
        attempt: SignInAttempt,
        result: Result<SessionToken>,
    ) -> Result<bool> {
        if self.state != AuthState::Authenticating || self.pending != Some(attempt) {
            log::info!("Ignoring completion of abandoned sign-in {:?}", attempt);
            return Ok(false);
        }
        self.pending = None;

        let token = match result {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Sign-in failed: {}", e);
                self.state = AuthState::SignedOut;
                self.username = None;
                return Err(e);
            }
        };

        let username = self.username.clone().unwrap_or_default();
        let persisted = self
            .store
            .set(SESSION_KEY, token.as_str())
            .and_then(|_| self.store.set(USERNAME_KEY, &username));

        if let Err(e) = persisted {
            log::error!("Failed to store session: {}", e);
            self.clear();
            return Err(e);
        }

        self.provider.set_session(token);
        self.state = AuthState::SignedIn;
        log::info!("Signed in to Last.fm as {}", username);

        Ok(true)
    }

    /// Signs in synchronously, blocking on the provider.
    #[cfg(test)]
    pub(crate) fn sign_in(&mut self, username: &str, secret: &Secret) -> Result<()> {
        let attempt = self.begin_sign_in(username, secret)?;
        let result = self.provider.authenticate(username.trim(), secret);
        self.complete_sign_in(attempt, result).map(|_| ())
    }

    /// Ends the session and removes it from the store.
    ///
    /// The gatekeeper is always signed out afterwards, even if the store
    /// could not be cleared.
    pub(crate) fn sign_out(&mut self) -> Result<()> {
        let cleared = self
            .store
            .delete(SESSION_KEY)
            .and_then(|_| self.store.delete(USERNAME_KEY));

        self.provider.clear_session();
        self.state = AuthState::SignedOut;
        self.username = None;
        self.pending = None;
        log::info!("Signed out of Last.fm");

        cleared
    }

    /// Drops the session after a credential store failure.
    fn clear(&mut self) {
        if let Err(e) = self
            .store
            .delete(SESSION_KEY)
            .and_then(|_| self.store.delete(USERNAME_KEY))
        {
            log::warn!("Failed to clear stored session: {}", e);
        }

        self.provider.clear_session();
        self.state = AuthState::SignedOut;
        self.username = None;
        self.pending = None;
    }
}

impl SessionGate for Gatekeeper {
    fn current_session_valid(&self) -> bool {
        self.state == AuthState::SignedIn
    }
}
