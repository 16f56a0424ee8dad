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

//! Secure credential storage.
//!
//! The session gatekeeper persists the scrobble session through the opaque
//! [`CredentialStore`] key-value interface. The application backs it with a
//! small SQLite database in the configuration directory, readable only by
//! the current user.
//!
//! # Tables
//!
//! * `credentials` - One row per key, replaced on every write.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;

/// An opaque key-value store for secrets.
pub(crate) trait CredentialStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

pub(crate) struct SqliteCredentialStore {
    conn: Connection,
}

impl SqliteCredentialStore {
    /// Opens (creating if needed) the credential database at `path`.
    ///
    /// On Unix the file permissions are restricted to the owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be created.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            PRAGMA secure_delete = ON;
        ",
        )?;

        create_schema(&conn)?;
        restrict_permissions(path);

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM credentials WHERE key = ?1")?;

        Ok(stmt.query_row(params![key], |row| row.get(0)).optional()?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO credentials (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        )?;
        stmt.execute(params![key, value])?;

        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM credentials WHERE key = ?1")?;
        stmt.execute(params![key])?;

        Ok(())
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS credentials (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );",
    )?;

    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        log::warn!(
            "Failed to restrict permissions on {}: {}",
            path.display(),
            e
        );
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;

    use super::CredentialStore;
    use crate::error::{Result, ScrobblerError};

    /// A store that keeps values in memory, optionally failing every call.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) values: HashMap<String, String>,
        pub(crate) broken: bool,
    }

    impl MemoryStore {
        fn check(&self) -> Result<()> {
            if self.broken {
                Err(ScrobblerError::Store("store unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl CredentialStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.check()?;
            Ok(self.values.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.check()?;
            self.values.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn delete(&mut self, key: &str) -> Result<()> {
            self.check()?;
            self.values.remove(key);
            Ok(())
        }
    }
}
