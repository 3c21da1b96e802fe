//! Library store: the accessor contract plus the SQLite implementation

use crate::config::GameledgerConfig;
use crate::error::{GameledgerError, Result};
use crate::models::{AppId, Candidate, EntryKind, LibraryEntry};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Narrow accessor contract over whatever holds the canonical library.
///
/// The core reads and writes entries only through these four operations and
/// never assumes a storage medium.
pub trait LibraryStore {
    /// All entries in the library
    fn list_entries(&self) -> Result<Vec<LibraryEntry>>;

    /// Look up one entry by id
    fn get_entry(&self, id: &AppId) -> Result<Option<LibraryEntry>>;

    /// Insert the entry, or replace the stored one with the same id
    fn upsert_entry(&mut self, entry: &LibraryEntry) -> Result<()>;

    /// Record `parent` as the base game of `child`
    ///
    /// # Errors
    /// Returns `EntryNotFound` if either id is absent
    fn set_parent(&mut self, child: &AppId, parent: &AppId) -> Result<()>;

    /// The library reduced to matcher input
    fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .list_entries()?
            .into_iter()
            .map(|entry| Candidate {
                id: entry.id,
                name: entry.name,
            })
            .collect())
    }
}

/// Aggregate numbers over the base-game entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_games: u32,
    pub total_hours: f64,
    pub average_hours: f64,
}

/// Compute stats over base-game entries, with hours rounded to 2 decimals.
#[must_use]
pub fn library_stats(entries: &[LibraryEntry]) -> LibraryStats {
    let mut total_games = 0u32;
    let mut total_hours = 0.0f64;

    for entry in entries {
        if entry.kind == EntryKind::Game {
            total_games += 1;
            total_hours += entry.hours_played;
        }
    }

    if total_games == 0 {
        return LibraryStats::default();
    }

    LibraryStats {
        total_games,
        total_hours: round2(total_hours),
        average_hours: round2(total_hours / f64::from(total_games)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// SQLite-backed library store
pub struct SqliteLibrary {
    conn: Connection,
}

impl SqliteLibrary {
    /// Open (creating if necessary) a library database at `path`
    ///
    /// # Errors
    /// Returns `GameledgerError::Database` if the database cannot be opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open an in-memory library, useful in tests
    ///
    /// # Errors
    /// Returns `GameledgerError::Database` if the database cannot be created
    pub fn in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    /// Open the library the configuration points at
    ///
    /// # Errors
    /// Returns `GameledgerError::Database` if the database cannot be opened
    pub fn with_config(config: &GameledgerConfig) -> Result<Self> {
        Self::new(config.effective_database_path())
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS library_entries (
                app_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                hours_played REAL NOT NULL DEFAULT 0,
                purchase_cost REAL,
                purchase_date TEXT,
                acquisition_method TEXT,
                kind TEXT NOT NULL DEFAULT 'game',
                parent_id TEXT REFERENCES library_entries(app_id)
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Aggregate stats over the stored base-game entries
    ///
    /// # Errors
    /// Returns `GameledgerError::Database` on query failure
    pub fn stats(&self) -> Result<LibraryStats> {
        let entries = self.list_entries()?;
        Ok(library_stats(&entries))
    }

    fn map_entry_row(row: &rusqlite::Row) -> rusqlite::Result<LibraryEntry> {
        let id: String = row.get("app_id")?;
        let parent: Option<String> = row.get("parent_id")?;
        let kind: String = row.get("kind")?;

        Ok(LibraryEntry {
            id: AppId::new(id).map_err(to_sql_error)?,
            name: row.get("name")?,
            hours_played: row.get("hours_played")?,
            purchase_cost: row.get("purchase_cost")?,
            purchase_date: row.get("purchase_date")?,
            acquisition_method: row.get("acquisition_method")?,
            kind: EntryKind::from_db(&kind),
            parent_id: parent
                .map(|p| AppId::new(p).map_err(to_sql_error))
                .transpose()?,
        })
    }
}

fn to_sql_error(err: GameledgerError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

impl LibraryStore for SqliteLibrary {
    fn list_entries(&self) -> Result<Vec<LibraryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT app_id, name, hours_played, purchase_cost, purchase_date,
                    acquisition_method, kind, parent_id
             FROM library_entries
             ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt.query_map([], Self::map_entry_row)?;
        let entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn get_entry(&self, id: &AppId) -> Result<Option<LibraryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT app_id, name, hours_played, purchase_cost, purchase_date,
                    acquisition_method, kind, parent_id
             FROM library_entries
             WHERE app_id = ?1",
        )?;
        let mut rows = stmt.query_map([id.as_str()], Self::map_entry_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    fn upsert_entry(&mut self, entry: &LibraryEntry) -> Result<()> {
        debug!(id = %entry.id, name = %entry.name, "upserting library entry");
        self.conn.execute(
            "INSERT INTO library_entries
                 (app_id, name, hours_played, purchase_cost, purchase_date,
                  acquisition_method, kind, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(app_id) DO UPDATE SET
                 name = excluded.name,
                 hours_played = excluded.hours_played,
                 purchase_cost = excluded.purchase_cost,
                 purchase_date = excluded.purchase_date,
                 acquisition_method = excluded.acquisition_method,
                 kind = excluded.kind,
                 parent_id = excluded.parent_id",
            rusqlite::params![
                entry.id.as_str(),
                entry.name,
                entry.hours_played,
                entry.purchase_cost,
                entry.purchase_date,
                entry.acquisition_method,
                entry.kind.as_str(),
                entry.parent_id.as_ref().map(AppId::as_str),
            ],
        )?;
        Ok(())
    }

    fn set_parent(&mut self, child: &AppId, parent: &AppId) -> Result<()> {
        if self.get_entry(parent)?.is_none() {
            return Err(GameledgerError::EntryNotFound {
                id: parent.to_string(),
            });
        }
        let updated = self.conn.execute(
            "UPDATE library_entries SET parent_id = ?1 WHERE app_id = ?2",
            rusqlite::params![parent.as_str(), child.as_str()],
        )?;
        if updated == 0 {
            return Err(GameledgerError::EntryNotFound {
                id: child.to_string(),
            });
        }
        Ok(())
    }
}
