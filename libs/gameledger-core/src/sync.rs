//! Playtime sync from the Steam owned-games endpoint

use crate::error::{GameledgerError, Result};
use crate::library::LibraryStore;
use crate::models::{AppId, LibraryEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const OWNED_GAMES_ENDPOINT: &str =
    "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";

/// One owned game as reported by the Steam Web API
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Total playtime in minutes
    #[serde(default)]
    pub playtime_forever: u64,
}

#[derive(Debug, Deserialize)]
struct OwnedGamesEnvelope {
    response: OwnedGamesPayload,
}

#[derive(Debug, Default, Deserialize)]
struct OwnedGamesPayload {
    #[serde(default)]
    games: Vec<OwnedGame>,
}

/// Result counts of one playtime sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub fetched: u32,
    pub updated: u32,
    pub created: u32,
}

/// Owned-games client (blocking)
pub struct SteamSyncClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl SteamSyncClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(OWNED_GAMES_ENDPOINT)
    }

    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Fetch the account's owned games with playtime
    ///
    /// # Errors
    /// Returns `GameledgerError::Http` on transport failure or a
    /// configuration error on a non-success status
    pub fn fetch_owned_games(&self, api_key: &str, steam_id: &str) -> Result<Vec<OwnedGame>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key),
                ("steamid", steam_id),
                ("include_appinfo", "true"),
                ("format", "json"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GameledgerError::configuration(format!(
                "owned-games request failed with HTTP status {status}"
            )));
        }

        let envelope: OwnedGamesEnvelope = response.json()?;
        info!(count = envelope.response.games.len(), "fetched owned games");
        Ok(envelope.response.games)
    }
}

impl Default for SteamSyncClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Write fetched playtime into the library, creating entries for games not
/// seen before.
///
/// # Errors
/// Propagates store failures
pub fn sync_playtime(library: &mut dyn LibraryStore, games: &[OwnedGame]) -> Result<SyncSummary> {
    let mut summary = SyncSummary {
        fetched: games.len() as u32,
        ..SyncSummary::default()
    };

    for game in games {
        let id = AppId::new(game.appid.to_string())?;
        let hours = minutes_to_hours(game.playtime_forever);

        match library.get_entry(&id)? {
            Some(mut entry) => {
                entry.hours_played = hours;
                library.upsert_entry(&entry)?;
                summary.updated += 1;
            }
            None => {
                let name = game
                    .name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string());
                debug!(%id, %name, hours, "creating library entry from sync");
                let entry = LibraryEntry {
                    hours_played: hours,
                    ..LibraryEntry::new(id, name)
                };
                library.upsert_entry(&entry)?;
                summary.created += 1;
            }
        }
    }

    info!(
        fetched = summary.fetched,
        updated = summary.updated,
        created = summary.created,
        "playtime sync complete"
    );
    Ok(summary)
}

fn minutes_to_hours(minutes: u64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}
