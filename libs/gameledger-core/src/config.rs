//! Configuration management for the library database and Steam credentials

use crate::error::Result;
use crate::resolver::MatchPolicy;
use std::path::{Path, PathBuf};

/// Configuration for library access, sync credentials, and match thresholds
#[derive(Debug, Clone)]
pub struct GameledgerConfig {
    /// Path to the library database
    pub database_path: PathBuf,
    /// Whether to use the default database path if the specified path doesn't exist
    pub fallback_to_default: bool,
    /// Steam Web API key for playtime sync
    pub steam_api_key: Option<String>,
    /// Steam account id for playtime sync
    pub steam_id: Option<String>,
    /// Resolver thresholds
    pub policy: MatchPolicy,
}

impl GameledgerConfig {
    /// Create a new configuration with a custom database path
    ///
    /// # Arguments
    /// * `database_path` - Path to the library database
    /// * `fallback_to_default` - Whether to fall back to the default path if the specified path doesn't exist
    #[must_use]
    pub fn new<P: AsRef<Path>>(database_path: P, fallback_to_default: bool) -> Self {
        Self {
            database_path: database_path.as_ref().to_path_buf(),
            fallback_to_default,
            steam_api_key: None,
            steam_id: None,
            policy: MatchPolicy::default(),
        }
    }

    /// Create a configuration with the default database path
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(Self::default_database_path(), false)
    }

    /// Get the default library database path
    #[must_use]
    pub fn default_database_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
        PathBuf::from(format!("{home}/.gameledger/library.sqlite"))
    }

    /// Get the effective database path, falling back to the default if the
    /// configured path doesn't exist yet.
    ///
    /// A path that exists nowhere is returned as-is; opening it creates a
    /// fresh library.
    #[must_use]
    pub fn effective_database_path(&self) -> PathBuf {
        if self.database_path.exists() {
            return self.database_path.clone();
        }
        if self.fallback_to_default {
            let default_path = Self::default_database_path();
            if default_path.exists() {
                return default_path;
            }
        }
        self.database_path.clone()
    }

    /// Create configuration from environment variables
    ///
    /// Reads `GAMELEDGER_DB_PATH`, `GAMELEDGER_FALLBACK_TO_DEFAULT`,
    /// `STEAM_API_KEY`, and `STEAM_ID`.
    #[must_use]
    pub fn from_env() -> Self {
        let database_path = std::env::var("GAMELEDGER_DB_PATH")
            .map_or_else(|_| Self::default_database_path(), PathBuf::from);

        let fallback_to_default = std::env::var("GAMELEDGER_FALLBACK_TO_DEFAULT")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(true);

        Self {
            steam_api_key: std::env::var("STEAM_API_KEY").ok(),
            steam_id: std::env::var("STEAM_ID").ok(),
            ..Self::new(database_path, fallback_to_default)
        }
    }

    /// Create configuration for testing with a temporary database
    ///
    /// # Errors
    /// Returns `GameledgerError::Io` if the temporary file cannot be created
    pub fn for_testing() -> Result<Self> {
        use tempfile::NamedTempFile;
        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file.path().to_path_buf();
        Ok(Self::new(db_path, false))
    }

    /// Steam credentials for playtime sync
    ///
    /// # Errors
    /// Returns a configuration error if either credential is missing
    pub fn steam_credentials(&self) -> Result<(&str, &str)> {
        let key = self.steam_api_key.as_deref().ok_or_else(|| {
            crate::error::GameledgerError::configuration("STEAM_API_KEY is not set")
        })?;
        let id = self
            .steam_id
            .as_deref()
            .ok_or_else(|| crate::error::GameledgerError::configuration("STEAM_ID is not set"))?;
        Ok((key, id))
    }
}

impl Default for GameledgerConfig {
    fn default() -> Self {
        Self::with_default_path()
    }
}
