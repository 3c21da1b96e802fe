//! Error types for the Gameledger Core library

use thiserror::Error;

/// Result type alias for Gameledger operations
pub type Result<T> = std::result::Result<T, GameledgerError>;

/// Main error type for Gameledger operations
#[derive(Error, Debug)]
pub enum GameledgerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid app id: {value}")]
    InvalidAppId { value: String },

    #[error("Library entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("Price lookup failed for {id}: {reason}")]
    PriceLookup { id: String, reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl GameledgerError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a price lookup error
    pub fn price_lookup(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PriceLookup {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
