//! Data models for library entries and purchase records

use crate::error::{GameledgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier for a library entry (a storefront app id).
///
/// Always a non-empty string of ASCII digits; construction enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Create an app id, rejecting anything that is not all digits
    ///
    /// # Errors
    /// Returns `GameledgerError::InvalidAppId` if the value is empty or
    /// contains a non-digit character
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GameledgerError::InvalidAppId { value });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AppId {
    type Err = GameledgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "game")]
    Game,
    #[serde(rename = "dlc")]
    Dlc,
}

impl EntryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Dlc => "dlc",
        }
    }

    /// Parse a stored kind string, defaulting unknown values to `Game`
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "dlc" => Self::Dlc,
            _ => Self::Game,
        }
    }
}

/// Canonical per-user library entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Unique identifier
    pub id: AppId,
    /// Display name
    pub name: String,
    /// Total playtime in hours
    pub hours_played: f64,
    /// What was paid for this entry, if known
    pub purchase_cost: Option<f64>,
    /// Purchase date as recorded by the source
    pub purchase_date: Option<String>,
    /// How the entry was acquired (storefront, gift, ...)
    pub acquisition_method: Option<String>,
    /// Base game or add-on
    pub kind: EntryKind,
    /// Base game this add-on's cost was merged into; only set for DLC
    pub parent_id: Option<AppId>,
}

impl LibraryEntry {
    /// Create a bare entry with no playtime or purchase data
    #[must_use]
    pub fn new(id: AppId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hours_played: 0.0,
            purchase_cost: None,
            purchase_date: None,
            acquisition_method: None,
            kind: EntryKind::Game,
            parent_id: None,
        }
    }
}

/// One purchase from an import batch; more than one title marks a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Purchase date as it appeared in the source
    pub date: String,
    /// Titles covered by this purchase, in source order (never empty)
    pub titles: Vec<String>,
    /// Aggregate cost of the whole purchase
    pub cost: f64,
    /// Acquisition method recorded against each title
    pub method: String,
}

impl PurchaseRecord {
    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.titles.len() > 1
    }
}

/// Scoring input: a library entry reduced to what the matcher needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: AppId,
    pub name: String,
}

/// A scored candidate produced for one query, discarded after resolution
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub id: AppId,
    pub name: String,
    pub score: f64,
}

/// Per-title result of processing a purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionOutcome {
    /// Resolved to an existing entry and updated in place
    Matched(AppId),
    /// Resolved and given a share of a bundle's aggregate cost
    Allocated(AppId, f64),
    /// A new entry was created for the title
    Created(AppId),
    /// The title was left untouched
    Skipped,
    /// The user cancelled handling of the title
    Cancelled,
}
