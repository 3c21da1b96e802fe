//! Test utilities: in-memory collaborators for exercising the core without
//! a database, a network, or a human

use crate::error::{GameledgerError, Result};
use crate::models::{AppId, Candidate, LibraryEntry};
use crate::library::LibraryStore;
use crate::pricing::PriceSource;
use crate::prompt::{IdReply, Prompt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// In-memory library store
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    entries: Vec<LibraryEntry>,
}

impl MemoryLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from (id, name) pairs
    ///
    /// # Panics
    /// Panics if an id is not all digits
    #[must_use]
    pub fn with_games(games: &[(&str, &str)]) -> Self {
        let entries = games
            .iter()
            .map(|(id, name)| LibraryEntry::new(AppId::new(*id).unwrap(), *name))
            .collect();
        Self { entries }
    }
}

impl LibraryStore for MemoryLibrary {
    fn list_entries(&self) -> Result<Vec<LibraryEntry>> {
        Ok(self.entries.clone())
    }

    fn get_entry(&self, id: &AppId) -> Result<Option<LibraryEntry>> {
        Ok(self.entries.iter().find(|e| &e.id == id).cloned())
    }

    fn upsert_entry(&mut self, entry: &LibraryEntry) -> Result<()> {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => self.entries.push(entry.clone()),
        }
        Ok(())
    }

    fn set_parent(&mut self, child: &AppId, parent: &AppId) -> Result<()> {
        if !self.entries.iter().any(|e| &e.id == parent) {
            return Err(GameledgerError::EntryNotFound {
                id: parent.to_string(),
            });
        }
        let child_entry = self
            .entries
            .iter_mut()
            .find(|e| &e.id == child)
            .ok_or_else(|| GameledgerError::EntryNotFound {
                id: child.to_string(),
            })?;
        child_entry.parent_id = Some(parent.clone());
        Ok(())
    }
}

/// A small library covering the awkward matching cases
#[must_use]
pub fn sample_library() -> MemoryLibrary {
    MemoryLibrary::with_games(&[
        ("2620", "Call of Duty"),
        ("2630", "Call of Duty 2"),
        ("2640", "Call of Duty 3"),
        ("271590", "Grand Theft Auto V"),
        ("292030", "The Witcher 3"),
        ("72850", "The Elder Scrolls V: Skyrim"),
        ("620", "Portal 2"),
    ])
}

/// Candidates for `sample_library`
///
/// # Panics
/// Never; the sample store is infallible
#[must_use]
pub fn sample_candidates() -> Vec<Candidate> {
    sample_library().candidates().unwrap()
}

/// Calls observed by a `ScriptedPrompt`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptCounts {
    pub confirms: u32,
    pub choices: u32,
    pub texts: u32,
    pub id_requests: u32,
}

/// Prompt implementation answering from pre-scripted queues.
///
/// An empty queue answers conservatively: "no", cancelled, and skip.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    confirms: Mutex<VecDeque<bool>>,
    choices: Mutex<VecDeque<Option<usize>>>,
    texts: Mutex<VecDeque<Option<String>>>,
    id_replies: Mutex<VecDeque<IdReply>>,
    counts: Mutex<PromptCounts>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_confirm(&self, answer: bool) {
        self.confirms.lock().push_back(answer);
    }

    pub fn push_choice(&self, answer: Option<usize>) {
        self.choices.lock().push_back(answer);
    }

    pub fn push_text(&self, answer: Option<&str>) {
        self.texts.lock().push_back(answer.map(str::to_string));
    }

    pub fn push_ids(&self, reply: IdReply) {
        self.id_replies.lock().push_back(reply);
    }

    #[must_use]
    pub fn counts(&self) -> PromptCounts {
        *self.counts.lock()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, _question: &str) -> bool {
        self.counts.lock().confirms += 1;
        self.confirms.lock().pop_front().unwrap_or(false)
    }

    fn choose_one(&self, _prompt: &str, options: &[String]) -> Option<usize> {
        self.counts.lock().choices += 1;
        self.choices
            .lock()
            .pop_front()
            .flatten()
            .filter(|idx| *idx < options.len())
    }

    fn input_text(&self, _prompt: &str) -> Option<String> {
        self.counts.lock().texts += 1;
        self.texts.lock().pop_front().flatten()
    }

    fn input_app_ids(&self, _prompt: &str) -> IdReply {
        self.counts.lock().id_requests += 1;
        self.id_replies.lock().pop_front().unwrap_or(IdReply::Skip)
    }
}

/// Price source backed by a fixed map; unknown ids fail the lookup
#[derive(Debug, Default)]
pub struct FixedPrices {
    prices: HashMap<AppId, f64>,
}

impl FixedPrices {
    /// Build from (id, price) pairs
    ///
    /// # Panics
    /// Panics if an id is not all digits
    #[must_use]
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(id, price)| (AppId::new(*id).unwrap(), *price))
                .collect(),
        }
    }
}

impl PriceSource for FixedPrices {
    fn price_of(&self, id: &AppId) -> Result<f64> {
        self.prices
            .get(id)
            .copied()
            .ok_or_else(|| GameledgerError::price_lookup(id.as_str(), "no fixed price"))
    }
}

/// Price source that always fails
#[derive(Debug, Default)]
pub struct FailingPrices;

impl PriceSource for FailingPrices {
    fn price_of(&self, id: &AppId) -> Result<f64> {
        Err(GameledgerError::price_lookup(id.as_str(), "lookup disabled"))
    }
}
