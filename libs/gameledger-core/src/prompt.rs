//! User interaction capabilities consumed during resolution and import
//!
//! The core never talks to a concrete UI; anything that can answer these
//! four questions can drive an import. Blocking is expected, since a human
//! may take arbitrarily long.

use crate::models::AppId;

/// Reply to an app-id request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdReply {
    /// One or more ids were entered
    Ids(Vec<AppId>),
    /// The user chose to skip this title
    Skip,
    /// The user cancelled the current operation
    Cancelled,
}

/// Capability set for asking the user questions
pub trait Prompt {
    /// Ask a yes/no question
    fn confirm(&self, question: &str) -> bool;

    /// Ask the user to pick one of `options`; `None` means cancelled
    fn choose_one(&self, prompt: &str, options: &[String]) -> Option<usize>;

    /// Ask for free text; `None` means cancelled
    fn input_text(&self, prompt: &str) -> Option<String>;

    /// Ask for one or more app ids (comma-separated entry supported)
    fn input_app_ids(&self, prompt: &str) -> IdReply;
}

/// Parse comma-separated app ids, dropping any token that is not all digits.
#[must_use]
pub fn parse_app_ids(text: &str) -> Vec<AppId> {
    text.split(',')
        .filter_map(|token| AppId::new(token.trim()).ok())
        .collect()
}
