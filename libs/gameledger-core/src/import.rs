//! Purchase-history import: CSV parsing and the sequential import session
//!
//! An export groups bundles as one main row (date + aggregate cost) followed
//! by continuation rows carrying only a title. Parsing reassembles those
//! groups into `PurchaseRecord`s; `ImportSession` then walks the records one
//! at a time, resolving every title and writing results into the library.
//! Each purchase runs to completion, prompts included, before the next
//! starts, and cancelling only ever abandons the purchase at hand.

use crate::error::Result;
use crate::library::LibraryStore;
use crate::models::{AppId, EntryKind, LibraryEntry, PurchaseRecord, ResolutionOutcome};
use crate::pricing::{bundle_prices, PriceSource};
use crate::prompt::{IdReply, Prompt};
use crate::resolver::MatchResolver;
use crate::splitter::{
    check_manual_split, equal_split, weighted_split, BundleOutcome, CostShare, SplitCheck,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rows naming this pseudo-title are wallet transactions, not games
const MARKET_ROW: &str = "Steam Community Market";

const DEFAULT_METHOD: &str = "Steam";

/// Extract a numeric cost from strings like `"$39.94"` or `"($1.11)"`;
/// parenthesized values are negative, unparseable ones are zero.
#[must_use]
pub fn parse_cost(cost_str: &str) -> f64 {
    let clean: String = cost_str
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '(' | ')'))
        .collect();

    let negative = clean.contains('(') && clean.contains(')');
    let clean = clean.replace(['(', ')'], "");

    match clean.parse::<f64>() {
        Ok(value) => {
            if negative {
                -value
            } else {
                value
            }
        }
        Err(_) => 0.0,
    }
}

/// Check whether `text` is a date in one of the export's shapes
/// (`7-Dec-24`, `7/12/24`, `2024-12-07`).
#[must_use]
pub fn looks_like_date(text: &str) -> bool {
    const FORMATS: [&str; 5] = ["%d-%b-%y", "%d-%b-%Y", "%d/%m/%y", "%d/%m/%Y", "%Y-%m-%d"];
    let text = text.trim();
    FORMATS
        .iter()
        .any(|format| chrono::NaiveDate::parse_from_str(text, format).is_ok())
}

/// Parse a purchase-history export file.
///
/// # Errors
/// Returns `GameledgerError::Io` if the file cannot be read or
/// `GameledgerError::Csv` on malformed rows
pub fn parse_purchases<P: AsRef<Path>>(path: P) -> Result<Vec<PurchaseRecord>> {
    let contents = std::fs::read_to_string(path)?;
    parse_purchases_from_str(&contents)
}

/// Parse purchase-history CSV content.
///
/// The delimiter (tab or comma) is sniffed from the first lines. The header
/// row is skipped; blank-name and wallet-market rows are dropped. A row with
/// a date and a positive cost opens a purchase; a row with neither joins the
/// open purchase as a bundle title.
///
/// # Errors
/// Returns `GameledgerError::Csv` on malformed rows
pub fn parse_purchases_from_str(contents: &str) -> Result<Vec<PurchaseRecord>> {
    let delimiter = detect_delimiter(contents);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut purchases = Vec::new();
    let mut current: Option<PurchaseRecord> = None;

    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }

        let date = record.get(0).unwrap_or("").trim();
        let name = record.get(1).unwrap_or("").trim();
        let method = record.get(2).unwrap_or("").trim();
        let cost_str = record.get(3).unwrap_or("");

        if name.is_empty() || name == MARKET_ROW {
            continue;
        }

        let cost = parse_cost(cost_str);
        if !date.is_empty() && cost > 0.0 {
            if !looks_like_date(date) {
                warn!(date, "unrecognized purchase date format");
            }
            if let Some(done) = current.take() {
                purchases.push(done);
            }
            current = Some(PurchaseRecord {
                date: date.to_string(),
                titles: vec![name.to_string()],
                cost,
                method: if method.is_empty() {
                    DEFAULT_METHOD.to_string()
                } else {
                    method.to_string()
                },
            });
        } else if date.is_empty() && cost <= 0.0 {
            // Continuation row: another title of the open bundle.
            if let Some(open) = current.as_mut() {
                open.titles.push(name.to_string());
            }
        }
    }

    if let Some(done) = current.take() {
        purchases.push(done);
    }

    info!(purchases = purchases.len(), "parsed purchase history");
    Ok(purchases)
}

fn detect_delimiter(contents: &str) -> u8 {
    let mut tabs = 0;
    let mut commas = 0;
    for line in contents.lines().take(3) {
        tabs += line.matches('\t').count();
        commas += line.matches(',').count();
    }
    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

/// Decides the kind of a newly created entry from its title.
///
/// Fixed at session construction; the default treats everything as a base
/// game.
pub trait KindClassifier {
    fn classify(&self, name: &str) -> EntryKind;
}

/// No-op classifier: every new entry is a base game
#[derive(Debug, Default)]
pub struct GameKind;

impl KindClassifier for GameKind {
    fn classify(&self, _name: &str) -> EntryKind {
        EntryKind::Game
    }
}

/// Counters and per-title outcomes for one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub processed: u32,
    pub added: u32,
    pub updated: u32,
    pub skipped: u32,
    /// What happened to each title, in processing order
    pub outcomes: Vec<(String, ResolutionOutcome)>,
}

enum Applied {
    Added,
    Updated,
}

/// Sequential driver for one import batch
pub struct ImportSession<'a> {
    library: &'a mut dyn LibraryStore,
    prices: &'a dyn PriceSource,
    prompt: &'a dyn Prompt,
    resolver: MatchResolver,
    classifier: Box<dyn KindClassifier>,
}

impl<'a> ImportSession<'a> {
    pub fn new(
        library: &'a mut dyn LibraryStore,
        prices: &'a dyn PriceSource,
        prompt: &'a dyn Prompt,
    ) -> Self {
        Self {
            library,
            prices,
            prompt,
            resolver: MatchResolver::default(),
            classifier: Box::new(GameKind),
        }
    }

    /// Replace the resolver (and with it the match policy and cache)
    #[must_use]
    pub fn with_resolver(mut self, resolver: MatchResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the entry-kind classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn KindClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Process every purchase in order.
    ///
    /// # Errors
    /// Propagates store failures; prompt cancellations are not errors
    pub fn run(&mut self, purchases: &[PurchaseRecord]) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for purchase in purchases {
            if purchase.is_bundle() {
                let outcome = self.process_bundle(purchase, &mut summary)?;
                debug!(titles = purchase.titles.len(), ?outcome, "bundle handled");
            } else {
                self.process_single(purchase, &mut summary)?;
            }
        }

        info!(
            processed = summary.processed,
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            "import finished"
        );
        Ok(summary)
    }

    fn process_single(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let title = &purchase.titles[0];
        summary.processed += 1;

        let candidates = self.library.candidates()?;
        if let Some(id) = self.resolver.resolve(title, &candidates, self.prompt) {
            let applied = self.apply_cost(&id, title, purchase.cost, purchase)?;
            record_applied(summary, title, &id, applied);
            return Ok(());
        }

        // Unknown title: it may be an add-on whose cost belongs to a base
        // game already in the library.
        let question = format!(
            "'{title}' is not in the library. Flag it as a DLC and add its cost to a base game?"
        );
        if self.prompt.confirm(&question) {
            match self.attach_dlc(title, purchase.cost, purchase)? {
                Some(base_id) => {
                    summary.added += 1;
                    summary.outcomes.push((
                        title.clone(),
                        ResolutionOutcome::Allocated(base_id, purchase.cost),
                    ));
                }
                None => {
                    summary.skipped += 1;
                    summary
                        .outcomes
                        .push((title.clone(), ResolutionOutcome::Cancelled));
                }
            }
            return Ok(());
        }

        self.manual_id_entry(title, purchase.cost, purchase, summary)
    }

    /// Resolve-or-create for one title carrying its share of a bundle's
    /// cost. No DLC question here.
    fn place_title(
        &mut self,
        title: &str,
        cost: f64,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        summary.processed += 1;

        let candidates = self.library.candidates()?;
        if let Some(id) = self.resolver.resolve(title, &candidates, self.prompt) {
            let applied = self.apply_cost(&id, title, cost, purchase)?;
            record_allocated(summary, title, &id, cost, applied);
            return Ok(());
        }

        self.manual_id_entry(title, cost, purchase, summary)
    }

    fn manual_id_entry(
        &mut self,
        title: &str,
        cost: f64,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let prompt_text = format!(
            "Game not found in library: '{title}'. Enter the app id \
             (comma-separated for multiple games/DLCs)"
        );
        match self.prompt.input_app_ids(&prompt_text) {
            IdReply::Ids(ids) if !ids.is_empty() => {
                // Several ids split the cost evenly across the new entries.
                let share = cost / ids.len() as f64;
                for id in &ids {
                    let applied = self.apply_cost(id, title, share, purchase)?;
                    match applied {
                        Applied::Added => {
                            summary.added += 1;
                            summary
                                .outcomes
                                .push((title.to_string(), ResolutionOutcome::Created(id.clone())));
                        }
                        Applied::Updated => {
                            summary.updated += 1;
                            summary
                                .outcomes
                                .push((title.to_string(), ResolutionOutcome::Matched(id.clone())));
                        }
                    }
                }
            }
            IdReply::Ids(_) | IdReply::Skip => {
                debug!(title, "title skipped");
                summary.skipped += 1;
                summary
                    .outcomes
                    .push((title.to_string(), ResolutionOutcome::Skipped));
            }
            IdReply::Cancelled => {
                debug!(title, "title cancelled");
                summary.skipped += 1;
                summary
                    .outcomes
                    .push((title.to_string(), ResolutionOutcome::Cancelled));
            }
        }
        Ok(())
    }

    fn apply_cost(
        &mut self,
        id: &AppId,
        name: &str,
        cost: f64,
        purchase: &PurchaseRecord,
    ) -> Result<Applied> {
        match self.library.get_entry(id)? {
            Some(mut entry) => {
                entry.purchase_cost = Some(cost);
                entry.purchase_date = Some(purchase.date.clone());
                entry.acquisition_method = Some(purchase.method.clone());
                self.library.upsert_entry(&entry)?;
                Ok(Applied::Updated)
            }
            None => {
                let entry = LibraryEntry {
                    purchase_cost: Some(cost),
                    purchase_date: Some(purchase.date.clone()),
                    acquisition_method: Some(purchase.method.clone()),
                    kind: self.classifier.classify(name),
                    ..LibraryEntry::new(id.clone(), name)
                };
                self.library.upsert_entry(&entry)?;
                Ok(Applied::Added)
            }
        }
    }

    /// Merge an add-on's cost into a user-chosen base game and record the
    /// add-on as a child entry. Returns the base game's id, or `None` when
    /// the user backs out.
    fn attach_dlc(
        &mut self,
        title: &str,
        cost: f64,
        purchase: &PurchaseRecord,
    ) -> Result<Option<AppId>> {
        let entries = self.library.list_entries()?;
        let bases: Vec<&LibraryEntry> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Game)
            .collect();
        let names: Vec<String> = bases.iter().map(|entry| entry.name.clone()).collect();

        let Some(index) = self
            .prompt
            .choose_one(&format!("Select the base game for DLC '{title}'"), &names)
        else {
            return Ok(None);
        };
        let Some(base) = bases.get(index) else {
            return Ok(None);
        };
        let mut base = (*base).clone();

        let child_id = match self
            .prompt
            .input_app_ids(&format!("Enter the app id for DLC '{title}'"))
        {
            IdReply::Ids(ids) if !ids.is_empty() => Some(ids[0].clone()),
            IdReply::Ids(_) | IdReply::Skip => None,
            IdReply::Cancelled => return Ok(None),
        };

        base.purchase_cost = Some(base.purchase_cost.unwrap_or(0.0) + cost);
        self.library.upsert_entry(&base)?;
        info!(dlc = title, base = %base.name, cost, "merged DLC cost into base game");

        if let Some(child_id) = child_id {
            let child = LibraryEntry {
                purchase_cost: Some(cost),
                purchase_date: Some(purchase.date.clone()),
                acquisition_method: Some(purchase.method.clone()),
                kind: EntryKind::Dlc,
                ..LibraryEntry::new(child_id.clone(), title)
            };
            self.library.upsert_entry(&child)?;
            self.library.set_parent(&child_id, &base.id)?;
        } else {
            warn!(dlc = title, "no app id for DLC; cost merged without a child entry");
        }
        Ok(Some(base.id))
    }

    fn process_bundle(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<BundleOutcome> {
        let titles = &purchase.titles;
        let options = vec![
            "Enter individual prices".to_string(),
            "Weight by current store price".to_string(),
            "Base game + DLC (combine cost)".to_string(),
        ];
        let question = format!(
            "Bundle of {} titles for {:.2} total. How should the cost be split?",
            titles.len(),
            purchase.cost
        );

        match self.prompt.choose_one(&question, &options) {
            Some(0) => self.bundle_manual(purchase, summary),
            Some(1) => self.bundle_weighted(purchase, summary),
            Some(2) => self.bundle_base_plus_addons(purchase, summary),
            _ => {
                self.skip_bundle(titles, summary);
                Ok(BundleOutcome::Cancelled)
            }
        }
    }

    fn bundle_manual(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<BundleOutcome> {
        let mut shares = Vec::new();
        for title in &purchase.titles {
            let Some(text) = self.prompt.input_text(&format!("Price paid for '{title}'")) else {
                self.skip_bundle(&purchase.titles, summary);
                return Ok(BundleOutcome::Cancelled);
            };
            shares.push(CostShare {
                title: title.clone(),
                amount: parse_cost(&text),
            });
        }

        match check_manual_split(&shares, purchase.cost) {
            Ok(SplitCheck::Balanced) => {}
            Ok(SplitCheck::Mismatch {
                entered,
                difference,
            }) => {
                let question = format!(
                    "Entered prices total {entered:.2} but the bundle cost {:.2} \
                     (difference {difference:+.2}). Proceed anyway?",
                    purchase.cost
                );
                if !self.prompt.confirm(&question) {
                    self.skip_bundle(&purchase.titles, summary);
                    return Ok(BundleOutcome::Cancelled);
                }
            }
            Err(error) => {
                warn!(%error, "rejecting manual split");
                self.skip_bundle(&purchase.titles, summary);
                return Ok(BundleOutcome::Cancelled);
            }
        }

        for share in shares {
            self.place_title(&share.title, share.amount, purchase, summary)?;
        }
        Ok(BundleOutcome::Manual)
    }

    fn bundle_weighted(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<BundleOutcome> {
        // Every title needs an id before any price is fetched; one refusal
        // abandons the whole weighted attempt.
        let mut resolved: Vec<(String, AppId)> = Vec::new();
        let mut abandoned = false;

        for title in &purchase.titles {
            let candidates = self.library.candidates()?;
            let id = match self.resolver.resolve(title, &candidates, self.prompt) {
                Some(id) => Some(id),
                None => {
                    let prompt_text = format!(
                        "Game not found in library: '{title}'. Enter its app id for weighted pricing"
                    );
                    match self.prompt.input_app_ids(&prompt_text) {
                        IdReply::Ids(ids) if !ids.is_empty() => {
                            if ids.len() > 1 {
                                warn!(%title, "multiple app ids entered; using the first for weighting");
                            }
                            Some(ids[0].clone())
                        }
                        _ => None,
                    }
                }
            };
            match id {
                Some(id) => resolved.push((title.clone(), id)),
                None => {
                    abandoned = true;
                    break;
                }
            }
        }

        if !abandoned {
            let ids: Vec<AppId> = resolved.iter().map(|(_, id)| id.clone()).collect();
            match bundle_prices(self.prices, &ids) {
                Ok((prices, total_value)) if total_value > 0.0 => {
                    let priced: Vec<(String, f64)> = resolved
                        .iter()
                        .map(|(title, id)| (title.clone(), prices[id]))
                        .collect();
                    let shares = match weighted_split(&priced, purchase.cost) {
                        Ok(shares) => shares,
                        Err(error) => {
                            warn!(%error, "weighted split failed");
                            return self.equal_fallback(purchase, summary);
                        }
                    };
                    for (share, (_, id)) in shares.iter().zip(&resolved) {
                        summary.processed += 1;
                        let applied =
                            self.apply_cost(id, &share.title, share.amount, purchase)?;
                        record_allocated(summary, &share.title, id, share.amount, applied);
                    }
                    return Ok(BundleOutcome::Weighted);
                }
                Ok(_) => warn!("store prices sum to zero; weighted split inapplicable"),
                Err(error) => warn!(%error, "price lookup failed"),
            }
        }

        self.equal_fallback(purchase, summary)
    }

    fn equal_fallback(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<BundleOutcome> {
        let question = "Could not fetch store prices for this bundle. \
                        Fall back to an equal split?";
        if !self.prompt.confirm(question) {
            self.skip_bundle(&purchase.titles, summary);
            return Ok(BundleOutcome::Cancelled);
        }

        for share in equal_split(&purchase.titles, purchase.cost) {
            self.place_title(&share.title, share.amount, purchase, summary)?;
        }
        Ok(BundleOutcome::Equal)
    }

    fn bundle_base_plus_addons(
        &mut self,
        purchase: &PurchaseRecord,
        summary: &mut ImportSummary,
    ) -> Result<BundleOutcome> {
        let titles = &purchase.titles;
        let Some(base_index) = self
            .prompt
            .choose_one("Select the base game for this bundle", titles)
        else {
            self.skip_bundle(titles, summary);
            return Ok(BundleOutcome::Cancelled);
        };
        let base_title = &titles[base_index];

        let candidates = self.library.candidates()?;
        let Some(base_id) = self.resolver.resolve(base_title, &candidates, self.prompt) else {
            warn!(%base_title, "base game not found in library");
            self.skip_bundle(titles, summary);
            return Ok(BundleOutcome::Cancelled);
        };
        let Some(mut base) = self.library.get_entry(&base_id)? else {
            self.skip_bundle(titles, summary);
            return Ok(BundleOutcome::Cancelled);
        };

        // Collect add-on ids before touching the store so a cancellation
        // leaves nothing half-applied.
        let mut addons: Vec<(String, Option<AppId>)> = Vec::new();
        for (index, title) in titles.iter().enumerate() {
            if index == base_index {
                continue;
            }
            let prompt_text =
                format!("Enter the app id for '{title}' (add-on of '{base_title}')");
            match self.prompt.input_app_ids(&prompt_text) {
                IdReply::Ids(ids) if !ids.is_empty() => {
                    addons.push((title.clone(), Some(ids[0].clone())));
                }
                IdReply::Ids(_) | IdReply::Skip => addons.push((title.clone(), None)),
                IdReply::Cancelled => {
                    self.skip_bundle(titles, summary);
                    return Ok(BundleOutcome::Cancelled);
                }
            }
        }

        base.purchase_cost = Some(base.purchase_cost.unwrap_or(0.0) + purchase.cost);
        self.library.upsert_entry(&base)?;
        summary.processed += 1;
        summary.updated += 1;
        summary.outcomes.push((
            base_title.clone(),
            ResolutionOutcome::Allocated(base_id.clone(), purchase.cost),
        ));
        info!(base = %base.name, cost = purchase.cost, "attributed bundle cost to base game");

        for (title, id) in addons {
            summary.processed += 1;
            match id {
                Some(id) => {
                    let child = LibraryEntry {
                        purchase_cost: Some(0.0),
                        purchase_date: Some(purchase.date.clone()),
                        acquisition_method: Some(purchase.method.clone()),
                        kind: EntryKind::Dlc,
                        ..LibraryEntry::new(id.clone(), title.as_str())
                    };
                    self.library.upsert_entry(&child)?;
                    self.library.set_parent(&id, &base_id)?;
                    summary.added += 1;
                    summary
                        .outcomes
                        .push((title, ResolutionOutcome::Created(id)));
                }
                None => {
                    summary.skipped += 1;
                    summary.outcomes.push((title, ResolutionOutcome::Skipped));
                }
            }
        }

        Ok(BundleOutcome::BaseGamePlusAddons)
    }

    fn skip_bundle(&self, titles: &[String], summary: &mut ImportSummary) {
        summary.processed += titles.len() as u32;
        summary.skipped += titles.len() as u32;
        for title in titles {
            summary
                .outcomes
                .push((title.clone(), ResolutionOutcome::Cancelled));
        }
    }
}

fn record_applied(summary: &mut ImportSummary, title: &str, id: &AppId, applied: Applied) {
    match applied {
        Applied::Added => {
            summary.added += 1;
            summary
                .outcomes
                .push((title.to_string(), ResolutionOutcome::Created(id.clone())));
        }
        Applied::Updated => {
            summary.updated += 1;
            summary
                .outcomes
                .push((title.to_string(), ResolutionOutcome::Matched(id.clone())));
        }
    }
}

fn record_allocated(
    summary: &mut ImportSummary,
    title: &str,
    id: &AppId,
    amount: f64,
    applied: Applied,
) {
    match applied {
        Applied::Added => summary.added += 1,
        Applied::Updated => summary.updated += 1,
    }
    summary.outcomes.push((
        title.to_string(),
        ResolutionOutcome::Allocated(id.clone(), amount),
    ));
}
