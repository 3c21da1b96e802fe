//! End-to-end import session tests over in-memory collaborators

use gameledger_core::import::ImportSession;
use gameledger_core::models::{AppId, EntryKind, PurchaseRecord, ResolutionOutcome};
use gameledger_core::prompt::IdReply;
use gameledger_core::test_utils::{
    FailingPrices, FixedPrices, MemoryLibrary, ScriptedPrompt,
};
use gameledger_core::LibraryStore;

fn single(title: &str, cost: f64) -> PurchaseRecord {
    PurchaseRecord {
        date: "7-Dec-24".to_string(),
        titles: vec![title.to_string()],
        cost,
        method: "Steam".to_string(),
    }
}

fn bundle(titles: &[&str], cost: f64) -> PurchaseRecord {
    PurchaseRecord {
        date: "7-Dec-24".to_string(),
        titles: titles.iter().map(|t| (*t).to_string()).collect(),
        cost,
        method: "Steam".to_string(),
    }
}

fn id(value: &str) -> AppId {
    AppId::new(value).unwrap()
}

#[test]
fn resolved_single_title_updates_entry() {
    let mut library = MemoryLibrary::with_games(&[("292030", "The Witcher 3")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[single("The Witcher 3 - GOTY Edition", 19.99)])
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 0);

    let entry = library.get_entry(&id("292030")).unwrap().unwrap();
    assert_eq!(entry.purchase_cost, Some(19.99));
    assert_eq!(entry.purchase_date.as_deref(), Some("7-Dec-24"));
    assert_eq!(entry.acquisition_method.as_deref(), Some("Steam"));
    // No prompts were needed: the edition suffix strips down to an exact
    // variant match.
    assert_eq!(prompt.counts().confirms, 0);
    assert_eq!(prompt.counts().id_requests, 0);
}

#[test]
fn unknown_title_with_manual_ids_splits_cost() {
    let mut library = MemoryLibrary::with_games(&[("2620", "Call of Duty")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_confirm(false); // not a DLC
    prompt.push_ids(IdReply::Ids(vec![id("271591"), id("271592")]));

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[single("Obscure Indie Anthology", 10.0)])
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.added, 2);

    let first = library.get_entry(&id("271591")).unwrap().unwrap();
    let second = library.get_entry(&id("271592")).unwrap().unwrap();
    assert_eq!(first.purchase_cost, Some(5.0));
    assert_eq!(second.purchase_cost, Some(5.0));
    assert_eq!(first.name, "Obscure Indie Anthology");
}

#[test]
fn unknown_title_skip_and_cancel_touch_nothing() {
    let mut library = MemoryLibrary::with_games(&[("2620", "Call of Duty")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_confirm(false);
    prompt.push_ids(IdReply::Skip);
    prompt.push_confirm(false);
    prompt.push_ids(IdReply::Cancelled);

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[
            single("Mystery Title One", 5.0),
            single("Mystery Title Two", 6.0),
        ])
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.added, 0);
    assert_eq!(library.list_entries().unwrap().len(), 1);
    assert_eq!(
        summary.outcomes,
        vec![
            ("Mystery Title One".to_string(), ResolutionOutcome::Skipped),
            ("Mystery Title Two".to_string(), ResolutionOutcome::Cancelled),
        ]
    );
}

#[test]
fn dlc_attach_merges_cost_into_base() {
    let mut library =
        MemoryLibrary::with_games(&[("100", "Base Game"), ("200", "Other Game")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_confirm(true); // yes, it's a DLC
    prompt.push_choice(Some(0)); // base = "Base Game"
    prompt.push_ids(IdReply::Ids(vec![id("101")]));

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[single("Cosmic Expansion Pack", 7.99)])
        .unwrap();

    assert_eq!(summary.added, 1);

    let base = library.get_entry(&id("100")).unwrap().unwrap();
    assert_eq!(base.purchase_cost, Some(7.99));

    let child = library.get_entry(&id("101")).unwrap().unwrap();
    assert_eq!(child.kind, EntryKind::Dlc);
    assert_eq!(child.parent_id, Some(id("100")));
    assert_eq!(child.purchase_cost, Some(7.99));
    assert_eq!(
        summary.outcomes,
        vec![(
            "Cosmic Expansion Pack".to_string(),
            ResolutionOutcome::Allocated(id("100"), 7.99)
        )]
    );
}

#[test]
fn dlc_attach_backed_out_touches_nothing() {
    let mut library = MemoryLibrary::with_games(&[("100", "Base Game")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_confirm(true);
    prompt.push_choice(None); // back out of base selection

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[single("Cosmic Expansion Pack", 7.99)])
        .unwrap();

    assert_eq!(summary.skipped, 1);
    let base = library.get_entry(&id("100")).unwrap().unwrap();
    assert_eq!(base.purchase_cost, None);
}

#[test]
fn weighted_bundle_allocates_by_store_price() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FixedPrices::new(&[("10", 30.0), ("20", 10.0)]);
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(1)); // weighted

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Alpha Quest", "Beta Quest"], 20.0)])
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.updated, 2);

    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    let beta = library.get_entry(&id("20")).unwrap().unwrap();
    assert!((alpha.purchase_cost.unwrap() - 15.0).abs() < 1e-9);
    assert!((beta.purchase_cost.unwrap() - 5.0).abs() < 1e-9);

    assert!(summary.outcomes.iter().any(|(title, outcome)| {
        title == "Alpha Quest"
            && matches!(outcome, ResolutionOutcome::Allocated(app, amount)
                if *app == id("10") && (amount - 15.0).abs() < 1e-9)
    }));
}

#[test]
fn weighted_bundle_falls_back_to_equal_split() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FailingPrices;
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(1)); // weighted
    prompt.push_confirm(true); // accept equal fallback

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Alpha Quest", "Beta Quest"], 20.0)])
        .unwrap();

    assert_eq!(summary.updated, 2);
    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    let beta = library.get_entry(&id("20")).unwrap().unwrap();
    assert!((alpha.purchase_cost.unwrap() - 10.0).abs() < 1e-9);
    assert!((beta.purchase_cost.unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn weighted_fallback_declined_skips_bundle() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FailingPrices;
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(1));
    prompt.push_confirm(false); // refuse equal fallback

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Alpha Quest", "Beta Quest"], 20.0)])
        .unwrap();

    assert_eq!(summary.skipped, 2);
    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    assert_eq!(alpha.purchase_cost, None);
}

#[test]
fn manual_bundle_applies_entered_prices() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(0)); // manual
    prompt.push_text(Some("$12.00"));
    prompt.push_text(Some("$8.00"));

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Alpha Quest", "Beta Quest"], 20.0)])
        .unwrap();

    assert_eq!(summary.updated, 2);
    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    let beta = library.get_entry(&id("20")).unwrap().unwrap();
    assert!((alpha.purchase_cost.unwrap() - 12.0).abs() < 1e-9);
    assert!((beta.purchase_cost.unwrap() - 8.0).abs() < 1e-9);
    // The totals matched, so no mismatch confirmation was needed.
    assert_eq!(prompt.counts().confirms, 0);
}

#[test]
fn manual_bundle_mismatch_declined_skips() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(0));
    prompt.push_text(Some("15.00"));
    prompt.push_text(Some("8.00")); // totals 23.00 against 20.00
    prompt.push_confirm(false);

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Alpha Quest", "Beta Quest"], 20.0)])
        .unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(prompt.counts().confirms, 1);
    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    assert_eq!(alpha.purchase_cost, None);
}

#[test]
fn base_plus_addons_combines_cost() {
    let mut library = MemoryLibrary::with_games(&[("100", "Base Game")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(2)); // base game + DLC
    prompt.push_choice(Some(0)); // base = first title
    prompt.push_ids(IdReply::Ids(vec![id("101")]));

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Base Game", "Expansion One"], 30.0)])
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.added, 1);

    let base = library.get_entry(&id("100")).unwrap().unwrap();
    assert_eq!(base.purchase_cost, Some(30.0));

    let addon = library.get_entry(&id("101")).unwrap().unwrap();
    assert_eq!(addon.kind, EntryKind::Dlc);
    assert_eq!(addon.purchase_cost, Some(0.0));
    assert_eq!(addon.parent_id, Some(id("100")));
}

#[test]
fn base_plus_addons_cancel_leaves_store_untouched() {
    let mut library = MemoryLibrary::with_games(&[("100", "Base Game")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(Some(2));
    prompt.push_choice(Some(0));
    prompt.push_ids(IdReply::Cancelled); // cancel during add-on id entry

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[bundle(&["Base Game", "Expansion One"], 30.0)])
        .unwrap();

    assert_eq!(summary.skipped, 2);
    let base = library.get_entry(&id("100")).unwrap().unwrap();
    assert_eq!(base.purchase_cost, None);
    assert_eq!(library.list_entries().unwrap().len(), 1);
}

#[test]
fn cancelled_bundle_continues_with_next_purchase() {
    let mut library =
        MemoryLibrary::with_games(&[("10", "Alpha Quest"), ("20", "Beta Quest")]);
    let prices = FixedPrices::default();
    let prompt = ScriptedPrompt::new();
    prompt.push_choice(None); // cancel the bundle outright

    let summary = ImportSession::new(&mut library, &prices, &prompt)
        .run(&[
            bundle(&["Alpha Quest", "Beta Quest"], 20.0),
            single("Alpha Quest", 9.99),
        ])
        .unwrap();

    // The bundle was skipped but the following purchase still applied.
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.updated, 1);
    let alpha = library.get_entry(&id("10")).unwrap().unwrap();
    assert_eq!(alpha.purchase_cost, Some(9.99));
}
