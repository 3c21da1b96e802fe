//! Similarity scoring between a free-text query and candidate titles
//!
//! The score is an additive blend of independent signals: number agreement
//! for sequels, missing-text penalties, abbreviation expansion, word and
//! character overlap, prefix position, edit distance, and substring
//! containment. Scores can go negative; callers compare against thresholds
//! and never assume non-negativity.

use crate::models::{Candidate, MatchCandidate};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Score returned for an exact string match, short-circuiting all other
/// signals
pub const EXACT_MATCH_SCORE: f64 = 1000.0;

/// Known shorthand queries and the full titles they expand to
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("gta", "grand theft auto"),
    ("cod", "call of duty"),
    ("ac", "assassins creed"),
    ("bf", "battlefield"),
    ("csgo", "counter strike global offensive"),
    ("dota", "defense of the ancients"),
    ("lol", "league of legends"),
    ("wow", "world of warcraft"),
];

/// Extract every run of consecutive digits from `text` as a set.
#[must_use]
pub fn extract_numbers(text: &str) -> BTreeSet<String> {
    let mut numbers = BTreeSet::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            numbers.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        numbers.insert(current);
    }
    numbers
}

/// Score how well `candidate` matches `query`; higher is better.
///
/// Both inputs are expected lowercased and trimmed.
#[must_use]
pub fn similarity_score(query: &str, candidate: &str) -> f64 {
    if query == candidate {
        return EXACT_MATCH_SCORE;
    }

    let mut score = 0.0;

    // Number agreement dominates sequel disambiguation: a shared "2" is
    // worth more than any amount of word overlap, and a conflicting number
    // drags the pair apart.
    let query_numbers = extract_numbers(query);
    let candidate_numbers = extract_numbers(candidate);
    if !query_numbers.is_empty() && !candidate_numbers.is_empty() {
        let common = query_numbers.intersection(&candidate_numbers).count();
        if common > 0 {
            score += common as f64 * 150.0;
        }
        let mismatched = query_numbers
            .symmetric_difference(&candidate_numbers)
            .count();
        score -= mismatched as f64 * 30.0;
    } else if !query_numbers.is_empty() {
        score -= query_numbers.len() as f64 * 80.0;
    } else if !candidate_numbers.is_empty() {
        score -= candidate_numbers.len() as f64 * 20.0;
    }

    let mut missing_penalty = missing_text_penalty(query, candidate);

    // An abbreviation looks like a huge lexical mismatch, so a recognized
    // one both earns a bonus and damps the missing-text penalty.
    for (abbr, full_name) in ABBREVIATIONS {
        if query.starts_with(abbr) && candidate.contains(full_name) {
            score += 300.0;
            missing_penalty *= 0.3;
            break;
        }
    }
    score -= missing_penalty;

    let query_words: BTreeSet<&str> = query.split_whitespace().collect();
    let candidate_words: BTreeSet<&str> = candidate.split_whitespace().collect();
    score += query_words.intersection(&candidate_words).count() as f64 * 100.0;

    if candidate.starts_with(query) {
        score += 80.0;
    }
    if candidate_words.iter().any(|word| word.starts_with(query)) {
        score += 60.0;
    }

    // Short queries prefer short titles.
    let query_len = query.chars().count();
    let candidate_len = candidate.chars().count();
    if query_len <= 5 {
        score += (50.0 - candidate_len as f64).max(0.0);
    }

    let query_chars: BTreeSet<char> = query.chars().collect();
    let candidate_chars: BTreeSet<char> = candidate.chars().collect();
    let union = query_chars.union(&candidate_chars).count();
    if union > 0 {
        let shared = query_chars.intersection(&candidate_chars).count();
        score += shared as f64 / union as f64 * 30.0;
    }

    let distance = strsim::levenshtein(query, candidate);
    let max_len = query_len.max(candidate_len);
    if max_len > 0 {
        score += (max_len - distance) as f64 / max_len as f64 * 40.0;
    }

    if candidate.contains(query) {
        score += 50.0;
    }
    if candidate_len <= query_len && query.contains(candidate) {
        score += 30.0;
    }

    score
}

/// Penalty for query text absent from the candidate, plus a length-excess
/// term so a short query doesn't drown in a long title.
fn missing_text_penalty(query: &str, candidate: &str) -> f64 {
    let query_words: BTreeSet<&str> = query.split_whitespace().collect();
    let candidate_words: BTreeSet<&str> = candidate.split_whitespace().collect();

    let mut penalty = 0.0;

    if !query_words.is_empty() {
        let missing = query_words.difference(&candidate_words).count();
        penalty += missing as f64 / query_words.len() as f64 * 120.0;
    }

    let query_chars: BTreeSet<char> = query.chars().filter(|c| *c != ' ').collect();
    let candidate_chars: BTreeSet<char> = candidate.chars().filter(|c| *c != ' ').collect();
    if !query_chars.is_empty() {
        let missing = query_chars.difference(&candidate_chars).count();
        penalty += missing as f64 / query_chars.len() as f64 * 80.0;
    }

    let query_len = query.chars().count();
    let candidate_len = candidate.chars().count();
    if candidate_len > query_len {
        penalty += (((candidate_len - query_len) * 2) as f64).min(60.0);
    }
    if query_len <= 3 && candidate_len > 10 {
        penalty += 40.0;
    }

    penalty
}

/// Score every candidate against `query` and keep the best.
///
/// Candidates scoring below `threshold` are dropped; the survivors come back
/// sorted best-first, at most `max_results` of them. Ties keep the original
/// candidate order.
#[must_use]
pub fn rank_candidates(
    query: &str,
    candidates: &[Candidate],
    threshold: f64,
    max_results: usize,
) -> Vec<MatchCandidate> {
    let query = query.trim().to_lowercase();

    let mut matches: Vec<MatchCandidate> = candidates
        .iter()
        .filter(|candidate| !candidate.name.is_empty())
        .map(|candidate| MatchCandidate {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            score: similarity_score(&query, &candidate.name.trim().to_lowercase()),
        })
        .filter(|candidate| candidate.score >= threshold)
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(max_results);
    matches
}
