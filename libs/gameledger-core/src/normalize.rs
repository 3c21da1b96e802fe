//! Title normalization: punctuation folding, numeral variants, and edition
//! suffix stripping

use crate::numerals::{int_to_roman, roman_to_int};

/// Edition suffixes recognized on the end of a title.
///
/// Checked in order, first match wins; the more specific phrasings must stay
/// ahead of the generic ones.
pub const EDITION_SUFFIXES: &[&str] = &[
    " (pre-purchase)",
    " - standard edition",
    " - deluxe edition",
    " - ultimate edition",
    " - game of the year edition",
    " - goty edition",
    " - collector's edition",
    " - special edition",
    " - limited edition",
    " - enhanced edition",
    " - definitive edition",
    " - complete edition",
    " - gold edition",
    " - platinum edition",
    " - premium edition",
    " - remastered edition",
    " remastered edition",
    " - remastered",
    " remastered",
    "standard edition (pre-purchase)",
    " standard edition",
    " deluxe edition",
    " ultimate edition",
    " game of the year edition",
    " goty edition",
    " collector's edition",
    " special edition",
    " limited edition",
    " enhanced edition",
    " definitive edition",
    " complete edition",
    " gold edition",
    " platinum edition",
    " premium edition",
];

/// Lowercase and trim a title, then strip the first matching edition suffix.
///
/// Returns the (possibly unchanged) base name and the suffix that was
/// removed, if any.
#[must_use]
pub fn strip_edition_suffix(title: &str) -> (String, Option<&'static str>) {
    let clean = title.trim().to_lowercase();

    for suffix in EDITION_SUFFIXES {
        if clean.ends_with(suffix) {
            let base = clean[..clean.len() - suffix.len()].trim().to_string();
            return (base, Some(suffix));
        }
    }

    (clean, None)
}

/// Produce the numeral-variant spellings of a title.
///
/// Colons, hyphens, and dashes become spaces and whitespace runs collapse,
/// so `"Final Fantasy VII: Remake"` and `"final fantasy vii remake"` compare
/// equal. Each Roman-numeral word and each digit-run word then yields one
/// extra spelling with that token swapped to the other numeral system. The
/// normalized original is always first; a title with no numeral tokens yields
/// a singleton.
#[must_use]
pub fn number_variants(title: &str) -> Vec<String> {
    let folded = fold_punctuation(title);
    let words: Vec<&str> = folded.split_whitespace().collect();

    let mut variants = vec![words.join(" ").to_lowercase()];
    let mut push = |variant: String| {
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    };

    for (idx, word) in words.iter().enumerate() {
        if is_roman_word(word) {
            if let Some(n) = roman_to_int(word) {
                push(swap_word(&words, idx, &n.to_string()));
            }
        } else if word.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(roman) = word.parse::<u32>().ok().and_then(int_to_roman) {
                push(swap_word(&words, idx, &roman));
            }
        }
    }

    variants
}

fn fold_punctuation(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ':' | '-' | '–' | '—' => ' ',
            other => other,
        })
        .collect()
}

// Only I, V, and X count as Roman-numeral words in titles; allowing L, C, D,
// or M would swallow ordinary words like "cd" or "mid-word" fragments.
fn is_roman_word(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| matches!(c.to_ascii_uppercase(), 'I' | 'V' | 'X'))
}

fn swap_word(words: &[&str], idx: usize, replacement: &str) -> String {
    let mut swapped: Vec<&str> = words.to_vec();
    swapped[idx] = replacement;
    swapped.join(" ").to_lowercase()
}
