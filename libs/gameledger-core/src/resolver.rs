//! Match resolution: from a free-text title to a library entry id
//!
//! Resolution runs in passes. An exact pass compares numeral-variant
//! spellings of the query (and of its edition-stripped base) against each
//! candidate's variants. If a suffix was stripped and nothing matched, an
//! edition pass scores the base name against a short list and asks the user
//! to confirm the best hit. A general similarity pass is the fallback, with
//! an auto-accept rule for clear winners. Every answer, including "no
//! match", is cached by the raw query string, so the user is asked about a
//! given spelling at most once per run.

use crate::models::{AppId, Candidate};
use crate::normalize::{number_variants, strip_edition_suffix};
use crate::prompt::Prompt;
use crate::scoring::rank_candidates;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Thresholds steering the resolver's accept/ask/reject decisions.
///
/// The defaults mirror long-observed import behavior; the one genuinely
/// contested knob is `accept_ambiguous`, which controls whether a top
/// candidate that clears admission but neither `auto_accept` nor
/// `clear_lead` is taken anyway or rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPolicy {
    /// Minimum score for a candidate to be considered at all
    pub admission: f64,
    /// Minimum score for the edition-match shortlist
    pub edition_threshold: f64,
    /// Score at which an ambiguous top candidate is accepted without asking
    pub auto_accept: f64,
    /// Margin over the runner-up that makes the top candidate a clear winner
    pub clear_lead: f64,
    /// How many general-pass candidates to keep
    pub shortlist: usize,
    /// How many edition-pass candidates to keep
    pub edition_shortlist: usize,
    /// Accept an ambiguous top candidate even below `auto_accept`
    pub accept_ambiguous: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            admission: 50.0,
            edition_threshold: 200.0,
            auto_accept: 200.0,
            clear_lead: 100.0,
            shortlist: 5,
            edition_shortlist: 3,
            accept_ambiguous: false,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
    }
}

/// Query-string → resolved-id cache, owned by the resolver instance.
///
/// Negative results are cached too: a `Some(None)` lookup means the query
/// was already resolved to "no match" and must not prompt again.
#[derive(Debug, Default)]
pub struct ResolverCache {
    entries: DashMap<String, Option<AppId>>,
    stats: RwLock<CacheStats>,
}

impl ResolverCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<Option<AppId>> {
        let cached = self.entries.get(query).map(|entry| entry.value().clone());
        let mut stats = self.stats.write();
        if cached.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        cached
    }

    pub fn insert(&self, query: &str, resolved: Option<AppId>) {
        self.entries.insert(query.to_string(), resolved);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.entries = self.entries.len() as u64;
        stats.calculate_hit_rate();
        stats
    }
}

/// Resolves free-text titles against a candidate set
#[derive(Debug, Default)]
pub struct MatchResolver {
    policy: MatchPolicy,
    cache: ResolverCache,
}

impl MatchResolver {
    #[must_use]
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            cache: ResolverCache::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Get resolver cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve `query` to a library entry id, or `None` for no match.
    ///
    /// May ask the user to confirm an edition match; cached results never
    /// prompt.
    pub fn resolve(
        &self,
        query: &str,
        candidates: &[Candidate],
        prompt: &dyn Prompt,
    ) -> Option<AppId> {
        if let Some(cached) = self.cache.get(query) {
            debug!(query, "resolver cache hit");
            return cached;
        }

        let resolved = self.resolve_uncached(query, candidates, prompt);
        self.cache.insert(query, resolved.clone());
        resolved
    }

    fn resolve_uncached(
        &self,
        query: &str,
        candidates: &[Candidate],
        prompt: &dyn Prompt,
    ) -> Option<AppId> {
        let clean = query.trim().to_lowercase();
        let (base, suffix) = strip_edition_suffix(&clean);

        let query_variants = number_variants(&clean);
        let base_variants = if suffix.is_some() && base != clean {
            number_variants(&base)
        } else {
            Vec::new()
        };

        // Exact pass over numeral-variant spellings. For a stripped base a
        // containment match is accepted too, guarded by a two-shared-word
        // minimum so a short base can't latch onto an unrelated title.
        for candidate in candidates {
            let candidate_variants = number_variants(&candidate.name);

            for query_variant in query_variants.iter().chain(base_variants.iter()) {
                if candidate_variants.iter().any(|v| v == query_variant) {
                    debug!(query, candidate = %candidate.name, "exact variant match");
                    return Some(candidate.id.clone());
                }
            }

            if suffix.is_some() {
                for base_variant in &base_variants {
                    for candidate_variant in &candidate_variants {
                        let contained = base_variant.contains(candidate_variant.as_str())
                            || candidate_variant.contains(base_variant.as_str());
                        if contained && shared_word_count(base_variant, candidate_variant) >= 2 {
                            debug!(
                                query,
                                candidate = %candidate.name,
                                "base name containment match"
                            );
                            return Some(candidate.id.clone());
                        }
                    }
                }
            }
        }

        // Edition pass: the suffix is gone, so score what's left and let the
        // user judge whether the library's differently-packaged entry is the
        // same game. Declining falls through to the general pass.
        if let Some(suffix) = suffix {
            let mut shortlist = rank_candidates(
                &base,
                candidates,
                self.policy.edition_threshold,
                self.policy.edition_shortlist,
            );
            for candidate in &mut shortlist {
                if base == candidate.name.trim().to_lowercase() {
                    candidate.score += 1000.0;
                }
            }
            shortlist
                .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

            if let Some(best) = shortlist.first() {
                let question = format!(
                    "Searched for '{query}', found '{name}' in the library \
                     (removed suffix '{stripped}'). Are these the same game?",
                    name = best.name,
                    stripped = suffix.trim(),
                );
                if prompt.confirm(&question) {
                    debug!(query, candidate = %best.name, "edition match confirmed");
                    return Some(best.id.clone());
                }
            }
        }

        // General similarity pass.
        let matches = rank_candidates(
            &clean,
            candidates,
            self.policy.admission,
            self.policy.shortlist,
        );
        let best = matches.first()?;

        if matches.len() == 1 || best.score > matches[1].score + self.policy.clear_lead {
            debug!(query, candidate = %best.name, score = best.score, "clear winner");
            return Some(best.id.clone());
        }
        if best.score >= self.policy.auto_accept {
            debug!(query, candidate = %best.name, score = best.score, "accepted on score");
            return Some(best.id.clone());
        }
        if self.policy.accept_ambiguous {
            debug!(query, candidate = %best.name, score = best.score, "accepted ambiguous");
            return Some(best.id.clone());
        }

        debug!(query, score = best.score, "ambiguous below auto-accept, rejected");
        None
    }
}

fn shared_word_count(a: &str, b: &str) -> usize {
    let a_words: std::collections::BTreeSet<&str> = a.split_whitespace().collect();
    let b_words: std::collections::BTreeSet<&str> = b.split_whitespace().collect();
    a_words.intersection(&b_words).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedPrompt;

    fn candidates(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Candidate {
                id: AppId::new(format!("{}", 100 + i)).unwrap(),
                name: (*name).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_exact_name_resolves_without_prompting() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Portal", "Portal 2"]);

        let id = resolver.resolve("Portal 2", &list, &prompt);
        assert_eq!(id, Some(AppId::new("101").unwrap()));
        assert_eq!(prompt.counts().confirms, 0);
    }

    #[test]
    fn test_numeral_variant_resolves_exactly() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Grand Theft Auto", "Grand Theft Auto V", "GTA V"]);

        // "5" and "V" are the same token, so "GTA V" matches in the exact
        // pass ahead of any scoring.
        let id = resolver.resolve("gta 5", &list, &prompt);
        assert_eq!(id, Some(AppId::new("102").unwrap()));
        assert_eq!(prompt.counts().confirms, 0);
    }

    #[test]
    fn test_sequel_number_selects_correct_entry() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Call of Duty", "Call of Duty 2", "Call of Duty 3"]);

        let id = resolver.resolve("call of duty 2", &list, &prompt);
        assert_eq!(id, Some(AppId::new("101").unwrap()));
    }

    #[test]
    fn test_stripped_base_matches_unsuffixed_entry() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["The Witcher 3"]);

        let id = resolver.resolve("The Witcher 3 - GOTY Edition", &list, &prompt);
        assert_eq!(id, Some(AppId::new("100").unwrap()));
        assert_eq!(prompt.counts().confirms, 0);
    }

    #[test]
    fn test_containment_match_needs_two_shared_words() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();

        // Two shared words ("dark", "souls") plus containment accepts the
        // differently-packaged entry without asking.
        let list = candidates(&["Dark Souls: Prepare to Die Edition"]);
        let id = resolver.resolve("Dark Souls - Remastered", &list, &prompt);
        assert_eq!(id, Some(AppId::new("100").unwrap()));
        assert_eq!(prompt.counts().confirms, 0);
    }

    #[test]
    fn test_edition_confirmation_is_asked_once_and_cached() {
        let policy = MatchPolicy {
            edition_threshold: 100.0,
            ..MatchPolicy::default()
        };
        let resolver = MatchResolver::new(policy);
        let prompt = ScriptedPrompt::new();
        prompt.push_confirm(true);
        let list = candidates(&["The Elder Scrolls V: Skyrim"]);

        let id = resolver.resolve("Skyrim - Special Edition", &list, &prompt);
        assert_eq!(id, Some(AppId::new("100").unwrap()));
        assert_eq!(prompt.counts().confirms, 1);

        // Second resolution of the identical string is served from the
        // cache without prompting.
        let id = resolver.resolve("Skyrim - Special Edition", &list, &prompt);
        assert_eq!(id, Some(AppId::new("100").unwrap()));
        assert_eq!(prompt.counts().confirms, 1);
        assert_eq!(resolver.cache_stats().hits, 1);
    }

    #[test]
    fn test_unresolvable_query_caches_negative_result() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Call of Duty", "Quake"]);

        assert_eq!(resolver.resolve("xyz123", &list, &prompt), None);
        assert_eq!(resolver.resolve("xyz123", &list, &prompt), None);

        let stats = resolver.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(prompt.counts().confirms, 0);
    }

    #[test]
    fn test_ambiguous_below_auto_accept_is_policy_driven() {
        // With auto-accept raised, "duty" admits both sequels without a
        // clear lead, exercising the contested branch both ways.
        let strict = MatchResolver::new(MatchPolicy {
            auto_accept: 300.0,
            ..MatchPolicy::default()
        });
        let lenient = MatchResolver::new(MatchPolicy {
            auto_accept: 300.0,
            accept_ambiguous: true,
            ..MatchPolicy::default()
        });
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Call of Duty", "Call of Duty 2"]);

        assert_eq!(strict.resolve("duty", &list, &prompt), None);
        assert_eq!(
            lenient.resolve("duty", &list, &prompt),
            Some(AppId::new("100").unwrap())
        );
    }

    #[test]
    fn test_ambiguous_at_auto_accept_takes_top() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        let list = candidates(&["Call of Duty", "Call of Duty 2"]);

        // Both entries score well above 200 without a 100-point lead; the
        // top one is accepted on score alone.
        let id = resolver.resolve("duty", &list, &prompt);
        assert_eq!(id, Some(AppId::new("100").unwrap()));
    }

    #[test]
    fn test_no_candidates_resolves_to_none() {
        let resolver = MatchResolver::default();
        let prompt = ScriptedPrompt::new();
        assert_eq!(resolver.resolve("anything", &[], &prompt), None);
    }
}
