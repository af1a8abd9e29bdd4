//! Term normalization: map a token to its canonical lexicon term.
//!
//! Resolution order is exact, alias, fuzzy. Fuzzy matching scores the token
//! against every spelling of the requested category (canonical terms, source
//! terms and aliases) with optimal-string-alignment distance, so a single
//! transposition ("metfromin") costs 1. A candidate is accepted only when
//! `distance / token_len` is below the configured threshold. Anything else is
//! returned unresolved with the original text untouched.

use crate::config::NormalizerConfig;
use crate::models::{LexiconEntry, NormalizedTerm, ResolutionMethod, TermCategory, Token, TokenCategory};
use crate::reference::{fold_key, Lexicon};

pub const EXACT_CONFIDENCE: f64 = 1.0;
pub const ALIAS_CONFIDENCE: f64 = 0.95;

/// Stateless apart from the borrowed lexicon; share one across threads.
#[derive(Debug, Clone)]
pub struct TermNormalizer<'a> {
    lexicon: &'a Lexicon,
    config: NormalizerConfig,
}

impl<'a> TermNormalizer<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self::with_config(lexicon, NormalizerConfig::default())
    }

    pub fn with_config(lexicon: &'a Lexicon, config: NormalizerConfig) -> Self {
        Self { lexicon, config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one token within a category. Never fails.
    pub fn normalize(&self, token: &Token, category: TermCategory) -> NormalizedTerm {
        let original = token.raw_text.as_str();
        if original.trim().is_empty() {
            return NormalizedTerm::unresolved(original, category, None);
        }

        if let Some(term) = self.lookup(original, category) {
            return term;
        }

        let Some((candidate, distance)) = self.nearest(original, category) else {
            return NormalizedTerm::unresolved(original, category, None);
        };

        let len = fold_key(original).chars().count();
        let ratio = distance as f64 / len as f64;
        if ratio < self.config.fuzzy_threshold {
            tracing::debug!(
                term = %original,
                canonical = %candidate,
                distance,
                "Fuzzy match accepted"
            );
            NormalizedTerm {
                original_text: original.to_string(),
                canonical_text: candidate.clone(),
                confidence: 1.0 - ratio,
                category,
                resolution_method: ResolutionMethod::Fuzzy,
                distance: Some(distance),
                best_candidate: Some(candidate),
            }
        } else {
            NormalizedTerm::unresolved(original, category, Some((candidate, distance)))
        }
    }

    /// Convenience form of [`normalize`](Self::normalize) for plain text.
    pub fn normalize_text(&self, text: &str, category: TermCategory) -> NormalizedTerm {
        self.normalize(&Token::standalone(text, TokenCategory::Phrase), category)
    }

    /// Try every category and keep the strongest resolution.
    ///
    /// Exact beats alias beats fuzzy; fuzzy results compare by confidence.
    /// Remaining ties follow `TermCategory::ALL`. When nothing resolves, the
    /// unresolved result with the closest candidate is returned.
    pub fn normalize_any(&self, text: &str) -> NormalizedTerm {
        let results = TermCategory::ALL.map(|category| self.normalize_text(text, category));

        let mut best: Option<&NormalizedTerm> = None;
        for term in &results {
            best = match best {
                Some(current) if !outranks(term, current) => Some(current),
                _ => Some(term),
            };
        }
        // `results` is never empty.
        best.cloned()
            .unwrap_or_else(|| NormalizedTerm::unresolved(text, TermCategory::Drug, None))
    }

    /// Exact or alias match in any category, without fuzzy matching.
    pub fn lookup_any(&self, text: &str) -> Option<NormalizedTerm> {
        let by_method = |method: ResolutionMethod| {
            TermCategory::ALL
                .iter()
                .filter_map(|&category| self.lookup(text, category))
                .find(|term| term.resolution_method == method)
        };
        by_method(ResolutionMethod::Exact).or_else(|| by_method(ResolutionMethod::Alias))
    }

    fn lookup(&self, text: &str, category: TermCategory) -> Option<NormalizedTerm> {
        if let Some(entry) = self.lexicon.lookup_exact(text, category) {
            return Some(resolved(text, entry, ResolutionMethod::Exact, EXACT_CONFIDENCE));
        }
        self.lexicon
            .lookup_alias(text, category)
            .map(|entry| resolved(text, entry, ResolutionMethod::Alias, ALIAS_CONFIDENCE))
    }

    /// Closest candidate spelling: smallest distance, then first canonical term.
    fn nearest(&self, text: &str, category: TermCategory) -> Option<(String, usize)> {
        let key = fold_key(text);
        let key_len = key.chars().count();
        let mut best: Option<(&str, usize)> = None;

        for candidate in self.lexicon.fuzzy_candidates(category) {
            let cand_len = candidate.key.chars().count();
            let len_diff = key_len.abs_diff(cand_len);
            if best.is_some_and(|(_, d)| len_diff >= d) {
                continue;
            }

            let distance = osa_distance(&key, &candidate.key);
            // Candidates are sorted by canonical term, so strict `<` keeps the
            // lexicographically first one on equal distance.
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate.canonical_term.as_str(), distance));
            }
        }

        best.map(|(canonical, distance)| (canonical.to_string(), distance))
    }
}

fn resolved(
    original: &str,
    entry: &LexiconEntry,
    method: ResolutionMethod,
    confidence: f64,
) -> NormalizedTerm {
    NormalizedTerm {
        original_text: original.to_string(),
        canonical_text: entry.canonical_term.clone(),
        confidence,
        category: entry.category,
        resolution_method: method,
        distance: Some(0),
        best_candidate: Some(entry.canonical_term.clone()),
    }
}

fn method_rank(method: ResolutionMethod) -> u8 {
    match method {
        ResolutionMethod::Exact => 0,
        ResolutionMethod::Alias => 1,
        ResolutionMethod::Fuzzy => 2,
        ResolutionMethod::Unresolved => 3,
    }
}

/// Strictly better than `current`; equal results keep `current`.
fn outranks(candidate: &NormalizedTerm, current: &NormalizedTerm) -> bool {
    let (a, b) = (
        method_rank(candidate.resolution_method),
        method_rank(current.resolution_method),
    );
    if a != b {
        return a < b;
    }
    match candidate.resolution_method {
        ResolutionMethod::Fuzzy => candidate.confidence > current.confidence,
        ResolutionMethod::Unresolved => match (candidate.distance, current.distance) {
            (Some(x), Some(y)) => x < y,
            (Some(_), None) => true,
            _ => false,
        },
        _ => false,
    }
}

/// Optimal string alignment distance (Levenshtein plus adjacent transpositions),
/// counted in chars.
pub fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut before_prev = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                curr[j] = curr[j].min(before_prev[j - 2] + 1);
            }
        }
        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
