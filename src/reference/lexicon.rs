//! Lexicon store: canonical terms and their synonyms, per category.
//!
//! Built once from the lexicon table and never mutated, so a `&Lexicon` can be
//! shared across threads freely.

use std::collections::HashMap;

use crate::models::{LexiconEntry, TermCategory};

use super::ConfigurationError;

/// Fold a term into its lookup key: trimmed, lowercased, single-spaced,
/// without trailing periods.
pub fn fold_key(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .trim_end()
        .to_lowercase()
}

/// A spelling the fuzzy matcher may compare a token against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyCandidate {
    /// Folded spelling (canonical term, source term or alias).
    pub key: String,
    pub canonical_term: String,
}

type Key = (TermCategory, String);

#[derive(Debug)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    exact: HashMap<Key, usize>,
    aliases: HashMap<Key, usize>,
    candidates: HashMap<TermCategory, Vec<FuzzyCandidate>>,
}

impl Lexicon {
    /// Build the lexicon, rejecting tables that would make lookups ambiguous.
    pub fn from_entries(entries: Vec<LexiconEntry>) -> Result<Self, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::EmptyTable("lexicon".into()));
        }

        let mut lexicon = Self {
            entries: Vec::with_capacity(entries.len()),
            exact: HashMap::new(),
            aliases: HashMap::new(),
            candidates: HashMap::new(),
        };
        // Canonical term owning each folded spelling, for conflict detection.
        let mut owners: HashMap<Key, String> = HashMap::new();

        for entry in entries {
            if entry.canonical_term.trim().is_empty() {
                return Err(ConfigurationError::EmptyCanonicalTerm {
                    source_term: entry.source_term,
                });
            }
            if entry.source_term.trim().is_empty() {
                return Err(ConfigurationError::EmptySourceTerm {
                    canonical_term: entry.canonical_term,
                });
            }

            let idx = lexicon.entries.len();
            let category = entry.category;
            let canonical = entry.canonical_term.trim().to_string();

            for term in [&entry.source_term, &entry.canonical_term] {
                claim(&mut owners, category, term, &canonical)?;
                lexicon.exact.entry((category, fold_key(term))).or_insert(idx);
            }
            for alias in &entry.aliases {
                if alias.trim().is_empty() {
                    continue;
                }
                claim(&mut owners, category, alias, &canonical)?;
                let key = (category, fold_key(alias));
                if !lexicon.exact.contains_key(&key) {
                    lexicon.aliases.entry(key).or_insert(idx);
                }
            }

            let spellings = [&entry.canonical_term, &entry.source_term]
                .into_iter()
                .chain(entry.aliases.iter())
                .filter(|s| !s.trim().is_empty());
            let bucket = lexicon.candidates.entry(category).or_default();
            for spelling in spellings {
                bucket.push(FuzzyCandidate {
                    key: fold_key(spelling),
                    canonical_term: canonical.clone(),
                });
            }

            lexicon.entries.push(LexiconEntry {
                canonical_term: canonical,
                ..entry
            });
        }

        for bucket in lexicon.candidates.values_mut() {
            bucket.sort_by(|a, b| {
                a.canonical_term
                    .cmp(&b.canonical_term)
                    .then_with(|| a.key.cmp(&b.key))
            });
            bucket.dedup_by(|a, b| a.key == b.key);
        }

        tracing::debug!(
            entries = lexicon.entries.len(),
            exact_keys = lexicon.exact.len(),
            alias_keys = lexicon.aliases.len(),
            "Lexicon built"
        );

        Ok(lexicon)
    }

    /// Case-insensitive exact match on source or canonical term, then alias match.
    pub fn lookup(&self, term: &str, category: TermCategory) -> Option<&LexiconEntry> {
        self.lookup_exact(term, category)
            .or_else(|| self.lookup_alias(term, category))
    }

    pub fn lookup_exact(&self, term: &str, category: TermCategory) -> Option<&LexiconEntry> {
        self.exact
            .get(&(category, fold_key(term)))
            .map(|&idx| &self.entries[idx])
    }

    pub fn lookup_alias(&self, term: &str, category: TermCategory) -> Option<&LexiconEntry> {
        self.aliases
            .get(&(category, fold_key(term)))
            .map(|&idx| &self.entries[idx])
    }

    /// Spellings eligible for fuzzy matching, sorted by canonical term then key.
    pub fn fuzzy_candidates(&self, category: TermCategory) -> &[FuzzyCandidate] {
        self.candidates
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct canonical terms of a category, sorted.
    pub fn canonical_terms(&self, category: TermCategory) -> Vec<&str> {
        let mut terms: Vec<&str> = self
            .fuzzy_candidates(category)
            .iter()
            .map(|c| c.canonical_term.as_str())
            .collect();
        terms.dedup();
        terms
    }

    /// True when `term` folds to a known canonical term of the category.
    pub fn is_canonical(&self, term: &str, category: TermCategory) -> bool {
        let key = fold_key(term);
        self.lookup_exact(term, category)
            .is_some_and(|e| fold_key(&e.canonical_term) == key)
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Record `canonical` as the owner of `term`, failing if another canonical
/// term in the same category already owns it.
fn claim(
    owners: &mut HashMap<Key, String>,
    category: TermCategory,
    term: &str,
    canonical: &str,
) -> Result<(), ConfigurationError> {
    let key = (category, fold_key(term));
    match owners.get(&key) {
        Some(first) if fold_key(first) != fold_key(canonical) => {
            Err(ConfigurationError::ConflictingTerm {
                term: term.to_string(),
                category,
                first: first.clone(),
                second: canonical.to_string(),
            })
        }
        Some(_) => Ok(()),
        None => {
            owners.insert(key, canonical.to_string());
            Ok(())
        }
    }
}
