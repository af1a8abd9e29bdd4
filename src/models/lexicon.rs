use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::enums::TermCategory;

fn default_locale() -> String {
    "en".into()
}

/// One row of the lexicon table (loaded from lexicon.json).
///
/// Several entries may share a canonical term, e.g. one per locale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LexiconEntry {
    pub source_term: String,
    pub canonical_term: String,
    pub category: TermCategory,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

impl LexiconEntry {
    pub fn new(source_term: &str, canonical_term: &str, category: TermCategory) -> Self {
        Self {
            source_term: source_term.into(),
            canonical_term: canonical_term.into(),
            category,
            locale: default_locale(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.into();
        self
    }
}
