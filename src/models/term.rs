use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::enums::{ResolutionMethod, TermCategory, TokenCategory};

/// A normalizable unit cut out of raw text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub raw_text: String,
    /// Byte offsets into the segmented input.
    pub start: usize,
    pub end: usize,
    pub category_guess: TokenCategory,
}

impl Token {
    /// Build a token that stands alone (not cut from a larger text).
    pub fn standalone(text: &str, category_guess: TokenCategory) -> Self {
        Self {
            raw_text: text.into(),
            start: 0,
            end: text.len(),
            category_guess,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Outcome of normalizing one token against the lexicon.
///
/// `Unresolved` always carries confidence 0 and the original text verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedTerm {
    pub original_text: String,
    pub canonical_text: String,
    pub confidence: f64,
    pub category: TermCategory,
    pub resolution_method: ResolutionMethod,
    /// Edit distance to the closest candidate, when one was scored.
    pub distance: Option<usize>,
    /// Closest candidate, including a rejected fuzzy candidate.
    pub best_candidate: Option<String>,
}

impl NormalizedTerm {
    pub fn unresolved(
        original: &str,
        category: TermCategory,
        nearest: Option<(String, usize)>,
    ) -> Self {
        let (best_candidate, distance) = match nearest {
            Some((candidate, distance)) => (Some(candidate), Some(distance)),
            None => (None, None),
        };
        Self {
            original_text: original.into(),
            canonical_text: original.into(),
            confidence: 0.0,
            category,
            resolution_method: ResolutionMethod::Unresolved,
            distance,
            best_candidate,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution_method.is_resolved()
    }
}
