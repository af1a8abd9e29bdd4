//! Dictation normalization: rewrite free-form clinical text with canonical terms.
//!
//! Word windows are matched greedily, longest first, against every lexicon
//! category (exact and alias only), so "high blood pressure" is replaced as a
//! whole before "blood" is ever looked at. Single words long enough to be
//! safe are also fuzzy-matched. Everything else, punctuation included, is
//! copied through unchanged.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NormalizerConfig;
use crate::models::{NormalizedTerm, ResolutionMethod};
use crate::reference::Lexicon;

use super::normalizer::TermNormalizer;

static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*").unwrap());

/// All-caps words up to this many letters are treated as abbreviations.
const ABBREVIATION_MAX_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictationResult {
    pub normalized_text: String,
    /// Every term that was recognised, in text order.
    pub terms: Vec<NormalizedTerm>,
}

#[derive(Debug, Clone)]
pub struct DictationNormalizer<'a> {
    terms: TermNormalizer<'a>,
}

impl<'a> DictationNormalizer<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self::with_config(lexicon, NormalizerConfig::default())
    }

    pub fn with_config(lexicon: &'a Lexicon, config: NormalizerConfig) -> Self {
        Self {
            terms: TermNormalizer::with_config(lexicon, config),
        }
    }

    pub fn normalize_dictation(&self, text: &str) -> DictationResult {
        let config = self.terms.config();
        let words: Vec<(usize, usize)> = RE_WORD
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut out = String::with_capacity(text.len());
        let mut terms = Vec::new();
        let mut copied_to = 0;
        let mut i = 0;

        while i < words.len() {
            let widest = config.max_phrase_words.min(words.len() - i);
            let mut matched = None;

            for width in (1..=widest).rev() {
                if !same_phrase(text, &words[i..i + width]) {
                    continue;
                }
                let span = (words[i].0, words[i + width - 1].1);
                if let Some(term) = self.terms.lookup_any(&text[span.0..span.1]) {
                    matched = Some((width, span, term));
                    break;
                }
            }

            if matched.is_none() {
                let (start, end) = words[i];
                let word = &text[start..end];
                let eligible = word.chars().count() >= config.dictation_min_fuzzy_len
                    && word.chars().all(|c| !c.is_numeric());
                if eligible {
                    let term = self.terms.normalize_any(word);
                    if term.resolution_method == ResolutionMethod::Fuzzy {
                        matched = Some((1, (start, end), term));
                    }
                }
            }

            match matched {
                Some((width, (start, end), term)) => {
                    out.push_str(&text[copied_to..start]);
                    out.push_str(&preserve_case(&text[start..end], &term.canonical_text));
                    copied_to = end;
                    terms.push(term);
                    i += width;
                }
                None => i += 1,
            }
        }
        out.push_str(&text[copied_to..]);

        tracing::debug!(terms = terms.len(), "Dictation normalized");

        DictationResult {
            normalized_text: out,
            terms,
        }
    }
}

/// Words belong to one phrase when only spaces separate them.
fn same_phrase(text: &str, words: &[(usize, usize)]) -> bool {
    words
        .windows(2)
        .all(|pair| text[pair[0].1..pair[1].0].chars().all(|c| c == ' ' || c == '\t'))
}

/// Apply the original's capitalization pattern to the replacement.
///
/// Short all-caps originals are abbreviations ("HTN"); their expansion keeps
/// the lexicon's own casing.
fn preserve_case(original: &str, replacement: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return replacement.to_string();
    }

    let all_upper = letters.iter().all(|c| c.is_uppercase());
    if all_upper {
        if letters.len() <= ABBREVIATION_MAX_LEN {
            return replacement.to_string();
        }
        return replacement.to_uppercase();
    }

    if letters[0].is_uppercase() {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(c) => {
                let mut s = c.to_uppercase().to_string();
                s.extend(chars);
                s
            }
            None => String::new(),
        };
    }

    // Lowercase original: lowercase the replacement unless it carries inner capitals ("HbA1c").
    if replacement.chars().skip(1).any(char::is_uppercase) {
        replacement.to_string()
    } else {
        replacement.to_lowercase()
    }
}
