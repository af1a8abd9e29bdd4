//! Segmenter: cut free-form clinical text into normalizable tokens, and split
//! a drug mention into name and posology.

use crate::models::{Token, TokenCategory};

use super::dosing::{find_dose, find_frequency, find_route, DoseMatch, PhraseMatch};

/// Words dropped from the front of a medication name.
const FILLER_WORDS: &[&str] = &[
    "also", "and", "continue", "continues", "continuing", "currently", "for", "of", "on",
    "prescribed", "start", "started", "still", "take", "taken", "takes", "taking", "the", "use",
    "uses", "using", "with",
];

/// Dosage-form words, with their canonical spelling.
const FORM_WORDS: &[(&str, &str)] = &[
    ("caps", "capsule"),
    ("capsule", "capsule"),
    ("capsules", "capsule"),
    ("cream", "cream"),
    ("drops", "drops"),
    ("foam", "foam"),
    ("gel", "gel"),
    ("inhaler", "inhaler"),
    ("injection", "injection"),
    ("lotion", "lotion"),
    ("ointment", "ointment"),
    ("patch", "patch"),
    ("pen", "pen"),
    ("shampoo", "shampoo"),
    ("solution", "solution"),
    ("spray", "spray"),
    ("suppository", "suppository"),
    ("suspension", "suspension"),
    ("syrup", "syrup"),
    ("tab", "tablet"),
    ("tablet", "tablet"),
    ("tablets", "tablet"),
    ("tabs", "tablet"),
];

/// A drug mention split into its parts. Absent parts are `None`; an absent
/// name is an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrugMentionParts {
    pub name: String,
    pub dose: Option<f64>,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub form: Option<String>,
}

impl DrugMentionParts {
    pub fn has_posology(&self) -> bool {
        self.dose.is_some() || self.frequency.is_some() || self.route.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    /// Preceded by a line break (or the start of the text).
    new_line: bool,
}

/// Cut `text` into tokens. Pure and total: any input yields a (possibly empty) list.
pub fn segment(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for seg in split_segments(text) {
        let raw = &text[seg.start..seg.end];
        let category = classify(raw);

        if category == TokenCategory::DrugMention && !seg.new_line && is_posology_only(raw) {
            if let Some(prev) = tokens.last_mut().filter(|t| {
                matches!(
                    t.category_guess,
                    TokenCategory::DrugMention | TokenCategory::Phrase
                )
            }) {
                prev.end = seg.end;
                prev.raw_text = text[prev.start..prev.end].to_string();
                prev.category_guess = TokenCategory::DrugMention;
                continue;
            }
        }

        tokens.push(Token {
            raw_text: raw.to_string(),
            start: seg.start,
            end: seg.end,
            category_guess: category,
        });
    }

    tokens
}

fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    let mut start = 0;
    let mut new_line = true;
    let mut line_start = true;

    let close = |segments: &mut Vec<Segment>, from: usize, to: usize, new_line: bool| {
        let slice = &text[from..to];
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            let offset = from + (slice.len() - slice.trim_start().len());
            segments.push(Segment {
                start: offset,
                end: offset + trimmed.len(),
                new_line,
            });
        }
    };

    for (pos, &(i, ch)) in chars.iter().enumerate() {
        let next_start = i + ch.len_utf8();
        let prev = pos.checked_sub(1).map(|p| chars[p].1);
        let next = chars.get(pos + 1).map(|&(_, c)| c);
        let between_digits =
            prev.is_some_and(|c| c.is_ascii_digit()) && next.is_some_and(|c| c.is_ascii_digit());

        if line_start {
            if ch.is_whitespace() && ch != '\n' && ch != '\r' {
                start = next_start;
                continue;
            }
            if matches!(ch, '-' | '*' | '•') {
                start = next_start;
                continue;
            }
        }

        let boundary = match ch {
            '\n' | '\r' | ';' | '+' => true,
            ',' => !between_digits,
            '.' => !between_digits && next.map_or(true, char::is_whitespace),
            _ => false,
        };

        if boundary {
            close(&mut segments, start, i, new_line);
            start = next_start;
            new_line = matches!(ch, '\n' | '\r');
            line_start = new_line;
        } else {
            line_start = false;
        }
    }
    close(&mut segments, start, text.len(), new_line);

    segments
}

fn classify(segment: &str) -> TokenCategory {
    if find_dose(segment).is_some()
        || find_frequency(segment).is_some()
        || find_route(segment).is_some()
    {
        TokenCategory::DrugMention
    } else if segment.chars().any(char::is_alphabetic) {
        TokenCategory::Phrase
    } else {
        TokenCategory::Unknown
    }
}

fn is_posology_only(segment: &str) -> bool {
    let parts = parse_drug_mention(segment);
    parts.name.is_empty() && parts.has_posology()
}

/// Split a drug mention into name, dose, frequency, route and form.
///
/// The name is the first run of words that is not part of a dose, frequency
/// or route phrase, minus leading filler verbs and a trailing form word.
/// "Apply betamethasone cream twice daily" gives name "betamethasone", form
/// "cream", frequency "twice daily", route "topical".
pub fn parse_drug_mention(text: &str) -> DrugMentionParts {
    let dose = find_dose(text);
    let frequency = find_frequency(text);
    let route = find_route(text);

    let mut spans: Vec<(usize, usize)> = Vec::new();
    if let Some(DoseMatch { start, end, .. }) = &dose {
        spans.push((*start, *end));
    }
    for PhraseMatch { start, end, .. } in frequency.iter().chain(route.iter()) {
        spans.push((*start, *end));
    }
    spans.sort_unstable();

    let mut name = String::new();
    let mut form = None;
    let mut cursor = 0;
    for gap_end in spans.iter().map(|&(s, _)| s).chain(std::iter::once(text.len())) {
        if gap_end > cursor {
            let (n, f) = split_name_and_form(&text[cursor..gap_end]);
            if f.is_some() {
                form = f;
            }
            if !n.is_empty() {
                name = n;
                break;
            }
        }
        if let Some(&(_, end)) = spans.iter().find(|&&(s, _)| s == gap_end) {
            cursor = cursor.max(end);
        }
    }

    DrugMentionParts {
        name,
        dose: dose.as_ref().map(|d| d.value),
        unit: dose.map(|d| d.unit),
        frequency: frequency.map(|f| f.canonical),
        route: route.map(|r| r.canonical),
        form,
    }
}

fn split_name_and_form(chunk: &str) -> (String, Option<String>) {
    let mut words: Vec<&str> = chunk
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() && c != '%'))
        .filter(|w| !w.is_empty())
        .collect();

    while words
        .first()
        .is_some_and(|w| FILLER_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.remove(0);
    }

    let mut form = None;
    if let Some(last) = words.last() {
        let lower = last.to_lowercase();
        if let Some(&(_, canonical)) = FORM_WORDS.iter().find(|(w, _)| *w == lower) {
            form = Some(canonical.to_string());
            words.pop();
        }
    }

    (words.join(" "), form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.raw_text.as_str()).collect()
    }

    #[test]
    fn splits_on_newlines_and_semicolons() {
        let tokens = segment("Paracetamol 500 mg\nIbuprofen 400 mg; Metformin 500 mg twice daily");
        assert_eq!(
            texts(&tokens),
            vec!["Paracetamol 500 mg", "Ibuprofen 400 mg", "Metformin 500 mg twice daily"]
        );
        assert!(tokens
            .iter()
            .all(|t| t.category_guess == TokenCategory::DrugMention));
    }

    #[test]
    fn spans_point_into_input() {
        let input = "  - Paracetamol 500 mg\n  * Ibuprofen";
        for token in segment(input) {
            assert_eq!(&input[token.span()], token.raw_text);
        }
    }

    #[test]
    fn strips_bullets() {
        let tokens = segment("- Paracetamol\n• Ibuprofen\n* Metformin");
        assert_eq!(texts(&tokens), vec!["Paracetamol", "Ibuprofen", "Metformin"]);
    }

    #[test]
    fn keeps_decimal_numbers_together() {
        let tokens = segment("Betamethasone 0.05% twice daily, Levothyroxine 0,5 mg");
        assert_eq!(
            texts(&tokens),
            vec!["Betamethasone 0.05% twice daily", "Levothyroxine 0,5 mg"]
        );
    }

    #[test]
    fn abbreviation_periods_do_not_split() {
        let tokens = segment("Metformin 500 mg b.i.d. Aspirin 75 mg");
        assert_eq!(texts(&tokens), vec!["Metformin 500 mg b.i.d", "Aspirin 75 mg"]);
    }

    #[test]
    fn splits_on_plus() {
        let tokens = segment("Paracetamol + Ibuprofen");
        assert_eq!(texts(&tokens), vec!["Paracetamol", "Ibuprofen"]);
    }

    #[test]
    fn posology_after_comma_continues_previous_mention() {
        let input = "Paracetamol 500 mg, three times daily";
        let tokens = segment(input);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw_text, input);
        assert_eq!(tokens[0].span(), 0..input.len());
        assert_eq!(tokens[0].category_guess, TokenCategory::DrugMention);
    }

    #[test]
    fn posology_on_new_line_stands_alone() {
        let tokens = segment("Paracetamol\n500 mg");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn classification() {
        let tokens = segment("headache; 12345; Ibuprofen 400 mg");
        let categories: Vec<TokenCategory> = tokens.iter().map(|t| t.category_guess).collect();
        assert_eq!(
            categories,
            vec![
                TokenCategory::Phrase,
                TokenCategory::Unknown,
                TokenCategory::DrugMention
            ]
        );
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(segment("").is_empty());
        assert!(segment("  \n ; , ").is_empty());
    }

    #[test]
    fn parses_full_mention() {
        let parts = parse_drug_mention("Paracetamol 500mg three times daily");
        assert_eq!(parts.name, "Paracetamol");
        assert_eq!(parts.dose, Some(500.0));
        assert_eq!(parts.unit.as_deref(), Some("mg"));
        assert_eq!(parts.frequency.as_deref(), Some("three times daily"));
        assert_eq!(parts.route, None);
    }

    #[test]
    fn strips_filler_and_form() {
        let parts = parse_drug_mention("Takes metformin tablets 500 mg b.i.d. orally");
        assert_eq!(parts.name, "metformin");
        assert_eq!(parts.form.as_deref(), Some("tablet"));
        assert_eq!(parts.frequency.as_deref(), Some("twice daily"));
        assert_eq!(parts.route.as_deref(), Some("oral"));
    }

    #[test]
    fn name_after_leading_route_verb() {
        let parts = parse_drug_mention("Apply betamethasone cream twice daily");
        assert_eq!(parts.name, "betamethasone");
        assert_eq!(parts.form.as_deref(), Some("cream"));
        assert_eq!(parts.route.as_deref(), Some("topical"));
    }

    #[test]
    fn name_after_leading_dose() {
        let parts = parse_drug_mention("2 puffs of salbutamol as needed");
        assert_eq!(parts.name, "salbutamol");
        assert_eq!(parts.unit.as_deref(), Some("puff"));
        assert_eq!(parts.frequency.as_deref(), Some("as needed"));
    }

    #[test]
    fn multi_word_name() {
        let parts = parse_drug_mention("Insulin glargine 10 units at bedtime");
        assert_eq!(parts.name, "Insulin glargine");
        assert_eq!(parts.unit.as_deref(), Some("IU"));
        assert_eq!(parts.frequency.as_deref(), Some("at bedtime"));
    }

    #[test]
    fn decimal_comma_dose() {
        let parts = parse_drug_mention("Levothyroxine 0,5 mg");
        assert_eq!(parts.dose, Some(0.5));
    }

    #[test]
    fn posology_without_name() {
        let parts = parse_drug_mention("500 mg twice daily");
        assert!(parts.name.is_empty());
        assert!(parts.has_posology());
    }

    #[test]
    fn bare_name() {
        let parts = parse_drug_mention("Doliprane");
        assert_eq!(parts.name, "Doliprane");
        assert!(!parts.has_posology());
    }
}
