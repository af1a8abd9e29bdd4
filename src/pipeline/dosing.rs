//! Dosing vocabulary: dose quantities, units, frequencies and routes.
//!
//! Every pattern is compiled once. Matching is case-insensitive and reports
//! byte spans so the segmenter can cut a mention into name and posology.

use std::sync::LazyLock;

use regex::Regex;

/// A recognised phrase and where it sits in the scanned text.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub canonical: String,
    pub start: usize,
    pub end: usize,
}

/// A dose quantity and where it sits in the scanned text.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseMatch {
    pub value: f64,
    pub unit: String,
    pub start: usize,
    pub end: usize,
}

// ═══════════════════════════════════════════
// Doses and units
// ═══════════════════════════════════════════

static RE_DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?)\s*((?:milligrams?|micrograms?|millilit(?:er|re)s?|grams?|mcg|mg|µg|ug|ml|iu|ui|units?|tablets?|tabs?|capsules?|caps?|puffs?|drops?|g)\b|%)",
    )
    .unwrap()
});

static RE_BARE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)?)\s*$").unwrap());

/// Canonical spelling of a dose unit.
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.trim().to_lowercase();
    match lower.as_str() {
        "milligram" | "milligrams" | "mg" => "mg".into(),
        "microgram" | "micrograms" | "mcg" | "µg" | "ug" => "mcg".into(),
        "gram" | "grams" | "g" => "g".into(),
        "milliliter" | "milliliters" | "millilitre" | "millilitres" | "ml" => "mL".into(),
        "iu" | "ui" | "unit" | "units" => "IU".into(),
        "tablet" | "tablets" | "tab" | "tabs" => "tablet".into(),
        "capsule" | "capsules" | "cap" | "caps" => "capsule".into(),
        "puff" | "puffs" => "puff".into(),
        "drop" | "drops" => "drop".into(),
        _ => lower,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

/// Find the first dose quantity with a unit ("500mg", "0,5 g", "2 puffs").
pub fn find_dose(text: &str) -> Option<DoseMatch> {
    let caps = RE_DOSE.captures(text)?;
    let whole = caps.get(0)?;
    Some(DoseMatch {
        value: parse_number(caps.get(1)?.as_str())?,
        unit: normalize_unit(caps.get(2)?.as_str()),
        start: whole.start(),
        end: whole.end(),
    })
}

/// Parse a dose string into value and unit.
/// Handles: "500mg", "1 g", "0,5 mg", "100 micrograms", and a bare "500".
pub fn parse_dose(dose: &str) -> Option<(f64, Option<String>)> {
    if let Some(found) = find_dose(dose) {
        return Some((found.value, Some(found.unit)));
    }
    let caps = RE_BARE_NUMBER.captures(dose)?;
    parse_number(caps.get(1)?.as_str()).map(|v| (v, None))
}

fn mass_factor_mg(unit: &str) -> Option<f64> {
    match normalize_unit(unit).as_str() {
        "mg" => Some(1.0),
        "g" => Some(1000.0),
        "mcg" => Some(0.001),
        _ => None,
    }
}

/// Convert a dose between units. Mass units convert into each other; any other
/// unit only "converts" to itself.
pub fn convert_dose(value: f64, from: &str, to: &str) -> Option<f64> {
    match (mass_factor_mg(from), mass_factor_mg(to)) {
        (Some(f), Some(t)) => Some(value * f / t),
        _ if normalize_unit(from) == normalize_unit(to) => Some(value),
        _ => None,
    }
}

// ═══════════════════════════════════════════
// Frequencies
// ═══════════════════════════════════════════

pub const ONCE_DAILY: &str = "once daily";
pub const TWICE_DAILY: &str = "twice daily";
pub const THREE_TIMES_DAILY: &str = "three times daily";
pub const FOUR_TIMES_DAILY: &str = "four times daily";
pub const AT_BEDTIME: &str = "at bedtime";
pub const EVERY_MORNING: &str = "every morning";
pub const ONCE_WEEKLY: &str = "once weekly";
pub const AS_NEEDED: &str = "as needed";

/// Ordered by priority: on an identical span the earlier pattern wins.
static FREQUENCY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\b(?:twice\s+(?:a\s+|per\s+)?(?:day|daily)\b|two\s+times\s+(?:a\s+|per\s+)?(?:day|daily)\b|2\s*(?:x|times)\s*(?:/\s*|a\s+|per\s+)?(?:day|daily|d)\b|b\.?i\.?d\b\.?|every\s+12\s*h(?:ours?|rs?)?\b|q\.?\s*12\s*h\b)",
            TWICE_DAILY,
        ),
        (
            r"(?i)\b(?:three\s+times\s+(?:a\s+|per\s+)?(?:day|daily)\b|3\s*(?:x|times)\s*(?:/\s*|a\s+|per\s+)?(?:day|daily|d)\b|t\.?i\.?d\b\.?|every\s+8\s*h(?:ours?|rs?)?\b|q\.?\s*8\s*h\b)",
            THREE_TIMES_DAILY,
        ),
        (
            r"(?i)\b(?:four\s+times\s+(?:a\s+|per\s+)?(?:day|daily)\b|4\s*(?:x|times)\s*(?:/\s*|a\s+|per\s+)?(?:day|daily|d)\b|q\.?i\.?d\b\.?|every\s+6\s*h(?:ours?|rs?)?\b|q\.?\s*6\s*h\b)",
            FOUR_TIMES_DAILY,
        ),
        (
            r"(?i)\b(?:once\s+(?:a\s+|per\s+)?week\b|once\s+weekly\b|weekly\b|every\s+week\b)",
            ONCE_WEEKLY,
        ),
        (
            r"(?i)\b(?:once\s+(?:a\s+|per\s+)?(?:day|daily)\b|one\s+time\s+(?:a\s+|per\s+)?(?:day|daily)\b|1\s*(?:x|time)\s*(?:/\s*|a\s+|per\s+)?(?:day|daily|d)\b|every\s+day\b|daily\b|q\.?d\b\.?|o\.?d\b\.?|every\s+24\s*h(?:ours?|rs?)?\b|q\.?\s*24\s*h\b)",
            ONCE_DAILY,
        ),
        (
            r"(?i)\b(?:at\s+bedtime\b|at\s+night\b|nightly\b|every\s+night\b|before\s+bed\b|q\.?h\.?s\b\.?)",
            AT_BEDTIME,
        ),
        (
            r"(?i)\b(?:every\s+morning\b|each\s+morning\b|in\s+the\s+morning\b|q\.?a\.?m\b\.?)",
            EVERY_MORNING,
        ),
        (
            r"(?i)\b(?:as\s+needed\b|as\s+required\b|when\s+needed\b|when\s+required\b|if\s+needed\b|on\s+demand\b|p\.?r\.?n\b\.?)",
            AS_NEEDED,
        ),
    ]
    .into_iter()
    .map(|(pattern, canonical)| (Regex::new(pattern).unwrap(), canonical))
    .collect()
});

static RE_EVERY_N_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:every\s+(\d{1,2})\s*h(?:ours?|rs?)?\b|q\.?\s*(\d{1,2})\s*h\b)").unwrap()
});

/// Earliest match wins; on the same start the longer match, then the higher-priority pattern.
fn earliest<'a>(
    candidates: impl Iterator<Item = (usize, usize, &'a str)>,
) -> Option<(usize, usize, &'a str)> {
    candidates
        .enumerate()
        .min_by_key(|(priority, (start, end, _))| (*start, std::cmp::Reverse(*end), *priority))
        .map(|(_, found)| found)
}

/// Find the first frequency phrase and its canonical form.
pub fn find_frequency(text: &str) -> Option<PhraseMatch> {
    let fixed = FREQUENCY_PATTERNS.iter().filter_map(|(re, canonical)| {
        re.find(text).map(|m| (m.start(), m.end(), *canonical))
    });
    let mut best = earliest(fixed).map(|(start, end, canonical)| PhraseMatch {
        canonical: canonical.to_string(),
        start,
        end,
    });

    if let Some(caps) = RE_EVERY_N_HOURS.captures(text) {
        let whole = caps.get(0)?;
        let hours = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let beats_fixed = best
            .as_ref()
            .map_or(true, |b| whole.start() < b.start || (whole.start() == b.start && whole.end() > b.end));
        if beats_fixed {
            best = Some(PhraseMatch {
                canonical: every_n_hours(hours),
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    best
}

fn every_n_hours(hours: &str) -> String {
    match hours.parse::<u32>() {
        Ok(24) => ONCE_DAILY.into(),
        Ok(12) => TWICE_DAILY.into(),
        Ok(8) => THREE_TIMES_DAILY.into(),
        Ok(6) => FOUR_TIMES_DAILY.into(),
        Ok(1) => "every 1 hour".into(),
        Ok(n) => format!("every {n} hours"),
        Err(_) => format!("every {hours} hours"),
    }
}

/// Canonical frequency phrase for a free-form frequency, if one is recognised.
pub fn normalize_frequency(freq: &str) -> Option<String> {
    find_frequency(freq).map(|m| m.canonical)
}

/// Doses per day for a canonical frequency. `None` for "as needed" and unknown.
pub fn frequency_to_daily_multiplier(freq: &str) -> Option<f64> {
    let canonical = normalize_frequency(freq)?;
    match canonical.as_str() {
        ONCE_DAILY | AT_BEDTIME | EVERY_MORNING => Some(1.0),
        TWICE_DAILY => Some(2.0),
        THREE_TIMES_DAILY => Some(3.0),
        FOUR_TIMES_DAILY => Some(4.0),
        ONCE_WEEKLY => Some(1.0 / 7.0),
        AS_NEEDED => None,
        other => {
            let hours: f64 = other
                .strip_prefix("every ")?
                .split_whitespace()
                .next()?
                .parse()
                .ok()?;
            (hours > 0.0).then(|| 24.0 / hours)
        }
    }
}

// ═══════════════════════════════════════════
// Routes
// ═══════════════════════════════════════════

static ROUTE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:orally\b|oral\b|by\s+mouth\b|per\s+os\b|p\.?o\b\.?)", "oral"),
        (
            r"(?i)\b(?:topically\b|topical\b|cutaneous\b|(?:to|on)\s+the\s+(?:skin|affected\s+areas?)\b|apply\b|applied\b)",
            "topical",
        ),
        (r"(?i)\b(?:intravenous(?:ly)?\b|i\.?v\b\.?)", "intravenous"),
        (r"(?i)\b(?:intramuscular(?:ly)?\b|i\.?m\b\.?)", "intramuscular"),
        (
            r"(?i)\b(?:subcutaneous(?:ly)?\b|subcut\b|s\.?c\b\.?|s\.?q\b\.?)",
            "subcutaneous",
        ),
        (r"(?i)\b(?:inhaled\b|by\s+inhalation\b|inhalation\b)", "inhaled"),
        (r"(?i)\b(?:sublingual(?:ly)?\b|under\s+the\s+tongue\b)", "sublingual"),
        (r"(?i)\b(?:rectal(?:ly)?\b|per\s+rectum\b)", "rectal"),
        (
            r"(?i)\b(?:ophthalmic\b|in\s+(?:the\s+|each\s+|both\s+)?eyes?\b)",
            "ophthalmic",
        ),
    ]
    .into_iter()
    .map(|(pattern, canonical)| (Regex::new(pattern).unwrap(), canonical))
    .collect()
});

/// Find the first route phrase and its canonical form.
pub fn find_route(text: &str) -> Option<PhraseMatch> {
    let found = ROUTE_PATTERNS
        .iter()
        .filter_map(|(re, canonical)| re.find(text).map(|m| (m.start(), m.end(), *canonical)));
    earliest(found).map(|(start, end, canonical)| PhraseMatch {
        canonical: canonical.to_string(),
        start,
        end,
    })
}

/// Canonical route for a free-form route, if one is recognised.
pub fn normalize_route(route: &str) -> Option<String> {
    find_route(route).map(|m| m.canonical)
}
