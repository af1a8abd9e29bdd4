//! Medication list normalization: one mention in, one `MedicationEntry` out.
//!
//! Every mention yields an entry, including mentions whose name cannot be
//! resolved or is missing entirely. Those are kept unvalidated so nothing a
//! clinician wrote disappears from the list.

use crate::config::NormalizerConfig;
use crate::models::{
    ConsultationType, MedicationEntry, MedicationMention, NormalizedTerm, PosologyField,
    ResolutionMethod, StructuredMention, TermCategory,
};
use crate::reference::{check_dose_plausibility, PosologyTable, ReferenceTables};

use super::dosing::{normalize_frequency, normalize_route, normalize_unit, parse_dose};
use super::normalizer::TermNormalizer;
use super::tokenizer::{parse_drug_mention, DrugMentionParts};

/// An entry together with the term resolution behind its name.
#[derive(Debug, Clone)]
pub struct NormalizedMedication {
    pub entry: MedicationEntry,
    pub term: NormalizedTerm,
}

#[derive(Debug, Clone)]
pub struct MedicationNormalizer<'a> {
    terms: TermNormalizer<'a>,
    posology: &'a PosologyTable,
}

impl<'a> MedicationNormalizer<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self::with_config(tables, NormalizerConfig::default())
    }

    pub fn with_config(tables: &'a ReferenceTables, config: NormalizerConfig) -> Self {
        Self {
            terms: TermNormalizer::with_config(&tables.lexicon, config),
            posology: &tables.posology,
        }
    }

    pub fn normalize_medication(
        &self,
        mention: &MedicationMention,
        consultation_type: ConsultationType,
    ) -> MedicationEntry {
        self.normalize_mention(mention, consultation_type).entry
    }

    pub fn normalize_mention(
        &self,
        mention: &MedicationMention,
        consultation_type: ConsultationType,
    ) -> NormalizedMedication {
        let (parts, confirmed, mention_text) = match mention {
            MedicationMention::Text(text) => {
                (parse_drug_mention(text.trim()), false, text.trim().to_string())
            }
            MedicationMention::Structured(m) => (structured_parts(m), m.confirmed, structured_text(m)),
        };

        let term = if parts.name.is_empty() {
            NormalizedTerm::unresolved(&mention_text, TermCategory::Drug, None)
        } else {
            self.terms.normalize_text(&parts.name, TermCategory::Drug)
        };
        let raw_name = if parts.name.is_empty() {
            mention_text
        } else {
            parts.name.clone()
        };

        let resolved = term.is_resolved();
        let canonical_name = if resolved {
            term.canonical_text.clone()
        } else {
            raw_name.clone()
        };
        let record = resolved
            .then(|| self.posology.find(&canonical_name))
            .flatten();

        let mut entry = MedicationEntry {
            raw_name,
            canonical_name,
            dose: parts.dose,
            unit: parts.unit,
            frequency: parts.frequency,
            route: parts.route,
            form: parts.form,
            posology_ref: record.map(|r| r.canonical_name.clone()),
            validated: resolved && (record.is_some() || confirmed),
            origins: vec![consultation_type],
            resolution: term.resolution_method,
            confidence: term.confidence,
            defaults_applied: Vec::new(),
            plausibility: None,
        };

        if let Some(record) = record {
            if entry.dose.is_none() {
                entry.dose = Some(record.default_dose);
                entry.unit = Some(record.unit.clone());
                entry.defaults_applied.push(PosologyField::Dose);
            } else if entry.unit.is_none() {
                entry.unit = Some(record.unit.clone());
            }
            if entry.frequency.is_none() {
                if let Some(freq) = record.default_frequency() {
                    entry.frequency = Some(freq.to_string());
                    entry.defaults_applied.push(PosologyField::Frequency);
                }
            }
            if entry.route.is_none() {
                entry.route = Some(record.route.clone());
                entry.defaults_applied.push(PosologyField::Route);
            }

            if !entry.defaults_applied.contains(&PosologyField::Dose) {
                if let (Some(dose), Some(unit)) = (entry.dose, entry.unit.as_deref()) {
                    entry.plausibility = Some(check_dose_plausibility(
                        record,
                        dose,
                        unit,
                        entry.frequency.as_deref(),
                    ));
                }
            }
        }

        if term.resolution_method == ResolutionMethod::Unresolved {
            tracing::debug!(
                raw_name = %entry.raw_name,
                consultation_type = %consultation_type,
                "Medication name unresolved"
            );
        } else {
            tracing::debug!(
                raw_name = %entry.raw_name,
                canonical = %entry.canonical_name,
                method = %term.resolution_method,
                validated = entry.validated,
                "Medication normalized"
            );
        }

        NormalizedMedication { entry, term }
    }
}

/// Fields of a structured mention. The name itself may still carry posology
/// ("Doliprane 500 mg"), which fills any field left empty.
fn structured_parts(mention: &StructuredMention) -> DrugMentionParts {
    let from_name = parse_drug_mention(mention.name.trim());

    let (dose, unit) = match mention.dose.as_deref().and_then(parse_dose) {
        Some((value, unit)) => (Some(value), unit.map(|u| normalize_unit(&u))),
        None => (from_name.dose, from_name.unit),
    };

    let canonical_or_raw = |value: &Option<String>, normalize: fn(&str) -> Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| normalize(v).unwrap_or_else(|| v.to_string()))
    };

    DrugMentionParts {
        name: from_name.name,
        dose,
        unit,
        frequency: canonical_or_raw(&mention.frequency, normalize_frequency)
            .or(from_name.frequency),
        route: canonical_or_raw(&mention.route, normalize_route).or(from_name.route),
        form: from_name.form,
    }
}

/// The structured fields joined back into one mention string.
fn structured_text(mention: &StructuredMention) -> String {
    [
        Some(mention.name.as_str()),
        mention.dose.as_deref(),
        mention.frequency.as_deref(),
        mention.route.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
