//! Current-medication extraction across consultation records.
//!
//! Records of every consultation type are adapted to `CommonRecord`, each
//! mention is normalized, and identical medications are merged into one
//! entry. A malformed record is skipped with a warning; it never aborts the
//! run and never drops the other records.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;

use crate::config::NormalizerConfig;
use crate::models::{
    CommonRecord, ConsultationRecord, ConsultationType, MedicationEntry, NormalizationResult,
    PipelineWarning, PosologyField, TermCategory, UnresolvedTermReport,
};
use crate::reference::{fold_key, ReferenceTables};
use crate::trace::new_trace_id;

use super::adapters::{adapt, adapt_value, MalformedRecordError};
use super::medication::{MedicationNormalizer, NormalizedMedication};

const TRACE_PREFIX: &str = "medx";

type AdaptedRecord = (Option<ConsultationType>, Result<CommonRecord, MalformedRecordError>);

#[derive(Debug, Clone)]
pub struct MedicationExtractor<'a> {
    medications: MedicationNormalizer<'a>,
}

impl<'a> MedicationExtractor<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self::with_config(tables, NormalizerConfig::default())
    }

    pub fn with_config(tables: &'a ReferenceTables, config: NormalizerConfig) -> Self {
        Self {
            medications: MedicationNormalizer::with_config(tables, config),
        }
    }

    /// Extract the merged current-medication list from typed records.
    pub fn extract_current_medications(&self, records: &[ConsultationRecord]) -> NormalizationResult {
        self.run(
            records
                .iter()
                .map(|record| (Some(record.consultation_type()), Ok(adapt(record)))),
        )
    }

    /// Extract from raw JSON records. Records that are not recognisable
    /// consultation records become `MalformedRecord` warnings; unreadable
    /// fields inside a recognised record become `MalformedField` warnings.
    pub fn extract_from_values(&self, values: &[Value]) -> NormalizationResult {
        self.run(values.iter().map(|value| (type_hint(value), adapt_value(value))))
    }

    fn run(&self, records: impl ExactSizeIterator<Item = AdaptedRecord>) -> NormalizationResult {
        let trace_id = new_trace_id(TRACE_PREFIX);
        let span = tracing::info_span!("extract_medications", trace_id = %trace_id);
        let _guard = span.enter();

        tracing::info!(records = records.len(), "Medication extraction started");

        let mut merger = MedicationMerger::default();
        let mut unresolved = Vec::new();
        let mut warnings = Vec::new();
        let mut mention_count = 0usize;

        for (record_index, (consultation_type, adapted)) in records.enumerate() {
            let common = match adapted {
                Ok(common) => common,
                Err(e) => {
                    tracing::warn!(
                        record_index,
                        consultation_type = ?consultation_type,
                        error = %e,
                        "Skipping malformed consultation record"
                    );
                    warnings.push(PipelineWarning::MalformedRecord {
                        record_index,
                        consultation_type,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for skipped in common.skipped {
                tracing::warn!(
                    record_index,
                    field = %skipped.field,
                    reason = %skipped.reason,
                    "Skipping unreadable medication field"
                );
                warnings.push(PipelineWarning::MalformedField {
                    record_index,
                    consultation_type: Some(common.consultation_type),
                    field: skipped.field,
                    reason: skipped.reason,
                });
            }

            for mention in &common.mentions {
                mention_count += 1;
                let NormalizedMedication { entry, term } = self
                    .medications
                    .normalize_mention(mention, common.consultation_type);

                if !term.is_resolved() {
                    let report = UnresolvedTermReport {
                        original_text: term.original_text.clone(),
                        category: TermCategory::Drug,
                        best_candidate: term.best_candidate.clone(),
                        distance: term.distance,
                        consultation_type: Some(common.consultation_type),
                        consultation_id: common.consultation_id,
                    };
                    warnings.push(PipelineWarning::UnresolvedTerm(report.clone()));
                    unresolved.push(report);
                }

                if let Some(message) = entry
                    .plausibility
                    .as_ref()
                    .and_then(|check| check.result.message())
                {
                    tracing::warn!(
                        record_index,
                        medication = %entry.canonical_name,
                        "Implausible dose: {}",
                        message
                    );
                    warnings.push(PipelineWarning::ImplausibleDose {
                        canonical_name: entry.canonical_name.clone(),
                        message: message.to_string(),
                    });
                }

                merger.add(entry);
            }
        }

        let medications = merger.into_entries();
        tracing::info!(
            mentions = mention_count,
            medications = medications.len(),
            unresolved = unresolved.len(),
            warnings = warnings.len(),
            "Medication extraction complete"
        );

        NormalizationResult {
            trace_id,
            generated_at: Utc::now(),
            medications,
            unresolved,
            warnings,
        }
    }
}

/// Best-effort consultation type of a raw record, for warnings only.
fn type_hint(value: &Value) -> Option<ConsultationType> {
    value
        .get("consultation_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

// ═══════════════════════════════════════════════════════════════════════════
// Merging
// ═══════════════════════════════════════════════════════════════════════════

/// (folded canonical name, dose bits, folded unit, folded route)
type MergeKey = (String, Option<u64>, Option<String>, Option<String>);

fn merge_key(entry: &MedicationEntry) -> MergeKey {
    (
        fold_key(&entry.canonical_name),
        // +0.0 so that -0.0 and 0.0 share a key
        entry.dose.map(|d| (d + 0.0).to_bits()),
        entry.unit.as_deref().map(fold_key),
        entry.route.as_deref().map(fold_key),
    )
}

/// Collapses entries with the same key, keeping first-seen order.
#[derive(Debug, Default)]
struct MedicationMerger {
    entries: Vec<MedicationEntry>,
    /// Confidence of the entry each merged frequency came from.
    frequency_confidence: Vec<f64>,
    index: HashMap<MergeKey, usize>,
}

impl MedicationMerger {
    fn add(&mut self, entry: MedicationEntry) {
        let key = merge_key(&entry);
        match self.index.get(&key) {
            Some(&idx) => merge_into(
                &mut self.entries[idx],
                &mut self.frequency_confidence[idx],
                entry,
            ),
            None => {
                self.index.insert(key, self.entries.len());
                self.frequency_confidence.push(entry.confidence);
                self.entries.push(entry);
            }
        }
    }

    fn into_entries(self) -> Vec<MedicationEntry> {
        self.entries
    }
}

/// A frequency filled from posology defaults counts as absent.
fn explicit_frequency(entry: &MedicationEntry) -> Option<&str> {
    if entry.defaults_applied.contains(&PosologyField::Frequency) {
        None
    } else {
        entry.frequency.as_deref()
    }
}

fn merge_into(existing: &mut MedicationEntry, frequency_confidence: &mut f64, incoming: MedicationEntry) {
    let take_frequency = match (explicit_frequency(existing), explicit_frequency(&incoming)) {
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a != b && incoming.confidence > *frequency_confidence,
        (_, None) => existing.frequency.is_none() && incoming.frequency.is_some(),
    };

    if take_frequency {
        existing.frequency = incoming.frequency.clone();
        *frequency_confidence = incoming.confidence;
        existing
            .defaults_applied
            .retain(|f| *f != PosologyField::Frequency);
        if incoming.defaults_applied.contains(&PosologyField::Frequency) {
            existing.defaults_applied.push(PosologyField::Frequency);
        }
    }

    if incoming.confidence > existing.confidence {
        existing.raw_name = incoming.raw_name;
        existing.resolution = incoming.resolution;
        existing.confidence = incoming.confidence;
    }

    existing.validated |= incoming.validated;
    for origin in incoming.origins {
        if !existing.origins.contains(&origin) {
            existing.origins.push(origin);
        }
    }
    if existing.form.is_none() {
        existing.form = incoming.form;
    }
    if existing.posology_ref.is_none() {
        existing.posology_ref = incoming.posology_ref;
    }
    if existing.plausibility.is_none() {
        existing.plausibility = incoming.plausibility;
    }
}
