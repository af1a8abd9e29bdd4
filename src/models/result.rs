use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ConsultationType, TermCategory};
use super::medication::MedicationEntry;

/// A term that could not be mapped, surfaced for clinician review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnresolvedTermReport {
    pub original_text: String,
    pub category: TermCategory,
    pub best_candidate: Option<String>,
    pub distance: Option<usize>,
    pub consultation_type: Option<ConsultationType>,
    pub consultation_id: Option<Uuid>,
}

/// Non-fatal conditions collected during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    UnresolvedTerm(UnresolvedTermReport),
    MalformedRecord {
        record_index: usize,
        consultation_type: Option<ConsultationType>,
        reason: String,
    },
    /// One field or list item was skipped; the rest of the record was used.
    MalformedField {
        record_index: usize,
        consultation_type: Option<ConsultationType>,
        field: String,
        reason: String,
    },
    ImplausibleDose {
        canonical_name: String,
        message: String,
    },
}

/// Output of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizationResult {
    pub trace_id: String,
    pub generated_at: DateTime<Utc>,
    pub medications: Vec<MedicationEntry>,
    pub unresolved: Vec<UnresolvedTermReport>,
    pub warnings: Vec<PipelineWarning>,
}

impl NormalizationResult {
    pub fn validated_count(&self) -> usize {
        self.medications.iter().filter(|m| m.validated).count()
    }

    pub fn malformed_record_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, PipelineWarning::MalformedRecord { .. }))
            .count()
    }

    pub fn malformed_field_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, PipelineWarning::MalformedField { .. }))
            .count()
    }
}
