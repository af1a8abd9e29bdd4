//! Consultation record shapes as they arrive from record ingestion.
//!
//! Each consultation type stores its current medications under a different
//! field. The adapters in `pipeline::adapters` turn every variant into a
//! `CommonRecord` so the extractor never looks at the variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::ConsultationType;

/// A mention given as separate fields instead of a sentence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredMention {
    pub name: String,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    /// Clinician confirmed the medication; validates it even without posology.
    #[serde(default)]
    pub confirmed: bool,
}

/// One medication mention in the common record shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MedicationMention {
    Text(String),
    Structured(StructuredMention),
}

impl MedicationMention {
    pub fn text(s: &str) -> Self {
        Self::Text(s.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(m) => m.name.trim().is_empty(),
        }
    }
}

/// One element of a list-shaped medication field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MentionItem {
    Mention(MedicationMention),
    /// Neither text nor a structured mention; skipped by the adapter.
    Invalid(Value),
}

impl From<MedicationMention> for MentionItem {
    fn from(mention: MedicationMention) -> Self {
        Self::Mention(mention)
    }
}

/// Raw medication field: free text, a list, or something unexpected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MentionField {
    Text(String),
    List(Vec<MentionItem>),
    /// Kept so one bad field cannot fail the whole record; the adapter skips it.
    Other(Value),
}

impl MentionField {
    pub fn list(mentions: impl IntoIterator<Item = MedicationMention>) -> Self {
        Self::List(mentions.into_iter().map(MentionItem::from).collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalConsultation {
    #[serde(default)]
    pub consultation_id: Option<Uuid>,
    #[serde(default)]
    pub current_medications: Option<MentionField>,
    /// Non-medication sections, passed through untouched.
    #[serde(default)]
    pub sections: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DermatologyConsultation {
    #[serde(default)]
    pub consultation_id: Option<Uuid>,
    #[serde(default)]
    pub treatments: Option<MentionField>,
    #[serde(default)]
    pub sections: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChronicConsultation {
    #[serde(default)]
    pub consultation_id: Option<Uuid>,
    #[serde(default)]
    pub long_term_treatments: Option<MentionField>,
    #[serde(default)]
    pub ongoing_medications: Option<MentionField>,
    #[serde(default)]
    pub sections: Value,
}

/// A diagnosis record of any consultation type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "consultation_type", rename_all = "snake_case")]
pub enum ConsultationRecord {
    Normal(NormalConsultation),
    Dermatology(DermatologyConsultation),
    Chronic(ChronicConsultation),
}

impl ConsultationRecord {
    pub fn consultation_type(&self) -> ConsultationType {
        match self {
            Self::Normal(_) => ConsultationType::Normal,
            Self::Dermatology(_) => ConsultationType::Dermatology,
            Self::Chronic(_) => ConsultationType::Chronic,
        }
    }

    pub fn consultation_id(&self) -> Option<Uuid> {
        match self {
            Self::Normal(r) => r.consultation_id,
            Self::Dermatology(r) => r.consultation_id,
            Self::Chronic(r) => r.consultation_id,
        }
    }

    /// Build a record of the given type whose medication field holds `text`.
    pub fn with_text(consultation_type: ConsultationType, text: &str) -> Self {
        let field = Some(MentionField::Text(text.into()));
        match consultation_type {
            ConsultationType::Normal => Self::Normal(NormalConsultation {
                current_medications: field,
                ..Default::default()
            }),
            ConsultationType::Dermatology => Self::Dermatology(DermatologyConsultation {
                treatments: field,
                ..Default::default()
            }),
            ConsultationType::Chronic => Self::Chronic(ChronicConsultation {
                long_term_treatments: field,
                ..Default::default()
            }),
        }
    }
}

/// A field or list item the adapter could not read. The rest of the record
/// is still used.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    /// Field name, with `[i]` appended for list items.
    pub field: String,
    pub reason: String,
}

/// The single shape the extractor consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonRecord {
    pub consultation_type: ConsultationType,
    pub consultation_id: Option<Uuid>,
    pub mentions: Vec<MedicationMention>,
    pub skipped: Vec<SkippedField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_each_consultation_type() {
        let normal: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "normal",
            "current_medications": "Paracetamol 500mg"
        }))
        .unwrap();
        assert_eq!(normal.consultation_type(), ConsultationType::Normal);

        let derm: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "dermatology",
            "treatments": ["Betamethasone cream twice daily"]
        }))
        .unwrap();
        assert_eq!(derm.consultation_type(), ConsultationType::Dermatology);

        let chronic: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "chronic",
            "consultation_id": "6f1c2b0e-1f7a-4c43-9d59-2a3f4c1d8e77",
            "ongoing_medications": [{"name": "Metformin", "dose": "850 mg"}]
        }))
        .unwrap();
        assert_eq!(chronic.consultation_type(), ConsultationType::Chronic);
        assert!(chronic.consultation_id().is_some());
    }

    #[test]
    fn unexpected_field_shape_is_kept_as_other() {
        let record: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "normal",
            "current_medications": 42
        }))
        .unwrap();
        match record {
            ConsultationRecord::Normal(n) => {
                assert!(matches!(n.current_medications, Some(MentionField::Other(_))))
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn bad_list_items_do_not_spoil_the_list() {
        let record: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "normal",
            "current_medications": ["Paracetamol 500mg", {"dose": "400 mg"}, 7, {"name": "Aspirin"}]
        }))
        .unwrap();
        let items = match record {
            ConsultationRecord::Normal(NormalConsultation {
                current_medications: Some(MentionField::List(items)),
                ..
            }) => items,
            other => panic!("expected a list field, got {other:?}"),
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], MentionItem::Mention(MedicationMention::text("Paracetamol 500mg")));
        assert!(matches!(items[1], MentionItem::Invalid(_)));
        assert!(matches!(items[2], MentionItem::Invalid(_)));
        assert!(matches!(items[3], MentionItem::Mention(MedicationMention::Structured(_))));
    }

    #[test]
    fn sections_of_any_shape_are_accepted() {
        let record: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "chronic",
            "sections": "free-text notes",
            "long_term_treatments": "Metformin"
        }))
        .unwrap();
        match record {
            ConsultationRecord::Chronic(c) => assert_eq!(c.sections, "free-text notes"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn null_field_is_absent() {
        let record: ConsultationRecord = serde_json::from_value(serde_json::json!({
            "consultation_type": "dermatology",
            "treatments": null
        }))
        .unwrap();
        match record {
            ConsultationRecord::Dermatology(d) => assert!(d.treatments.is_none()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn structured_mention_defaults() {
        let mention: MedicationMention =
            serde_json::from_value(serde_json::json!({"name": "Ibuprofen"})).unwrap();
        match mention {
            MedicationMention::Structured(m) => {
                assert_eq!(m.name, "Ibuprofen");
                assert!(!m.confirmed);
                assert!(m.dose.is_none());
            }
            MedicationMention::Text(_) => panic!("expected structured mention"),
        }
    }

    #[test]
    fn blank_mentions() {
        assert!(MedicationMention::text("   ").is_blank());
        assert!(!MedicationMention::text("Aspirin").is_blank());
    }
}
