//! Consultation adapters: one per record variant, each producing a `CommonRecord`.
//!
//! The extractor only ever sees `CommonRecord`, so adding a consultation type
//! means adding a variant and an adapter here, nothing else.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ChronicConsultation, CommonRecord, ConsultationRecord, ConsultationType,
    DermatologyConsultation, MedicationMention, MentionField, MentionItem, NormalConsultation,
    SkippedField, TokenCategory,
};
use crate::reference::fold_key;

use super::tokenizer::segment;

/// Field text meaning "no medications".
const EMPTY_MARKERS: &[&str] = &[
    "-", "aucun", "aucune", "n/a", "na", "néant", "nil", "no", "no current medication",
    "no current medications", "no medication", "no medications", "no treatment", "no treatments",
    "none",
];

/// A record the adapters cannot read. Scoped to that record only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecordError {
    #[error("Field '{field}' has an unexpected shape: {found}")]
    UnexpectedShape { field: String, found: String },

    #[error("Unknown consultation type: {0}")]
    UnknownConsultationType(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// A record variant that carries medication fields.
pub trait MedicationSource {
    const CONSULTATION_TYPE: ConsultationType;

    fn consultation_id(&self) -> Option<Uuid>;

    /// Medication fields in reading order, by field name.
    fn medication_fields(&self) -> Vec<(&'static str, Option<&MentionField>)>;
}

impl MedicationSource for NormalConsultation {
    const CONSULTATION_TYPE: ConsultationType = ConsultationType::Normal;

    fn consultation_id(&self) -> Option<Uuid> {
        self.consultation_id
    }

    fn medication_fields(&self) -> Vec<(&'static str, Option<&MentionField>)> {
        vec![("current_medications", self.current_medications.as_ref())]
    }
}

impl MedicationSource for DermatologyConsultation {
    const CONSULTATION_TYPE: ConsultationType = ConsultationType::Dermatology;

    fn consultation_id(&self) -> Option<Uuid> {
        self.consultation_id
    }

    fn medication_fields(&self) -> Vec<(&'static str, Option<&MentionField>)> {
        vec![("treatments", self.treatments.as_ref())]
    }
}

impl MedicationSource for ChronicConsultation {
    const CONSULTATION_TYPE: ConsultationType = ConsultationType::Chronic;

    fn consultation_id(&self) -> Option<Uuid> {
        self.consultation_id
    }

    fn medication_fields(&self) -> Vec<(&'static str, Option<&MentionField>)> {
        vec![
            ("long_term_treatments", self.long_term_treatments.as_ref()),
            ("ongoing_medications", self.ongoing_medications.as_ref()),
        ]
    }
}

/// Adapt any typed record. Unreadable fields are listed in `skipped`.
pub fn adapt(record: &ConsultationRecord) -> CommonRecord {
    match record {
        ConsultationRecord::Normal(r) => adapt_source(r),
        ConsultationRecord::Dermatology(r) => adapt_source(r),
        ConsultationRecord::Chronic(r) => adapt_source(r),
    }
}

/// Adapt a raw JSON record, checking its shape and `consultation_type` first.
///
/// Only a record that is not an object or has no known type fails; a bad
/// `consultation_id` is dropped and reported in `skipped`.
pub fn adapt_value(value: &Value) -> Result<CommonRecord, MalformedRecordError> {
    let (record, id_issue) = parse_parts(value)?;
    let mut common = adapt(&record);
    if let Some(issue) = id_issue {
        common.skipped.insert(0, issue);
    }
    Ok(common)
}

/// Parse a raw JSON record into its typed variant.
pub fn parse_record(value: &Value) -> Result<ConsultationRecord, MalformedRecordError> {
    parse_parts(value).map(|(record, _)| record)
}

fn parse_parts(value: &Value) -> Result<(ConsultationRecord, Option<SkippedField>), MalformedRecordError> {
    let object = value
        .as_object()
        .ok_or_else(|| MalformedRecordError::InvalidRecord(format!("expected object, found {}", describe(value))))?;

    match object.get("consultation_type") {
        Some(Value::String(kind)) => {
            ConsultationType::from_str(kind)
                .map_err(|_| MalformedRecordError::UnknownConsultationType(kind.clone()))?;
        }
        Some(other) => {
            return Err(MalformedRecordError::UnknownConsultationType(other.to_string()));
        }
        None => {
            return Err(MalformedRecordError::InvalidRecord(
                "missing consultation_type".into(),
            ));
        }
    }

    let mut object = object.clone();
    let id_issue = match object.get("consultation_id") {
        Some(raw) if !raw.is_null() && Uuid::deserialize(raw).is_err() => {
            let issue = SkippedField {
                field: "consultation_id".into(),
                reason: format!("not a UUID: {raw}"),
            };
            object.remove("consultation_id");
            Some(issue)
        }
        _ => None,
    };

    let record = serde_json::from_value(Value::Object(object))
        .map_err(|e| MalformedRecordError::InvalidRecord(e.to_string()))?;
    Ok((record, id_issue))
}

fn adapt_source<S: MedicationSource>(source: &S) -> CommonRecord {
    let mut mentions = Vec::new();
    let mut skipped = Vec::new();
    for (field, value) in source.medication_fields() {
        field_mentions(field, value, &mut mentions, &mut skipped);
    }

    CommonRecord {
        consultation_type: S::CONSULTATION_TYPE,
        consultation_id: source.consultation_id(),
        mentions,
        skipped,
    }
}

fn field_mentions(
    field: &str,
    value: Option<&MentionField>,
    mentions: &mut Vec<MedicationMention>,
    skipped: &mut Vec<SkippedField>,
) {
    match value {
        None | Some(MentionField::Other(Value::Null)) => {}
        Some(MentionField::Text(text)) => mentions.extend(split_text(text)),
        Some(MentionField::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    MentionItem::Mention(MedicationMention::Text(text)) => {
                        mentions.extend(split_text(text))
                    }
                    MentionItem::Mention(mention @ MedicationMention::Structured(m)) => {
                        let has_content = !mention.is_blank()
                            || m.dose.is_some()
                            || m.frequency.is_some()
                            || m.route.is_some();
                        if has_content {
                            mentions.push(mention.clone());
                        }
                    }
                    MentionItem::Invalid(other) => {
                        skipped.push(unexpected_shape(&format!("{field}[{i}]"), other))
                    }
                }
            }
        }
        Some(MentionField::Other(other)) => skipped.push(unexpected_shape(field, other)),
    }
}

fn unexpected_shape(field: &str, value: &Value) -> SkippedField {
    let error = MalformedRecordError::UnexpectedShape {
        field: field.to_string(),
        found: describe(value).to_string(),
    };
    SkippedField {
        field: field.to_string(),
        reason: error.to_string(),
    }
}

/// One mention per drug mention or phrase in free text.
fn split_text(text: &str) -> Vec<MedicationMention> {
    if is_empty_marker(text) {
        return Vec::new();
    }
    segment(text)
        .into_iter()
        .filter(|token| {
            let keep =
                token.category_guess != TokenCategory::Unknown && !is_empty_marker(&token.raw_text);
            if !keep {
                tracing::debug!(text = %token.raw_text, "Skipping non-medication token");
            }
            keep
        })
        .map(|token| MedicationMention::Text(token.raw_text))
        .collect()
}

fn is_empty_marker(text: &str) -> bool {
    let key = fold_key(text);
    key.is_empty() || EMPTY_MARKERS.contains(&key.as_str())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StructuredMention;
    use serde_json::json;

    fn texts(record: &CommonRecord) -> Vec<String> {
        record
            .mentions
            .iter()
            .map(|m| match m {
                MedicationMention::Text(t) => t.clone(),
                MedicationMention::Structured(s) => s.name.clone(),
            })
            .collect()
    }

    #[test]
    fn each_type_reads_its_own_field() {
        for kind in ConsultationType::all() {
            let record = ConsultationRecord::with_text(*kind, "Paracetamol 500 mg; Ibuprofen");
            let common = adapt(&record);
            assert_eq!(common.consultation_type, *kind);
            assert_eq!(texts(&common), vec!["Paracetamol 500 mg", "Ibuprofen"]);
        }
    }

    #[test]
    fn chronic_reads_both_fields_in_order() {
        let record = ConsultationRecord::Chronic(ChronicConsultation {
            long_term_treatments: Some(MentionField::Text("Metformin 500 mg".into())),
            ongoing_medications: Some(MentionField::list([MedicationMention::text("Ramipril")])),
            ..Default::default()
        });
        let common = adapt(&record);
        assert_eq!(texts(&common), vec!["Metformin 500 mg", "Ramipril"]);
    }

    #[test]
    fn absent_and_empty_fields_contribute_nothing() {
        for text in ["", "   ", "None", "n/a", "Aucun"] {
            let record = ConsultationRecord::with_text(ConsultationType::Normal, text);
            assert!(adapt(&record).mentions.is_empty(), "{text:?}");
        }
        let record = ConsultationRecord::Dermatology(DermatologyConsultation::default());
        assert!(adapt(&record).mentions.is_empty());
    }

    #[test]
    fn list_items_keep_structure() {
        let record = ConsultationRecord::Normal(NormalConsultation {
            current_medications: Some(MentionField::list([
                MedicationMention::Structured(StructuredMention {
                    name: "Doliprane".into(),
                    dose: Some("1 g".into()),
                    frequency: None,
                    route: None,
                    confirmed: true,
                }),
                MedicationMention::text("Aspirin 75 mg"),
                MedicationMention::text("  "),
            ])),
            ..Default::default()
        });
        let common = adapt(&record);
        assert_eq!(common.mentions.len(), 2);
        assert!(matches!(common.mentions[0], MedicationMention::Structured(_)));
        assert!(common.skipped.is_empty());
    }

    #[test]
    fn adapts_raw_json() {
        let id = Uuid::new_v4();
        let value = json!({
            "consultation_type": "dermatology",
            "consultation_id": id,
            "treatments": ["Betamethasone cream twice daily", {"name": "Doxycycline", "dose": "100 mg"}],
            "sections": {"examination": "erythematous plaques"}
        });
        let common = adapt_value(&value).unwrap();
        assert_eq!(common.consultation_type, ConsultationType::Dermatology);
        assert_eq!(common.consultation_id, Some(id));
        assert_eq!(common.mentions.len(), 2);
    }

    #[test]
    fn unexpected_field_shape_is_skipped() {
        let value = json!({"consultation_type": "normal", "current_medications": 42});
        let common = adapt_value(&value).unwrap();
        assert!(common.mentions.is_empty());
        assert_eq!(
            common.skipped,
            vec![SkippedField {
                field: "current_medications".into(),
                reason: "Field 'current_medications' has an unexpected shape: number".into(),
            }]
        );
    }

    #[test]
    fn one_bad_field_keeps_the_other() {
        let value = json!({
            "consultation_type": "chronic",
            "long_term_treatments": "Metformin 500 mg twice daily",
            "ongoing_medications": 42
        });
        let common = adapt_value(&value).unwrap();
        assert_eq!(texts(&common), vec!["Metformin 500 mg twice daily"]);
        assert_eq!(common.skipped.len(), 1);
        assert_eq!(common.skipped[0].field, "ongoing_medications");
    }

    #[test]
    fn bad_list_item_is_skipped_alone() {
        let value = json!({
            "consultation_type": "normal",
            "current_medications": ["Paracetamol 500mg three times daily", {"dose": "400 mg"}, null]
        });
        let common = adapt_value(&value).unwrap();
        assert_eq!(texts(&common), vec!["Paracetamol 500mg three times daily"]);
        let fields: Vec<&str> = common.skipped.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(fields, vec!["current_medications[1]", "current_medications[2]"]);
    }

    #[test]
    fn null_field_is_empty() {
        let value = json!({"consultation_type": "chronic", "long_term_treatments": null});
        assert!(adapt_value(&value).unwrap().mentions.is_empty());
    }

    #[test]
    fn unknown_consultation_type() {
        let value = json!({"consultation_type": "cardiology", "current_medications": "Aspirin"});
        assert_eq!(
            adapt_value(&value).unwrap_err(),
            MalformedRecordError::UnknownConsultationType("cardiology".into())
        );
    }

    #[test]
    fn non_object_and_untyped_records_are_invalid() {
        assert!(matches!(
            adapt_value(&json!("Paracetamol")),
            Err(MalformedRecordError::InvalidRecord(_))
        ));
        assert!(matches!(
            adapt_value(&json!({"current_medications": "Aspirin"})),
            Err(MalformedRecordError::InvalidRecord(_))
        ));
    }

    #[test]
    fn bad_consultation_id_keeps_medications() {
        let value = json!({
            "consultation_type": "normal",
            "consultation_id": "not-a-uuid",
            "current_medications": "Ibuprofen 400 mg"
        });
        let common = adapt_value(&value).unwrap();
        assert_eq!(common.consultation_id, None);
        assert_eq!(texts(&common), vec!["Ibuprofen 400 mg"]);
        assert_eq!(common.skipped[0].field, "consultation_id");
        assert!(parse_record(&value).is_ok());
    }

    #[test]
    fn non_object_sections_keep_medications() {
        let value = json!({
            "consultation_type": "dermatology",
            "sections": ["examination", "plan"],
            "treatments": "Betamethasone cream twice daily"
        });
        let common = adapt_value(&value).unwrap();
        assert_eq!(texts(&common), vec!["Betamethasone cream twice daily"]);
        assert!(common.skipped.is_empty());
    }
}
