pub mod adapters; // Consultation record → CommonRecord
pub mod dictation;
pub mod dosing; // Units, frequencies, routes
pub mod extractor;
pub mod medication;
pub mod normalizer;
pub mod tokenizer;

pub use adapters::{adapt, adapt_value, MalformedRecordError, MedicationSource};
pub use dictation::{DictationNormalizer, DictationResult};
pub use extractor::MedicationExtractor;
pub use medication::{MedicationNormalizer, NormalizedMedication};
pub use normalizer::TermNormalizer;
pub use tokenizer::{parse_drug_mention, segment, DrugMentionParts};
