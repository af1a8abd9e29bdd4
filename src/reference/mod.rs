//! Reference tables: the lexicon and the posology table.
//!
//! Both are built once at startup, validated, and then only ever borrowed.
//! A missing or corrupt table is a `ConfigurationError` and aborts startup;
//! nothing downstream can recover from it.

pub mod lexicon;
pub mod posology;

use std::path::Path;

use thiserror::Error;

use crate::config;
use crate::models::{LexiconEntry, PosologyRecord, TermCategory};

pub use lexicon::{fold_key, FuzzyCandidate, Lexicon};
pub use posology::{check_dose_plausibility, PosologyTable};

const BUNDLED_LEXICON: &str = include_str!("../../resources/lexicon.json");
const BUNDLED_POSOLOGY: &str = include_str!("../../resources/posology.json");

// ═══════════════════════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load reference data {0}: {1}")]
    ReferenceDataLoad(String, String),

    #[error("Failed to parse reference data {0}: {1}")]
    ReferenceDataParse(String, String),

    #[error("Lexicon entry '{source_term}' has an empty canonical term")]
    EmptyCanonicalTerm { source_term: String },

    #[error("Lexicon entry for '{canonical_term}' has an empty source term")]
    EmptySourceTerm { canonical_term: String },

    #[error("Term '{term}' ({category}) maps to both '{first}' and '{second}'")]
    ConflictingTerm {
        term: String,
        category: TermCategory,
        first: String,
        second: String,
    },

    #[error("Invalid posology record '{name}': {reason}")]
    InvalidPosology { name: String, reason: String },

    #[error("Duplicate posology record: {0}")]
    DuplicatePosology(String),

    #[error("Reference table is empty: {0}")]
    EmptyTable(String),

    #[error("Invalid setting {setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },
}

// ═══════════════════════════════════════════════════════════════════════════
// ReferenceTables
// ═══════════════════════════════════════════════════════════════════════════

/// Both reference tables, built together.
#[derive(Debug)]
pub struct ReferenceTables {
    pub lexicon: Lexicon,
    pub posology: PosologyTable,
}

impl ReferenceTables {
    pub fn new(lexicon: Lexicon, posology: PosologyTable) -> Self {
        let tables = Self { lexicon, posology };
        tables.warn_orphan_posology();
        tables
    }

    /// Parse both tables from JSON arrays.
    pub fn from_json(lexicon_json: &str, posology_json: &str) -> Result<Self, ConfigurationError> {
        let entries: Vec<LexiconEntry> = serde_json::from_str(lexicon_json).map_err(|e| {
            ConfigurationError::ReferenceDataParse(config::LEXICON_FILE.into(), e.to_string())
        })?;
        let records: Vec<PosologyRecord> = serde_json::from_str(posology_json).map_err(|e| {
            ConfigurationError::ReferenceDataParse(config::POSOLOGY_FILE.into(), e.to_string())
        })?;

        Ok(Self::new(
            Lexicon::from_entries(entries)?,
            PosologyTable::from_records(records)?,
        ))
    }

    /// Tables compiled into the crate.
    pub fn bundled() -> Result<Self, ConfigurationError> {
        Self::from_json(BUNDLED_LEXICON, BUNDLED_POSOLOGY)
    }

    /// Load `lexicon.json` and `posology.json` from a directory.
    pub fn load(resources_dir: &Path) -> Result<Self, ConfigurationError> {
        let read = |file: &str| {
            let path = resources_dir.join(file);
            std::fs::read_to_string(&path).map_err(|e| {
                ConfigurationError::ReferenceDataLoad(path.display().to_string(), e.to_string())
            })
        };

        let lexicon_json = read(config::LEXICON_FILE)?;
        let posology_json = read(config::POSOLOGY_FILE)?;
        let tables = Self::from_json(&lexicon_json, &posology_json)?;

        tracing::info!(
            dir = %resources_dir.display(),
            lexicon_entries = tables.lexicon.len(),
            posology_records = tables.posology.len(),
            "Reference tables loaded"
        );
        Ok(tables)
    }

    /// Load from the configured reference directory, or fall back to the bundled tables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        match config::reference_dir() {
            Some(dir) => Self::load(&dir),
            None => {
                tracing::debug!("No reference directory configured, using bundled tables");
                Self::bundled()
            }
        }
    }

    fn warn_orphan_posology(&self) {
        for name in self.posology.names() {
            if self.lexicon.lookup_exact(name, TermCategory::Drug).is_none() {
                tracing::warn!(
                    medication = %name,
                    "Posology record has no matching drug in the lexicon"
                );
            }
        }
    }

    /// Small tables for tests (no file I/O).
    #[cfg(test)]
    pub(crate) fn load_test() -> Self {
        let lexicon = Lexicon::from_entries(vec![
            LexiconEntry::new("paracetamol", "Paracetamol", TermCategory::Drug)
                .with_aliases(&["acetaminophen", "Doliprane", "Tylenol"]),
            LexiconEntry::new("ibuprofen", "Ibuprofen", TermCategory::Drug)
                .with_aliases(&["Advil", "Nurofen"]),
            LexiconEntry::new("metformin", "Metformin", TermCategory::Drug)
                .with_aliases(&["Glucophage"]),
            LexiconEntry::new("betamethasone", "Betamethasone", TermCategory::Drug)
                .with_aliases(&["Diprosone"]),
            LexiconEntry::new("amoxicillin", "Amoxicillin", TermCategory::Drug)
                .with_aliases(&["Amoxil"]),
            LexiconEntry::new("headache", "headache", TermCategory::Symptom)
                .with_aliases(&["cephalgia", "head pain"]),
            LexiconEntry::new("high blood pressure", "hypertension", TermCategory::Condition)
                .with_aliases(&["HTN"]),
            LexiconEntry::new("type 2 diabetes", "type 2 diabetes mellitus", TermCategory::Condition)
                .with_aliases(&["T2DM"]),
            LexiconEntry::new("ecg", "electrocardiogram", TermCategory::Exam)
                .with_aliases(&["EKG"]),
        ])
        .expect("test lexicon is valid");

        let record = |name: &str, dose: f64, min: f64, max: f64, unit: &str, freq: &[&str], route: &str| {
            PosologyRecord {
                canonical_name: name.into(),
                default_dose: dose,
                dose_min: min,
                dose_max: max,
                unit: unit.into(),
                frequencies: freq.iter().map(|f| f.to_string()).collect(),
                route: route.into(),
                max_daily_dose: None,
            }
        };
        let posology = PosologyTable::from_records(vec![
            PosologyRecord {
                max_daily_dose: Some(4000.0),
                ..record("Paracetamol", 500.0, 500.0, 1000.0, "mg", &["three times daily", "as needed"], "oral")
            },
            record("Ibuprofen", 400.0, 200.0, 800.0, "mg", &["three times daily"], "oral"),
            record("Metformin", 500.0, 500.0, 1000.0, "mg", &["twice daily"], "oral"),
            record("Betamethasone", 0.1, 0.05, 0.1, "%", &["twice daily"], "topical"),
        ])
        .expect("test posology is valid");

        Self::new(lexicon, posology)
    }
}
