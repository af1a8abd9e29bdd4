use serde::{Deserialize, Serialize};

use super::enums::{ConsultationType, PosologyField, ResolutionMethod};

fn default_route() -> String {
    "oral".into()
}

/// Standard dosing template for one canonical medication (loaded from posology.json).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PosologyRecord {
    pub canonical_name: String,
    pub default_dose: f64,
    pub dose_min: f64,
    pub dose_max: f64,
    pub unit: String,
    /// Canonical frequency phrases; the first one is the default.
    #[serde(default)]
    pub frequencies: Vec<String>,
    #[serde(default = "default_route")]
    pub route: String,
    /// Maximum total per day, in `unit`.
    #[serde(default)]
    pub max_daily_dose: Option<f64>,
}

impl PosologyRecord {
    pub fn default_frequency(&self) -> Option<&str> {
        self.frequencies.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlausibilityResult {
    Plausible,
    LowDose { message: String },
    HighDose { message: String },
    VeryHighDose { message: String },
    DailyDoseExceeded { message: String },
    /// Dose unit cannot be compared with the reference unit (e.g. mL vs mg).
    IncomparableUnit,
}

impl PlausibilityResult {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::LowDose { message }
            | Self::HighDose { message }
            | Self::VeryHighDose { message }
            | Self::DailyDoseExceeded { message } => Some(message),
            Self::Plausible | Self::IncomparableUnit => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosePlausibility {
    pub canonical_name: String,
    pub dose: f64,
    pub unit: String,
    pub typical_min: f64,
    pub typical_max: f64,
    pub typical_unit: String,
    pub result: PlausibilityResult,
}

/// A normalized medication, ready for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationEntry {
    /// Name exactly as it appeared in the mention.
    pub raw_name: String,
    /// Canonical generic name, or `raw_name` when unresolved.
    pub canonical_name: String,
    pub dose: Option<f64>,
    pub unit: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub form: Option<String>,
    pub posology_ref: Option<String>,
    pub validated: bool,
    pub origins: Vec<ConsultationType>,
    pub resolution: ResolutionMethod,
    pub confidence: f64,
    #[serde(default)]
    pub defaults_applied: Vec<PosologyField>,
    #[serde(default)]
    pub plausibility: Option<DosePlausibility>,
}

impl MedicationEntry {
    /// Render the entry back into a single mention string.
    ///
    /// Feeding the result through the medication normalizer again yields the
    /// same canonical name, dose, frequency and route.
    pub fn to_mention_text(&self) -> String {
        let mut parts = vec![self.canonical_name.clone()];
        if let Some(form) = &self.form {
            parts.push(form.clone());
        }
        if let Some(dose) = self.dose {
            let quantity = format_quantity(dose);
            match &self.unit {
                Some(unit) => parts.push(format!("{quantity} {unit}")),
                None => parts.push(quantity),
            }
        }
        if let Some(frequency) = &self.frequency {
            parts.push(frequency.clone());
        }
        if let Some(route) = &self.route {
            parts.push(route.clone());
        }
        parts.join(" ")
    }
}

/// Format a dose value without a trailing ".0".
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
