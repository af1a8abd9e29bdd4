use std::collections::HashMap;

use crate::models::{format_quantity, DosePlausibility, PlausibilityResult, PosologyRecord};
use crate::pipeline::dosing::{convert_dose, frequency_to_daily_multiplier, normalize_unit};

use super::lexicon::fold_key;
use super::ConfigurationError;

/// Canonical medication name → standard dosing template.
#[derive(Debug, Default)]
pub struct PosologyTable {
    records: HashMap<String, PosologyRecord>,
}

impl PosologyTable {
    pub fn from_records(records: Vec<PosologyRecord>) -> Result<Self, ConfigurationError> {
        if records.is_empty() {
            return Err(ConfigurationError::EmptyTable("posology".into()));
        }

        let mut table = HashMap::with_capacity(records.len());
        for mut record in records {
            let name = record.canonical_name.trim().to_string();
            if name.is_empty() {
                return Err(ConfigurationError::InvalidPosology {
                    name: record.canonical_name.clone(),
                    reason: "empty canonical name".into(),
                });
            }
            if record.unit.trim().is_empty() {
                return Err(ConfigurationError::InvalidPosology {
                    name: name.clone(),
                    reason: "empty unit".into(),
                });
            }
            if record.dose_min > record.dose_max {
                return Err(ConfigurationError::InvalidPosology {
                    name: name.clone(),
                    reason: format!(
                        "dose_min {} exceeds dose_max {}",
                        record.dose_min, record.dose_max
                    ),
                });
            }

            let key = fold_key(&name);
            if table.contains_key(&key) {
                return Err(ConfigurationError::DuplicatePosology(name));
            }
            record.canonical_name = name;
            record.unit = normalize_unit(&record.unit);
            table.insert(key, record);
        }

        Ok(Self { records: table })
    }

    /// O(1) case-insensitive lookup. `None` means no dosing template exists.
    pub fn find(&self, canonical_name: &str) -> Option<&PosologyRecord> {
        self.records.get(&fold_key(canonical_name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.values().map(|r| r.canonical_name.as_str())
    }
}

/// Check whether a dose is plausible against the record's standard range.
pub fn check_dose_plausibility(
    record: &PosologyRecord,
    dose: f64,
    unit: &str,
    frequency: Option<&str>,
) -> DosePlausibility {
    let name = &record.canonical_name;
    let ref_unit = &record.unit;

    let result = match convert_dose(dose, unit, ref_unit) {
        None => PlausibilityResult::IncomparableUnit,
        Some(value) => {
            let shown = format!("{}{ref_unit}", format_quantity(value));
            if value > record.dose_max * 5.0 {
                PlausibilityResult::VeryHighDose {
                    message: format!(
                        "{shown} of {name} is far above the typical maximum of {}{ref_unit}. \
                         This may be a transcription error; please double-check this value.",
                        format_quantity(record.dose_max)
                    ),
                }
            } else if value > record.dose_max {
                PlausibilityResult::HighDose {
                    message: format!(
                        "{shown} of {name} is above the typical range of {}-{}{ref_unit}. \
                         Please verify this value.",
                        format_quantity(record.dose_min),
                        format_quantity(record.dose_max)
                    ),
                }
            } else if record.dose_min > 0.0 && value < record.dose_min * 0.5 {
                PlausibilityResult::LowDose {
                    message: format!(
                        "{shown} of {name} is below the typical minimum of {}{ref_unit}. \
                         Please verify this value.",
                        format_quantity(record.dose_min)
                    ),
                }
            } else {
                daily_dose_check(record, value, frequency)
            }
        }
    };

    DosePlausibility {
        canonical_name: name.clone(),
        dose,
        unit: normalize_unit(unit),
        typical_min: record.dose_min,
        typical_max: record.dose_max,
        typical_unit: ref_unit.clone(),
        result,
    }
}

fn daily_dose_check(record: &PosologyRecord, value: f64, frequency: Option<&str>) -> PlausibilityResult {
    let (Some(max_daily), Some(multiplier)) = (
        record.max_daily_dose,
        frequency.and_then(frequency_to_daily_multiplier),
    ) else {
        return PlausibilityResult::Plausible;
    };

    let daily = value * multiplier;
    if daily > max_daily {
        PlausibilityResult::DailyDoseExceeded {
            message: format!(
                "{} of {} per day ({}{unit} × {}) exceeds the maximum daily dose of {}{unit}.",
                format_quantity(daily),
                record.canonical_name,
                format_quantity(value),
                format_quantity(multiplier),
                format_quantity(max_daily),
                unit = record.unit,
            ),
        }
    } else {
        PlausibilityResult::Plausible
    }
}
