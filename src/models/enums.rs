use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name a known enum variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Lexicon partition. Fuzzy matching never crosses categories.
    TermCategory {
        Drug => "drug",
        Symptom => "symptom",
        Exam => "exam",
        Condition => "condition",
    }
);

impl TermCategory {
    /// Order used when a term is normalized without a category hint.
    pub const ALL: [TermCategory; 4] = [
        TermCategory::Drug,
        TermCategory::Condition,
        TermCategory::Symptom,
        TermCategory::Exam,
    ];
}

str_enum!(ResolutionMethod {
    Exact => "exact",
    Alias => "alias",
    Fuzzy => "fuzzy",
    Unresolved => "unresolved",
});

impl ResolutionMethod {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

str_enum!(
    /// Segmenter's guess before normalization.
    TokenCategory {
        Phrase => "phrase",
        DrugMention => "drug_mention",
        Unknown => "unknown",
    }
);

str_enum!(ConsultationType {
    Normal => "normal",
    Dermatology => "dermatology",
    Chronic => "chronic",
});

impl ConsultationType {
    pub fn all() -> &'static [ConsultationType] {
        &[Self::Normal, Self::Dermatology, Self::Chronic]
    }
}

str_enum!(
    /// A medication field filled from the posology record rather than the mention.
    PosologyField {
        Dose => "dose",
        Frequency => "frequency",
        Route => "route",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn term_category_round_trip() {
        for (variant, s) in [
            (TermCategory::Drug, "drug"),
            (TermCategory::Symptom, "symptom"),
            (TermCategory::Exam, "exam"),
            (TermCategory::Condition, "condition"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(TermCategory::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn consultation_type_round_trip() {
        for &variant in ConsultationType::all() {
            assert_eq!(ConsultationType::from_str(variant.as_str()).unwrap(), variant);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TokenCategory::DrugMention).unwrap();
        assert_eq!(json, "\"drug_mention\"");
        let back: ResolutionMethod = serde_json::from_str("\"unresolved\"").unwrap();
        assert_eq!(back, ResolutionMethod::Unresolved);
    }

    #[test]
    fn only_unresolved_is_unresolved() {
        assert!(ResolutionMethod::Exact.is_resolved());
        assert!(ResolutionMethod::Alias.is_resolved());
        assert!(ResolutionMethod::Fuzzy.is_resolved());
        assert!(!ResolutionMethod::Unresolved.is_resolved());
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = TermCategory::from_str("medication").unwrap_err();
        assert_eq!(err.field, "TermCategory");
        assert!(ConsultationType::from_str("").is_err());
        assert!(PosologyField::from_str("Dose").is_err());
    }
}
