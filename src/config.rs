use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::reference::ConfigurationError;

/// Application-level constants
pub const APP_NAME: &str = "Clinorm";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the reference table directory.
pub const REFERENCE_DIR_ENV: &str = "CLINORM_REFERENCE_DIR";
pub const LEXICON_FILE: &str = "lexicon.json";
pub const POSOLOGY_FILE: &str = "posology.json";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinorm=info"
}

/// Per-user reference directory: `<config dir>/Clinorm/reference`
pub fn user_reference_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("reference"))
}

/// Directory to load reference tables from, if any.
/// `CLINORM_REFERENCE_DIR` wins; the per-user directory is used only when it exists.
pub fn reference_dir() -> Option<PathBuf> {
    let from_env = std::env::var_os(REFERENCE_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    resolve_reference_dir(from_env, user_reference_dir().as_deref())
}

fn resolve_reference_dir(from_env: Option<PathBuf>, user_dir: Option<&Path>) -> Option<PathBuf> {
    from_env.or_else(|| user_dir.filter(|d| d.is_dir()).map(Path::to_path_buf))
}

// ═══════════════════════════════════════════════════════════════════════════
// Normalizer settings
// ═══════════════════════════════════════════════════════════════════════════

fn default_fuzzy_threshold() -> f64 {
    0.25
}

fn default_dictation_min_fuzzy_len() -> usize {
    5
}

fn default_max_phrase_words() -> usize {
    4
}

/// Tunables for term and dictation normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// A fuzzy candidate is accepted when `distance / token_len` is strictly below this.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Shortest single word the dictation normalizer will fuzzy-match.
    #[serde(default = "default_dictation_min_fuzzy_len")]
    pub dictation_min_fuzzy_len: usize,
    /// Widest word window tried when scanning dictation.
    #[serde(default = "default_max_phrase_words")]
    pub max_phrase_words: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            dictation_min_fuzzy_len: default_dictation_min_fuzzy_len(),
            max_phrase_words: default_max_phrase_words(),
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold < 1.0) {
            return Err(ConfigurationError::InvalidSetting {
                setting: "fuzzy_threshold".into(),
                reason: format!("{} is outside (0, 1)", self.fuzzy_threshold),
            });
        }
        if self.max_phrase_words == 0 {
            return Err(ConfigurationError::InvalidSetting {
                setting: "max_phrase_words".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ConfigurationError::ReferenceDataParse("normalizer config".into(), e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_clinorm() {
        assert_eq!(APP_NAME, "Clinorm");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn user_reference_dir_under_app_name() {
        if let Some(dir) = user_reference_dir() {
            assert!(dir.ends_with("Clinorm/reference"));
        }
    }

    #[test]
    fn env_dir_wins_over_user_dir() {
        let user = tempfile::tempdir().unwrap();
        let chosen = resolve_reference_dir(Some(PathBuf::from("/srv/tables")), Some(user.path()));
        assert_eq!(chosen, Some(PathBuf::from("/srv/tables")));
    }

    #[test]
    fn user_dir_used_only_when_present() {
        let user = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_reference_dir(None, Some(user.path())),
            Some(user.path().to_path_buf())
        );

        let missing = user.path().join("nope");
        assert_eq!(resolve_reference_dir(None, Some(&missing)), None);
        assert_eq!(resolve_reference_dir(None, None), None);
    }

    #[test]
    fn defaults() {
        let config = NormalizerConfig::default();
        assert_eq!(config.fuzzy_threshold, 0.25);
        assert_eq!(config.dictation_min_fuzzy_len, 5);
        assert_eq!(config.max_phrase_words, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = NormalizerConfig::from_json(r#"{"fuzzy_threshold": 0.2}"#).unwrap();
        assert_eq!(config.fuzzy_threshold, 0.2);
        assert_eq!(config.max_phrase_words, 4);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let err = NormalizerConfig::from_json(r#"{"fuzzy_threshold": 1.5}"#).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSetting { .. }));
    }

    #[test]
    fn zero_window_rejected() {
        let config = NormalizerConfig {
            max_phrase_words: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
