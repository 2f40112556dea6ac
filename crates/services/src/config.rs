//! Loading `StudyConfig` from JSON.

use std::path::Path;

use vocab_core::StudyConfig;

use crate::error::ConfigLoadError;

/// Parse and validate a JSON study configuration. Missing fields take their
/// defaults.
///
/// # Errors
///
/// Returns `ConfigLoadError::Parse` for malformed JSON and
/// `ConfigLoadError::Invalid` when a value is out of range.
pub fn parse_config(raw: &str) -> Result<StudyConfig, ConfigLoadError> {
    let config: StudyConfig = serde_json::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Read a JSON study configuration from `path`.
///
/// # Errors
///
/// Returns `ConfigLoadError::Io` if the file cannot be read, otherwise the
/// errors of [`parse_config`].
pub fn load_config(path: impl AsRef<Path>) -> Result<StudyConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path)?;
    parse_config(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::ConfigError;

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(parse_config("{}").unwrap(), StudyConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config(r#"{ "daily_goal": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::InvalidDailyGoal)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_config("{ daily_goal: ").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("/nonexistent/vocab-config.json").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io(_)));
    }
}
