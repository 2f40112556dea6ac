use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised when a response code cannot be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QualityError {
    #[error("invalid response quality: {0} (expected 1 = hard, 2 = medium, 3 = easy)")]
    Invalid(u8),
    #[error("invalid response quality: {0:?}")]
    InvalidName(String),
}

//
// ─── QUALITY ──────────────────────────────────────────────────────────────────
//

/// Three-level rating a learner gives after seeing a word.
///
/// - `Hard`: did not recall, or recalled with real effort
/// - `Medium`: recalled correctly
/// - `Easy`: recalled instantly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Hard,
    Medium,
    Easy,
}

impl Quality {
    /// Converts the ordinal response code (1-3) to a `Quality`.
    ///
    /// # Errors
    ///
    /// Returns `QualityError::Invalid` if the value is not in the range 1-3.
    pub fn from_u8(value: u8) -> Result<Self, QualityError> {
        match value {
            1 => Ok(Self::Hard),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Easy),
            _ => Err(QualityError::Invalid(value)),
        }
    }

    /// Parses a textual answer such as `"easy"` or `"3"`.
    ///
    /// # Errors
    ///
    /// Returns `QualityError` for unknown names or out-of-range codes.
    pub fn parse(raw: &str) -> Result<Self, QualityError> {
        let trimmed = raw.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_u8(code);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "hard" | "h" => Ok(Self::Hard),
            "medium" | "m" => Ok(Self::Medium),
            "easy" | "e" => Ok(Self::Easy),
            _ => Err(QualityError::InvalidName(trimmed.to_owned())),
        }
    }

    /// Ordinal code (1 = hard, 2 = medium, 3 = easy).
    #[must_use]
    pub fn ordinal(self) -> u8 {
        match self {
            Quality::Hard => 1,
            Quality::Medium => 2,
            Quality::Easy => 3,
        }
    }
}
