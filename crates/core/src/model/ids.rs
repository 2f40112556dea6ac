use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a vocabulary word
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordId(u64);

impl WordId {
    /// Creates a new `WordId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WordId({})", self.0)
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── DIRECTION ─────────────────────────────────────────────────────────────────
//

/// Which translation orientation a progress record tracks.
///
/// The two directions are independent progress streams: mastering a word
/// source→target says nothing about target→source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    SourceToTarget,
    TargetToSource,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::SourceToTarget, Direction::TargetToSource];

    /// Stable string form used by storage adapters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::SourceToTarget => "source_to_target",
            Direction::TargetToSource => "target_to_source",
        }
    }

    /// The opposite orientation.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Direction::SourceToTarget => Direction::TargetToSource,
            Direction::TargetToSource => Direction::SourceToTarget,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PROGRESS KEY ──────────────────────────────────────────────────────────────
//

/// Composite key addressing exactly one progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressKey {
    pub word_id: WordId,
    pub direction: Direction,
}

impl ProgressKey {
    #[must_use]
    pub fn new(word_id: WordId, direction: Direction) -> Self {
        Self { word_id, direction }
    }

    /// The same word, tracked in the other direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            word_id: self.word_id,
            direction: self.direction.reversed(),
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.word_id, self.direction)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ids and directions from strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for WordId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(WordId::new)
            .map_err(|_| ParseIdError {
                kind: "WordId".to_string(),
            })
    }
}

impl FromStr for Direction {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source_to_target" | "s2t" => Ok(Direction::SourceToTarget),
            "target_to_source" | "t2s" => Ok(Direction::TargetToSource),
            _ => Err(ParseIdError {
                kind: "Direction".to_string(),
            }),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
