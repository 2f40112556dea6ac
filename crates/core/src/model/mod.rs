mod ids;
mod progress;
mod quality;
mod word;

pub use ids::{Direction, ParseIdError, ProgressKey, WordId};
pub use progress::{
    DEFAULT_EASE, EASE_FLOOR, ProgressError, StudyStage, WordProgress, WordWithProgress,
};
pub use quality::{Quality, QualityError};
pub use word::{ValidatedWord, Word, WordDraft, WordError};
