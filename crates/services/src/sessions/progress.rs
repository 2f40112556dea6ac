/// Aggregated view of session progress, useful for a study screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// Answers given so far, re-shows included.
    pub answered: usize,
    /// Distinct words answered at least once.
    pub distinct_studied: usize,
    /// Words left in the current queue snapshot.
    pub remaining: usize,
    pub is_complete: bool,
}
